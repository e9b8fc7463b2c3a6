use std::{net::SocketAddr, sync::Arc, time::Duration};

use bytes::{Bytes, BytesMut};
use tokio::{io::AsyncReadExt, net::TcpStream, task::JoinHandle};

use crate::{error::Error, events::EventSenders, framer::Framer, handshake, Neighbor, Packer};

/// Hard timeout for the inbound handshake read.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

pub(crate) struct InboundHandshake {
    pub remote_port: u16,
    /// Bytes read past the 10-byte preamble within the reads used to
    /// collect it. The handshake may not arrive alone in its own segment,
    /// so this reads at least 10 bytes and carries any excess into the
    /// framer instead of discarding it.
    pub leftover: Bytes,
}

/// Read and validate the inbound handshake preamble.
///
/// On timeout or on an invalid payload the caller is expected to drop the
/// socket silently.
pub(crate) async fn read_handshake(stream: &mut TcpStream) -> Result<InboundHandshake, Error> {
    let read_enough = async {
        let mut buf = BytesMut::with_capacity(64);
        while buf.len() < handshake::HANDSHAKE_LEN {
            let mut chunk = [0u8; 4096];
            let n = stream.read(&mut chunk).await?;
            if n == 0 {
                return Err(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "closed before handshake completed"));
            }
            buf.extend_from_slice(&chunk[..n]);
        }
        Ok(buf)
    };

    let mut buf = match tokio::time::timeout(HANDSHAKE_TIMEOUT, read_enough).await {
        Ok(Ok(buf)) => buf,
        Ok(Err(err)) => return Err(Error::HandshakeInvalid(err.to_string())),
        Err(_elapsed) => return Err(Error::HandshakeTimeout),
    };

    let preamble = buf.split_to(handshake::HANDSHAKE_LEN);
    let remote_port = handshake::decode_port(&preamble)?;
    Ok(InboundHandshake { remote_port, leftover: buf.freeze() })
}

/// Install the framer on an accepted, handshake-validated socket and run
/// the framed read loop until the connection closes.
///
/// Generalized from a length-prefixed read loop to the fixed-size-packet
/// [`Framer`]. `on_close` is called exactly once, when the loop exits for
/// any reason.
pub(crate) fn spawn_receive_loop<P: Packer>(
    mut stream: TcpStream,
    packer: Arc<P>,
    leftover: Bytes,
    neighbor: Neighbor,
    remote_address: SocketAddr,
    events: EventSenders<P::Data>,
    on_close: impl FnOnce() + Send + 'static,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut framer = Framer::new(packer.packet_size());
        framer.feed(&leftover);
        dispatch_ready_packets(&packer, &events, &neighbor, remote_address, &mut framer);

        let mut buf = [0u8; 8192];
        loop {
            match stream.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    framer.feed(&buf[..n]);
                    dispatch_ready_packets(&packer, &events, &neighbor, remote_address, &mut framer);
                }
                Err(err) => {
                    events.emit_error(Error::SocketError(err));
                    break;
                }
            }
        }
        on_close();
    })
}

fn dispatch_ready_packets<P: Packer>(
    packer: &P,
    events: &EventSenders<P::Data>,
    neighbor: &Neighbor,
    remote_address: SocketAddr,
    framer: &mut Framer,
) {
    for packet in framer.take_packets() {
        match packer.unpack(&packet) {
            Ok(data) => events.emit_receive(crate::events::Received { data, neighbor: neighbor.clone(), remote_address }),
            Err(err) => events.emit_error(err),
        }
    }
}
