use std::net::SocketAddr;

use bytes::Bytes;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{tcp::OwnedReadHalf, TcpStream},
    sync::{
        mpsc::{unbounded_channel, UnboundedSender},
        oneshot,
    },
    task::JoinHandle,
};
use tracing::warn;

use crate::{error::Error, handshake};

pub(crate) struct WriteCommand {
    pub payload: Bytes,
    pub ack: oneshot::Sender<Result<(), Error>>,
}

/// An outbound connection to one neighbor: a channel into its `write_task`,
/// plus the tasks that own the two split halves of the socket.
///
/// A `write_task` loop over an `UnboundedReceiver` that writes-then-flushes
/// each buffer, extended with a per-write acknowledgement so the public
/// `send()` can resolve only once the write actually reaches the OS, and a
/// `watch_task` over the other half purely to detect the peer tearing down
/// the connection (a send socket carries no inbound application traffic of
/// its own).
pub(crate) struct SendSocket {
    egress: UnboundedSender<WriteCommand>,
    write_task: JoinHandle<()>,
    watch_task: JoinHandle<()>,
}

impl SendSocket {
    /// Enqueue a write. Returns `false` if the write task has already
    /// exited (the connection is effectively gone even if the table entry
    /// hasn't been cleaned up yet).
    pub(crate) fn submit(&self, payload: Bytes, ack: oneshot::Sender<Result<(), Error>>) -> bool {
        self.egress.send(WriteCommand { payload, ack }).is_ok()
    }

    /// Tear the connection down and wait for the write half to close.
    pub(crate) async fn close(self) {
        drop(self.egress);
        self.watch_task.abort();
        let _ = self.write_task.await;
    }
}

/// A connected, handshaken outbound socket whose close-detection task has
/// not been armed yet.
///
/// Split out of [`connect`] so a caller can register the socket in its
/// connection table before the watch task — which can remove that very
/// entry — is allowed to run. Arm while still holding the table's lock (see
/// `Transport::try_connect`) so the watch task's own lock acquisition
/// blocks until the registration is visible.
pub(crate) struct PendingSendSocket {
    egress: UnboundedSender<WriteCommand>,
    write_task: JoinHandle<()>,
    read_half: OwnedReadHalf,
    addr: SocketAddr,
}

impl PendingSendSocket {
    /// Spawn the close-detection task and hand back the finished socket.
    /// `on_unexpected_close` fires from that task if the peer tears the
    /// connection down on its own (as opposed to via [`SendSocket::close`]).
    /// This path does not automatically requeue the neighbor for
    /// reconnection, so the callback here is limited to removing the stale
    /// table entry and logging.
    pub(crate) fn arm(self, on_unexpected_close: impl FnOnce() + Send + 'static) -> SendSocket {
        let addr = self.addr;
        let mut read_half = self.read_half;
        let watch_task = tokio::spawn(async move {
            let mut scratch = [0u8; 1];
            match read_half.read(&mut scratch).await {
                Ok(0) => {}
                Ok(_) => warn!("unexpected inbound bytes on a send-only connection to {addr}"),
                Err(err) => warn!("send connection to {addr} lost: {err}"),
            }
            on_unexpected_close();
        });
        SendSocket { egress: self.egress, write_task: self.write_task, watch_task }
    }

    /// Tear down a pending connection that is never armed, e.g. because the
    /// transport stopped running while the handshake was in flight.
    pub(crate) async fn close(self) {
        drop(self.egress);
        drop(self.read_half);
        let _ = self.write_task.await;
    }
}

/// Open an outbound connection to `addr` and perform the handshake
/// announcing `local_port`. Starts the write task (harmless to run
/// unregistered, since it only drains `egress`) but leaves the
/// close-detection task unarmed; see [`PendingSendSocket::arm`].
pub(crate) async fn connect(addr: SocketAddr, local_port: u16) -> Result<PendingSendSocket, Error> {
    let mut stream = TcpStream::connect(addr).await.map_err(|err| Error::ConnectFailed(err.to_string()))?;
    stream.set_nodelay(true).ok();
    stream
        .write_all(&handshake::encode_port(local_port))
        .await
        .map_err(|err| Error::ConnectFailed(err.to_string()))?;

    let (read_half, mut write_half) = stream.into_split();
    let (egress, mut ingress) = unbounded_channel::<WriteCommand>();

    let write_task = tokio::spawn(async move {
        while let Some(WriteCommand { payload, ack }) = ingress.recv().await {
            let result = async {
                write_half.write_all(&payload).await?;
                write_half.flush().await
            }
            .await;
            let failed = result.is_err();
            let _ = ack.send(result.map_err(Error::from));
            if failed {
                break;
            }
        }
    });

    Ok(PendingSendSocket { egress, write_task, read_half, addr })
}

// Re-exported for tests that want to assert on the exact handshake bytes
// without going through a live socket.
pub(crate) fn handshake_bytes(local_port: u16) -> [u8; handshake::HANDSHAKE_LEN] {
    handshake::encode_port(local_port)
}
