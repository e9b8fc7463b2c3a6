use bytes::{Bytes, BytesMut};

/// Turns a continuous inbound byte stream into a lazy sequence of
/// fixed-size packets.
///
/// Generalizes a length-prefixed `read_task` framing style
/// (reading a `u64` length then reading exactly that
/// many bytes) to a constant frame length: `feed` appends whatever a socket
/// read produced, and `take_packets` drains every complete `packet_size`
/// block it can, in arrival order, leaving a trailing partial block
/// buffered for the next `feed`.
#[derive(Debug)]
pub struct Framer {
    buf: BytesMut,
    packet_size: usize,
}

impl Framer {
    pub fn new(packet_size: usize) -> Self {
        assert!(packet_size > 0, "packet_size must be non-zero");
        Self { buf: BytesMut::new(), packet_size }
    }

    /// Append freshly-read bytes to the internal buffer.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Drain every complete `packet_size`-byte block currently buffered, in
    /// order. A trailing partial block is never emitted.
    pub fn take_packets(&mut self) -> Vec<Bytes> {
        let mut packets = Vec::with_capacity(self.buf.len() / self.packet_size);
        while self.buf.len() >= self.packet_size {
            packets.push(self.buf.split_to(self.packet_size).freeze());
        }
        packets
    }
}
