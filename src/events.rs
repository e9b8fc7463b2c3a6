use std::net::SocketAddr;

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::{Error, Neighbor};

/// Every successfully decoded inbound packet.
#[derive(Debug)]
pub struct Received<D> {
    pub data: D,
    pub neighbor: Neighbor,
    pub remote_address: SocketAddr,
}

/// A transport's three event channels, returned alongside the transport
/// itself by [`crate::Transport::new`].
///
/// A plain set of `mpsc` receivers rather than a generic `OnEvent`
/// dispatch — this crate has exactly three event kinds and no need for
/// type erasure or deterministic replay.
pub struct TransportEvents<D> {
    pub receive: UnboundedReceiver<Received<D>>,
    pub neighbor: UnboundedReceiver<Neighbor>,
    pub error: UnboundedReceiver<Error>,
}

#[derive(Clone)]
pub(crate) struct EventSenders<D> {
    pub receive: UnboundedSender<Received<D>>,
    pub neighbor: UnboundedSender<Neighbor>,
    pub error: UnboundedSender<Error>,
}

impl<D> EventSenders<D> {
    pub(crate) fn new() -> (Self, TransportEvents<D>) {
        let (receive_tx, receive_rx) = unbounded_channel();
        let (neighbor_tx, neighbor_rx) = unbounded_channel();
        let (error_tx, error_rx) = unbounded_channel();
        (
            Self { receive: receive_tx, neighbor: neighbor_tx, error: error_tx },
            TransportEvents { receive: receive_rx, neighbor: neighbor_rx, error: error_rx },
        )
    }

    /// Best-effort: if nobody is subscribed anymore the event is dropped,
    /// matching an emitter with no listeners.
    pub(crate) fn emit_error(&self, error: Error) {
        let _ = self.error.send(error);
    }

    pub(crate) fn emit_neighbor(&self, neighbor: Neighbor) {
        let _ = self.neighbor.send(neighbor);
    }

    pub(crate) fn emit_receive(&self, received: Received<D>) {
        let _ = self.receive.send(received);
    }
}
