use std::time::Duration;

/// Configuration for a [`crate::Transport`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Listener bind address. Defaults to `"0.0.0.0"`.
    pub host: String,
    /// Listener bind port; also announced in the outbound handshake.
    pub port: u16,
    /// Period between reconnection attempts. Defaults to 60 seconds.
    pub reconnection_interval: Duration,
    /// If true, inbound connections from unknown addresses are admitted as
    /// auto-discovered neighbors instead of being dropped.
    pub receive_unknown_neighbor: bool,
}

impl Config {
    pub fn new(port: u16) -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port,
            reconnection_interval: Duration::from_secs(60),
            receive_unknown_neighbor: false,
        }
    }
}
