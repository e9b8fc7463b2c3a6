use std::io;

use thiserror::Error;

/// Every error kind a public operation on [`crate::Transport`] can surface.
///
/// `ConnectFailed` during `add_neighbor`/`run` and during a reconnection
/// tick is never returned to a caller — it is converted into a
/// `needs_reconnect` entry instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("transport is already running")]
    AlreadyRunning,

    #[error("transport is not running")]
    NotRunning,

    #[error("neighbor already exists")]
    AlreadyExists,

    #[error("neighbor not found")]
    NotFound,

    #[error("no send socket is open for this neighbor")]
    NotConnected,

    #[error("neighbor does not permit sending")]
    SendForbidden,

    #[error("connect failed: {0}")]
    ConnectFailed(String),

    #[error("listen failed: {0}")]
    ListenFailed(#[source] io::Error),

    #[error("handshake timed out")]
    HandshakeTimeout,

    #[error("invalid handshake payload: {0:?}")]
    HandshakeInvalid(String),

    #[error("socket error: {0}")]
    SocketError(#[source] io::Error),
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        Error::SocketError(error)
    }
}
