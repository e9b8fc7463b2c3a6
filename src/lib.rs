mod config;
mod connection;
mod error;
mod events;
mod framer;
mod handshake;
mod neighbor;
mod packer;
mod reconnect;
mod transport;

pub use config::Config;
pub use error::Error;
pub use events::{Received, TransportEvents};
pub use neighbor::Neighbor;
pub use packer::Packer;
pub use transport::Transport;
