use std::{env, sync::atomic::{AtomicU16, Ordering}};

use bytes::{BufMut, Bytes, BytesMut};
use p2p_tcp_transport::{Config, Error, Neighbor, Packer, Transport, TransportEvents};

/// A fixed-size codec for four-byte big-endian integers, used by every test
/// in this directory as a stand-in application payload.
pub struct U32Packer;

impl Packer for U32Packer {
    type Data = u32;

    fn packet_size(&self) -> usize {
        4
    }

    fn pack(&self, data: &u32) -> Bytes {
        let mut buf = BytesMut::with_capacity(4);
        buf.put_u32(*data);
        buf.freeze()
    }

    fn unpack(&self, bytes: &[u8]) -> Result<u32, Error> {
        if bytes.len() != 4 {
            return Err(Error::HandshakeInvalid("wrong packet length".to_owned()));
        }
        Ok(u32::from_be_bytes(bytes.try_into().unwrap()))
    }
}

/// Ports are handed out sequentially from a fixed base so concurrently
/// running tests never collide.
static NEXT_PORT: AtomicU16 = AtomicU16::new(20_000);

pub fn next_port() -> u16 {
    NEXT_PORT.fetch_add(1, Ordering::Relaxed)
}

pub fn new_transport(port: u16) -> (Transport<U32Packer>, TransportEvents<u32>) {
    Transport::new(Config::new(port), U32Packer)
}

pub fn loopback_neighbor(port: u16) -> Neighbor {
    Neighbor::new("127.0.0.1", port, true, true)
}

#[allow(dead_code)]
pub fn initialize_logger() {
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "debug");
    }
    let _ = tracing_subscriber::fmt::try_init();
}
