use bytes::Bytes;

use crate::Error;

/// The packet codec: the transport only needs `packet_size`, `pack`, and
/// `unpack`.
///
/// Supplied by value to [`crate::Transport::new`] — never a global
/// singleton.
pub trait Packer: Send + Sync + 'static {
    type Data: Send + 'static;

    /// The constant length every packet this codec produces/consumes has.
    fn packet_size(&self) -> usize;

    /// Encode `data` into exactly `packet_size` bytes.
    fn pack(&self, data: &Self::Data) -> Bytes;

    /// Decode a `packet_size`-byte block back into application data.
    fn unpack(&self, bytes: &[u8]) -> Result<Self::Data, Error>;
}
