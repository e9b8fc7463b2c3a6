use crate::Error;

/// Length in bytes of the handshake preamble.
pub const HANDSHAKE_LEN: usize = 10;

/// Encode a listening port as 10 ASCII digits, zero-padded on the left.
///
/// `port 4000 -> "0000004000"`.
pub fn encode_port(port: u16) -> [u8; HANDSHAKE_LEN] {
    let text = format!("{port:0width$}", width = HANDSHAKE_LEN);
    let mut out = [0u8; HANDSHAKE_LEN];
    out.copy_from_slice(text.as_bytes());
    out
}

/// Validate and parse a 10-byte handshake payload.
///
/// The payload must be exactly 10 ASCII digits (`^[0-9]{10}$`); any other
/// content — wrong length, non-digit bytes, or a value too large to be a
/// port — is `HandshakeInvalid`. The mismatch is treated as terminal: this
/// never constructs a neighbor or port value from an invalid payload.
pub fn decode_port(bytes: &[u8]) -> Result<u16, Error> {
    if bytes.len() != HANDSHAKE_LEN || !bytes.iter().all(u8::is_ascii_digit) {
        return Err(Error::HandshakeInvalid(String::from_utf8_lossy(bytes).into_owned()));
    }
    let text = std::str::from_utf8(bytes).expect("validated ascii digits above");
    text.parse::<u32>()
        .ok()
        .and_then(|port| u16::try_from(port).ok())
        .ok_or_else(|| Error::HandshakeInvalid(text.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_left_padded_port() {
        assert_eq!(&encode_port(4000), b"0000004000");
        assert_eq!(&encode_port(1440), b"0000001440");
        assert_eq!(&encode_port(3000), b"0000003000");
    }

    #[test]
    fn decodes_a_valid_payload() {
        assert_eq!(decode_port(b"0000004000").unwrap(), 4000);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(decode_port(b"123").is_err());
    }

    #[test]
    fn rejects_non_digits() {
        assert!(decode_port(b"12345abcde").is_err());
    }

    #[test]
    fn rejects_out_of_range_port() {
        assert!(decode_port(b"9999999999").is_err());
    }
}
