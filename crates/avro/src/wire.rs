//! Confluent wire framing.
//!
//! ```text
//! byte 0      : 0x00                  (format version)
//! bytes 1-4   : schema ID, big-endian uint32 (0 if unregistered)
//! bytes 5..   : Avro binary-encoded record
//! ```

use crate::error::{CodecError, Result};

/// Serialization format version; currently always 0.
pub const MAGIC_BYTE: u8 = 0x00;

/// Magic byte plus the 4-byte schema id.
pub const HEADER_LEN: usize = 5;

/// Frame a schema id and an Avro payload into a Kafka message value.
pub fn encode(schema_id: u32, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_LEN + payload.len());
    buf.push(MAGIC_BYTE);
    buf.extend_from_slice(&schema_id.to_be_bytes());
    buf.extend_from_slice(payload);
    buf
}

/// Split a framed message back into its schema id and Avro payload.
pub fn decode(bytes: &[u8]) -> Result<(u32, &[u8])> {
    if bytes.len() < HEADER_LEN {
        return Err(CodecError::InvalidFrame(format!(
            "expected at least {HEADER_LEN} bytes, got {}",
            bytes.len()
        )));
    }

    if bytes[0] != MAGIC_BYTE {
        return Err(CodecError::InvalidFrame(format!(
            "magic byte must be {MAGIC_BYTE:#04x}, got {:#04x}",
            bytes[0]
        )));
    }

    let schema_id = u32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]);
    Ok((schema_id, &bytes[HEADER_LEN..]))
}

/// An Avro payload tagged with the schema id it was written with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramedMessage {
    pub schema_id: u32,
    pub payload: Vec<u8>,
}

impl FramedMessage {
    pub fn new(schema_id: u32, payload: Vec<u8>) -> Self {
        Self { schema_id, payload }
    }

    /// Encoded bytes of this message.
    pub fn encode(&self) -> Vec<u8> {
        encode(self.schema_id, &self.payload)
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.encode()
    }

    /// Length of the encoded message: header plus payload.
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN + self.payload.len()
    }
}
