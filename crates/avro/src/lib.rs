//! Avro encoding for hey-kafka.
//!
//! This crate turns a textual Avro schema and a textual (JSON) message into the
//! bytes that end up as the value of a Kafka record.
//!
//! # Architecture
//!
//! ```text
//! schema text ──► AvroCodec::compile ──► AvroCodec
//!                                            │
//! message text ──► to_native ──► Value ──► to_binary ──► Avro datum
//!                                                            │
//!                                     schema id ──► wire::encode ──► Kafka value
//! ```
//!
//! # Modules
//!
//! - [`codec`] - Schema compilation and textual/native/binary conversion
//! - [`json`] - Avro JSON encoding to native value conversion
//! - [`wire`] - Confluent wire framing (magic byte + schema id + payload)
//! - [`error`] - Error types for codec and framing operations

pub mod codec;
pub mod error;
pub mod json;
pub mod wire;

// Re-export main types for convenient access
pub use apache_avro::types::Value;
pub use codec::AvroCodec;
pub use error::{CodecError, Result};
pub use wire::{FramedMessage, HEADER_LEN, MAGIC_BYTE};
