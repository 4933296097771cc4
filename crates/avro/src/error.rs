//! Error types for hey-kafka-avro crate.

use thiserror::Error;

/// Errors that can occur while compiling schemas, converting messages or
/// framing payloads.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Could not compile Avro schema: {0}")]
    SchemaCompile(String),

    #[error("Could not parse message against schema: {0}")]
    MessageParse(String),

    #[error("Avro encoding error: {0}")]
    Encoding(String),

    #[error("Avro decoding error: {0}")]
    Decoding(String),

    #[error("Invalid wire frame: {0}")]
    InvalidFrame(String),
}

/// Result type alias for hey-kafka-avro operations.
pub type Result<T> = std::result::Result<T, CodecError>;
