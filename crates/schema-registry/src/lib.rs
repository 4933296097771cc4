//! Schema registry support for hey-kafka.
//!
//! Resolves an Avro schema to the numeric id a Confluent-compatible schema
//! registry assigns to it, so that the id can be written into the wire frame.
//!
//! - [`SchemaRegistry`] is the capability the producer depends on.
//! - [`NoRegistry`] always answers `0` and never performs I/O.
//! - [`HttpSchemaRegistry`] registers schemas over HTTP and caches the ids.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use hey_kafka_avro::AvroCodec;
//! use hey_kafka_schema_registry::{HttpSchemaRegistry, RegistryConfig, SchemaRegistry};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let registry = HttpSchemaRegistry::new(RegistryConfig::new("localhost:8081"))?;
//!     let codec = AvroCodec::compile(r#"{"type": "string"}"#)?;
//!
//!     let id = registry.register_schema(&codec, "greetings").await?;
//!     println!("Registered schema id {id}");
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod registry;

// Re-exports for convenience
pub use client::{HttpSchemaRegistry, RegistryConfig, DEFAULT_REQUEST_TIMEOUT};
pub use error::{RegistryError, Result};
pub use registry::{NoRegistry, SchemaRegistry};
