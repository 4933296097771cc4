//! Asynchronous Avro producer for Kafka.
//!
//! Encodes textual messages with an Avro schema, optionally registers the
//! schema with a schema registry, frames the payload in the Confluent wire
//! format and produces it to a Kafka topic.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use hey_kafka_producer::AvroProducer;
//! use hey_kafka_schema_registry::{HttpSchemaRegistry, RegistryConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let registry = HttpSchemaRegistry::new(RegistryConfig::new("http://localhost:8081"))?;
//!     let producer = AvroProducer::builder()
//!         .brokers("localhost:9092")
//!         .with_schema_registry(Arc::new(registry))
//!         .build()?;
//!
//!     let delivery = producer
//!         .produce("greetings", r#"{"type": "string"}"#, r#""hello""#)
//!         .await?;
//!     println!("Written at offset {}", delivery.offset);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod producer;
pub mod sink;

// Re-export main types for easy access
pub use error::{ErrorKind, ProduceError, Result};
pub use producer::{AvroProducer, AvroProducerBuilder, ProduceHandle, SubjectNameStrategy};
pub use sink::{BrokerConfig, ClientError, Delivery, KafkaSink, MessageSink};
