//! hey-kafka
//!
//! Sends a single Avro encoded message to a Kafka topic, registering the
//! schema with a Confluent schema registry when one is configured.
//!
//! # CLI Usage
//!
//! ```bash
//! # Inline schema and message, no registry (schema id 0)
//! hey-kafka -t greetings -s '"string"' -m '"hello"'
//!
//! # Schema and message read from files, schema registered under the topic name
//! hey-kafka -t users -s user.avsc -m user.json --schema-registry-address localhost:8081
//!
//! # Options from a config file, overridden on the command line
//! hey-kafka -f hey-kafka.yaml -H kafka-1
//! ```

pub mod app;
pub mod config;
pub mod input;

pub use config::{CliArgs, Config, ConfigError};
