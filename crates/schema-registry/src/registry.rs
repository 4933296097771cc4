use async_trait::async_trait;
use hey_kafka_avro::AvroCodec;

use crate::error::Result;

/// Resolves a compiled schema to the id written into the wire frame.
#[async_trait]
pub trait SchemaRegistry: Send + Sync {
    /// Register `codec`'s schema under `subject`, or return the id it already
    /// has, and return that id.
    async fn register_schema(&self, codec: &AvroCodec, subject: &str) -> Result<u32>;
}

/// Registry used when none is configured: every schema gets id `0`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRegistry;

#[async_trait]
impl SchemaRegistry for NoRegistry {
    async fn register_schema(&self, _codec: &AvroCodec, _subject: &str) -> Result<u32> {
        Ok(0)
    }
}
