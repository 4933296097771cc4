//! One run of the command: read inputs, build the producer, send the message.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use hey_kafka_producer::{AvroProducer, BrokerConfig, Delivery};
use hey_kafka_schema_registry::{HttpSchemaRegistry, RegistryConfig};
use tracing::info;

use crate::config::Config;
use crate::input::read_file_or_literal;

/// How long shutdown waits for librdkafka to drain its queue.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(10);

/// Send the configured message and wait for the broker acknowledgement.
pub async fn run(config: &Config) -> anyhow::Result<Delivery> {
    let schema = read_file_or_literal("schema", &config.schema)?;
    let message = read_file_or_literal("message", &config.message)?;

    let producer = build_producer(config)?;

    let delivery = match config.delivery_timeout {
        Some(deadline) => {
            producer
                .produce_with_deadline(&config.topic, &schema, &message, deadline)
                .await
        }
        None => producer.produce(&config.topic, &schema, &message).await,
    }
    .with_context(|| format!("Failed to send message to topic '{}'", config.topic))?;

    producer
        .shutdown(FLUSH_TIMEOUT)
        .await
        .context("Failed to flush Kafka producer")?;

    Ok(delivery)
}

fn build_producer(config: &Config) -> anyhow::Result<AvroProducer> {
    let mut broker = BrokerConfig::new(config.brokers());
    if let Some(deadline) = config.delivery_timeout {
        broker.message_timeout = deadline;
    }

    let mut builder = AvroProducer::builder().broker_config(broker);

    if let Some(address) = &config.schema_registry_address {
        let registry = HttpSchemaRegistry::new(
            RegistryConfig::new(address.clone()).with_timeout(config.registry_timeout),
        )
        .with_context(|| format!("Failed to create schema registry client for '{address}'"))?;
        info!("Using schema registry at {}", registry.base_url());
        builder = builder.with_schema_registry(Arc::new(registry));
    }

    builder
        .build()
        .with_context(|| format!("Failed to create Kafka producer for {}", config.brokers()))
}

/// Human readable summary printed after a successful send.
pub fn success_report(delivery: &Delivery) -> String {
    format!(
        "Success sending message.\n\tTopic: {}\n\tOffset: {}",
        delivery.topic, delivery.offset
    )
}
