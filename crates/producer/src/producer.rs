//! Avro producer facade.
//!
//! Runs the encoding pipeline for one message and hands the framed bytes to a
//! [`MessageSink`]:
//!
//! ```text
//! compile schema → message to native → native to binary → schema id → frame → send
//! ```
//!
//! Nothing reaches the sink unless every step before the send succeeded.

use std::sync::Arc;
use std::time::Duration;

use hey_kafka_avro::{AvroCodec, FramedMessage};
use hey_kafka_schema_registry::{NoRegistry, SchemaRegistry};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::error::{ProduceError, Result};
use crate::sink::{BrokerConfig, ClientError, Delivery, KafkaSink, MessageSink};

/// How the registry subject is derived from the topic name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubjectNameStrategy {
    /// The subject is the topic name itself.
    #[default]
    Topic,
    /// `<topic>-value`, the Confluent serializer convention.
    TopicValue,
}

impl SubjectNameStrategy {
    pub fn subject_for(&self, topic: &str) -> String {
        match self {
            Self::Topic => topic.to_string(),
            Self::TopicValue => format!("{topic}-value"),
        }
    }
}

/// Produces Avro encoded messages to Kafka, registering schemas with a schema
/// registry when one is configured.
///
/// Every call gets its own result, so concurrent calls on one producer never
/// observe each other's outcome.
pub struct AvroProducer {
    sink: Arc<dyn MessageSink>,
    registry: Arc<dyn SchemaRegistry>,
    subject_strategy: SubjectNameStrategy,
}

impl AvroProducer {
    pub fn builder() -> AvroProducerBuilder {
        AvroProducerBuilder::default()
    }

    /// Encode `message` with `schema` and send it to `topic`.
    ///
    /// Resolves once the broker acknowledged the message or reported a
    /// failure.
    pub async fn produce(&self, topic: &str, schema: &str, message: &str) -> Result<Delivery> {
        let framed = self.encode(topic, schema, message).await?;

        debug!(
            "Sending {} bytes with schema id {} to topic '{}'",
            framed.encoded_len(),
            framed.schema_id,
            topic
        );
        let delivery = self.sink.send(topic, framed.into_bytes()).await?;

        info!(
            "Delivered message to topic '{}' partition {} at offset {}",
            delivery.topic, delivery.partition, delivery.offset
        );
        Ok(delivery)
    }

    /// Like [`produce`](Self::produce), failing with
    /// [`ProduceError::DeadlineExceeded`] if the whole pipeline, including the
    /// broker acknowledgement, takes longer than `deadline`.
    ///
    /// A message already handed to the sink when the deadline fires may still
    /// be delivered.
    pub async fn produce_with_deadline(
        &self,
        topic: &str,
        schema: &str,
        message: &str,
        deadline: Duration,
    ) -> Result<Delivery> {
        tokio::time::timeout(deadline, self.produce(topic, schema, message))
            .await
            .map_err(|_| ProduceError::DeadlineExceeded(deadline))?
    }

    /// Run [`produce`](Self::produce) on a separate task and return a handle
    /// to its result.
    pub fn dispatch(
        self: &Arc<Self>,
        topic: impl Into<String>,
        schema: impl Into<String>,
        message: impl Into<String>,
    ) -> ProduceHandle {
        let (tx, rx) = oneshot::channel();
        let producer = Arc::clone(self);
        let (topic, schema, message) = (topic.into(), schema.into(), message.into());

        tokio::spawn(async move {
            let result = producer.produce(&topic, &schema, &message).await;
            // The caller may have dropped the handle
            let _ = tx.send(result);
        });

        ProduceHandle { result: rx }
    }

    /// Run the pipeline up to, but not including, the send.
    pub async fn encode(&self, topic: &str, schema: &str, message: &str) -> Result<FramedMessage> {
        let codec = AvroCodec::compile(schema)?;
        let native = codec.to_native(message)?;
        let payload = codec.to_binary(native)?;

        let subject = self.subject_strategy.subject_for(topic);
        let schema_id = self.registry.register_schema(&codec, &subject).await?;

        Ok(FramedMessage::new(schema_id, payload))
    }

    /// Receiver for client-level Kafka errors not tied to a single message.
    ///
    /// Only the first call returns a receiver.
    pub fn client_errors(&self) -> Option<mpsc::Receiver<ClientError>> {
        self.sink.take_client_errors()
    }

    /// Wait for in-flight messages to be delivered.
    pub async fn shutdown(&self, timeout: Duration) -> Result<()> {
        info!("Flushing producer (timeout {timeout:?})");
        self.sink.flush(timeout).await?;
        Ok(())
    }
}

/// Pending result of a [`AvroProducer::dispatch`] call.
pub struct ProduceHandle {
    result: oneshot::Receiver<Result<Delivery>>,
}

impl ProduceHandle {
    pub async fn wait(self) -> Result<Delivery> {
        self.result.await.map_err(|_| ProduceError::Cancelled)?
    }

    pub async fn wait_with_deadline(self, deadline: Duration) -> Result<Delivery> {
        tokio::time::timeout(deadline, self.wait())
            .await
            .map_err(|_| ProduceError::DeadlineExceeded(deadline))?
    }
}

/// Builder for [`AvroProducer`]
#[derive(Default)]
pub struct AvroProducerBuilder {
    broker: Option<BrokerConfig>,
    sink: Option<Arc<dyn MessageSink>>,
    registry: Option<Arc<dyn SchemaRegistry>>,
    subject_strategy: SubjectNameStrategy,
}

impl AvroProducerBuilder {
    /// Produce to these Kafka brokers with the default [`BrokerConfig`].
    pub fn brokers(mut self, brokers: impl Into<String>) -> Self {
        self.broker = Some(BrokerConfig::new(brokers));
        self
    }

    pub fn broker_config(mut self, config: BrokerConfig) -> Self {
        self.broker = Some(config);
        self
    }

    /// Send through `sink` instead of a Kafka producer.
    pub fn sink(mut self, sink: Arc<dyn MessageSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Resolve schema ids through `registry`; without one every message is
    /// framed with schema id 0.
    pub fn with_schema_registry(mut self, registry: Arc<dyn SchemaRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn subject_strategy(mut self, strategy: SubjectNameStrategy) -> Self {
        self.subject_strategy = strategy;
        self
    }

    /// Build the producer. Connecting to Kafka requires a Tokio runtime.
    pub fn build(self) -> Result<AvroProducer> {
        let sink: Arc<dyn MessageSink> = match (self.sink, self.broker) {
            (Some(sink), _) => sink,
            (None, Some(broker)) => Arc::new(KafkaSink::connect(&broker)?),
            (None, None) => {
                return Err(ProduceError::ConfigValidation(
                    "either Kafka brokers or a message sink must be configured".to_string(),
                ));
            }
        };

        let registry = match self.registry {
            Some(registry) => registry,
            None => {
                debug!("No schema registry configured, schema id 0 will be used");
                Arc::new(NoRegistry)
            }
        };

        Ok(AvroProducer {
            sink,
            registry,
            subject_strategy: self.subject_strategy,
        })
    }
}
