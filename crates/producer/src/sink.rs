//! The broker side of the producer.
//!
//! [`MessageSink`] is the seam between the encoding pipeline and the Kafka
//! client; [`KafkaSink`] is the rdkafka implementation used in production.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use rdkafka::client::ClientContext;
use rdkafka::config::ClientConfig;
use rdkafka::error::KafkaError;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{ProduceError, Result};

/// Acknowledgement of a message written to Kafka.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
}

/// A client-level error reported by librdkafka outside of any single message,
/// e.g. all brokers being down.
#[derive(Debug, Clone)]
pub struct ClientError {
    pub error: String,
    pub reason: String,
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.error, self.reason)
    }
}

/// Destination for framed messages.
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Send `payload` as the value of a record on `topic` and wait for the
    /// broker acknowledgement.
    async fn send(&self, topic: &str, payload: Vec<u8>) -> std::result::Result<Delivery, KafkaError>;

    /// Wait until queued messages are delivered or `timeout` elapses.
    async fn flush(&self, _timeout: Duration) -> std::result::Result<(), KafkaError> {
        Ok(())
    }

    /// Receiver for client-level errors; handed out once.
    fn take_client_errors(&self) -> Option<mpsc::Receiver<ClientError>> {
        None
    }
}

/// Configuration for the Kafka sink
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Kafka brokers (comma-separated list)
    pub brokers: String,
    /// Acknowledgements required before a send counts as delivered
    ///
    /// "all" waits for every in-sync replica.
    pub required_acks: String,
    /// How many times librdkafka retries a failed send
    pub max_retries: u32,
    /// Upper bound on the time a message may spend waiting for delivery
    pub message_timeout: Duration,
    /// How long `send` may wait for room in a full producer queue
    ///
    /// `None` blocks until space frees up.
    pub queue_timeout: Option<Duration>,
    /// Extra librdkafka properties, applied last
    pub extra: Vec<(String, String)>,
}

impl BrokerConfig {
    pub fn new(brokers: impl Into<String>) -> Self {
        Self {
            brokers: brokers.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.brokers.trim().is_empty() {
            return Err(ProduceError::ConfigValidation(
                "at least one Kafka broker is required".to_string(),
            ));
        }
        if self.required_acks.trim().is_empty() {
            return Err(ProduceError::ConfigValidation(
                "required acks must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// librdkafka properties for this configuration.
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", &self.brokers)
            .set("acks", &self.required_acks)
            .set("message.send.max.retries", self.max_retries.to_string())
            .set(
                "message.timeout.ms",
                self.message_timeout.as_millis().to_string(),
            );
        for (key, value) in &self.extra {
            config.set(key, value);
        }
        config
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            brokers: "localhost:9092".to_string(),
            required_acks: "all".to_string(),
            max_retries: 10,
            message_timeout: Duration::from_secs(30),
            queue_timeout: None,
            extra: Vec::new(),
        }
    }
}

/// Client context forwarding librdkafka's client-level errors to the relay
/// task.
struct RelayContext {
    errors: mpsc::UnboundedSender<ClientError>,
}

impl ClientContext for RelayContext {
    fn error(&self, error: KafkaError, reason: &str) {
        // The relay is gone once the sink is dropped
        let _ = self.errors.send(ClientError {
            error: error.to_string(),
            reason: reason.to_string(),
        });
    }
}

/// [`MessageSink`] backed by an rdkafka `FutureProducer`.
pub struct KafkaSink {
    producer: Arc<FutureProducer<RelayContext>>,
    queue_timeout: Timeout,
    relay: JoinHandle<()>,
    client_errors: Mutex<Option<mpsc::Receiver<ClientError>>>,
}

impl KafkaSink {
    /// Create the producer and spawn the client-error relay.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn connect(config: &BrokerConfig) -> Result<Self> {
        config.validate()?;

        let (raw_tx, mut raw_rx) = mpsc::unbounded_channel::<ClientError>();
        let (slot_tx, slot_rx) = mpsc::channel::<ClientError>(1);

        let producer: FutureProducer<RelayContext> = config
            .client_config()
            .create_with_context(RelayContext { errors: raw_tx })?;

        let relay = tokio::spawn(async move {
            while let Some(client_error) = raw_rx.recv().await {
                tracing::warn!("Kafka client error: {client_error}");
                if slot_tx.try_send(client_error).is_err() {
                    tracing::debug!("Client error slot full or unobserved, dropping error");
                }
            }
        });

        tracing::info!(
            "Kafka producer created for brokers '{}' (acks={}, retries={})",
            config.brokers,
            config.required_acks,
            config.max_retries
        );

        Ok(Self {
            producer: Arc::new(producer),
            queue_timeout: config
                .queue_timeout
                .map(Timeout::After)
                .unwrap_or(Timeout::Never),
            relay,
            client_errors: Mutex::new(Some(slot_rx)),
        })
    }
}

#[async_trait]
impl MessageSink for KafkaSink {
    async fn send(&self, topic: &str, payload: Vec<u8>) -> std::result::Result<Delivery, KafkaError> {
        let record = FutureRecord::<(), _>::to(topic).payload(&payload);

        let (partition, offset) = self
            .producer
            .send(record, self.queue_timeout)
            .await
            .map_err(|(err, _)| err)?;

        Ok(Delivery {
            topic: topic.to_string(),
            partition,
            offset,
        })
    }

    async fn flush(&self, timeout: Duration) -> std::result::Result<(), KafkaError> {
        let producer = self.producer.clone();
        tokio::task::spawn_blocking(move || producer.flush(timeout))
            .await
            .map_err(|_| KafkaError::Canceled)?
    }

    fn take_client_errors(&self) -> Option<mpsc::Receiver<ClientError>> {
        self.client_errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl Drop for KafkaSink {
    fn drop(&mut self) {
        self.relay.abort();
    }
}
