use std::time::Duration;

use hey_kafka_avro::CodecError;
use hey_kafka_schema_registry::RegistryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProduceError {
    #[error("Invalid configuration: {0}")]
    ConfigValidation(String),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Kafka error: {0}")]
    BrokerSend(#[from] rdkafka::error::KafkaError),

    #[error("Produce did not complete within {0:?}")]
    DeadlineExceeded(Duration),

    #[error("Produce task ended before reporting a result")]
    Cancelled,
}

/// Coarse classification of a [`ProduceError`], one per pipeline failure mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ConfigValidation,
    SchemaCompile,
    MessageParse,
    Encoding,
    RegistryUnavailable,
    RegistrySchemaRejected,
    ResponseParse,
    BrokerSend,
    Timeout,
}

impl ProduceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ConfigValidation(_) => ErrorKind::ConfigValidation,
            Self::Codec(CodecError::SchemaCompile(_)) => ErrorKind::SchemaCompile,
            Self::Codec(CodecError::MessageParse(_)) => ErrorKind::MessageParse,
            Self::Codec(
                CodecError::Encoding(_) | CodecError::Decoding(_) | CodecError::InvalidFrame(_),
            ) => ErrorKind::Encoding,
            Self::Registry(RegistryError::Unavailable { .. }) => ErrorKind::RegistryUnavailable,
            Self::Registry(RegistryError::Rejected { .. }) => ErrorKind::RegistrySchemaRejected,
            Self::Registry(RegistryError::ResponseParse { .. }) => ErrorKind::ResponseParse,
            Self::Registry(RegistryError::InvalidConfig(_)) => ErrorKind::ConfigValidation,
            Self::BrokerSend(_) => ErrorKind::BrokerSend,
            Self::DeadlineExceeded(_) | Self::Cancelled => ErrorKind::Timeout,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProduceError>;
