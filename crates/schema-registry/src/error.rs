//! Error types for the schema registry client.

use thiserror::Error;

/// Errors that can occur while talking to a schema registry.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Schema registry unavailable at {url}: {source}")]
    Unavailable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Error response from schema registry for endpoint {endpoint}: {status} {body}")]
    Rejected {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("Could not parse schema registry response: {source} (body: {body})")]
    ResponseParse {
        body: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid schema registry configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for schema registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
