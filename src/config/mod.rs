//! Command line and config file handling.
//!
//! Options come from three places, highest precedence first: the command
//! line (or the matching `HEY_KAFKA_*` environment variable), the optional
//! config file given with `--file`, and built-in defaults.

pub mod duration;

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;
use thiserror::Error;

use hey_kafka_schema_registry::DEFAULT_REQUEST_TIMEOUT;

pub use duration::parse_duration;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 9092;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", .path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}: {reason}", .path.display())]
    ParseFile { path: PathBuf, reason: String },

    #[error(
        "Unsupported config file {} (expected a .toml, .yaml, .yml or .json file)",
        .0.display()
    )]
    UnsupportedFormat(PathBuf),

    #[error("Missing required option '{0}'")]
    MissingField(&'static str),

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("Failed to read {field} from {}: {source}", .path.display())]
    ReadInput {
        field: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "hey-kafka")]
#[command(about = "Dispatch binary encoded Avro messages to Kafka")]
#[command(long_about = None)]
pub struct CliArgs {
    /// The Avro schema to use, either inline or a path to a file containing it
    #[arg(short = 's', long, env = "HEY_KAFKA_SCHEMA")]
    pub schema: Option<String>,

    /// The message to send in its JSON form, either inline or a path to a file containing it
    #[arg(short = 'm', long, env = "HEY_KAFKA_MESSAGE")]
    pub message: Option<String>,

    /// The host Kafka is listening on [default: localhost]
    #[arg(short = 'H', long, env = "HEY_KAFKA_HOST")]
    pub host: Option<String>,

    /// The port Kafka is listening on [default: 9092]
    #[arg(short = 'P', long, env = "HEY_KAFKA_PORT")]
    pub port: Option<u16>,

    /// The topic to send the message to, also used as the schema registry subject
    #[arg(short = 't', long, env = "HEY_KAFKA_TOPIC")]
    pub topic: Option<String>,

    /// Address of the schema registry, e.g. localhost:8081
    #[arg(long, env = "HEY_KAFKA_SCHEMA_REGISTRY_ADDRESS")]
    pub schema_registry_address: Option<String>,

    /// Timeout for each schema registry request (e.g. "30s", "1m") [default: 30s]
    #[arg(long, env = "HEY_KAFKA_REGISTRY_TIMEOUT")]
    pub registry_timeout: Option<String>,

    /// Give up if the message is not acknowledged within this time (e.g. "10s")
    #[arg(long, env = "HEY_KAFKA_DELIVERY_TIMEOUT")]
    pub delivery_timeout: Option<String>,

    /// Optional config file (.toml, .yaml, .yml or .json). Command line options take precedence
    #[arg(short = 'f', long, env = "HEY_KAFKA_FILE")]
    pub file: Option<PathBuf>,
}

/// Contents of a config file; keys mirror the long flag names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FileConfig {
    pub schema: Option<String>,
    pub message: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub topic: Option<String>,
    pub schema_registry_address: Option<String>,
    pub registry_timeout: Option<String>,
    pub delivery_timeout: Option<String>,
}

impl FileConfig {
    /// Load a config file, picking the format from its extension.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        let parsed = match extension.as_deref() {
            Some("toml") => toml::from_str(&content).map_err(|e| e.to_string()),
            Some("yaml" | "yml") => serde_yaml::from_str(&content).map_err(|e| e.to_string()),
            Some("json") => serde_json::from_str(&content).map_err(|e| e.to_string()),
            _ => return Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        };

        parsed.map_err(|reason| ConfigError::ParseFile {
            path: path.to_path_buf(),
            reason,
        })
    }
}

/// Fully resolved and validated options for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Inline schema or a path to it
    pub schema: String,
    /// Inline message or a path to it
    pub message: String,
    pub host: String,
    pub port: u16,
    pub topic: String,
    pub schema_registry_address: Option<String>,
    pub registry_timeout: Duration,
    pub delivery_timeout: Option<Duration>,
}

impl Config {
    /// Merge command line arguments over the config file they name, then
    /// validate the result.
    pub fn load(args: CliArgs) -> Result<Self, ConfigError> {
        let file = match &args.file {
            Some(path) => {
                tracing::debug!("Loading config file {}", path.display());
                FileConfig::from_path(path)?
            }
            None => FileConfig::default(),
        };
        Self::merge(args, file)
    }

    /// Combine both sources, command line first, and validate.
    pub fn merge(args: CliArgs, file: FileConfig) -> Result<Self, ConfigError> {
        let schema = required("schema", pick(args.schema, file.schema))?;
        let message = required("message", pick(args.message, file.message))?;
        let topic = required("topic", pick(args.topic, file.topic))?;
        let host = pick(args.host, file.host).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = args.port.or(file.port).unwrap_or(DEFAULT_PORT);

        if port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "port",
                reason: "port must be between 1 and 65535".to_string(),
            });
        }
        if topic.chars().any(char::is_whitespace) {
            return Err(ConfigError::InvalidValue {
                field: "topic",
                reason: format!("'{topic}' contains whitespace"),
            });
        }

        let registry_timeout = match pick(args.registry_timeout, file.registry_timeout) {
            Some(value) => positive_duration("registry-timeout", &value)?,
            None => DEFAULT_REQUEST_TIMEOUT,
        };
        let delivery_timeout = pick(args.delivery_timeout, file.delivery_timeout)
            .map(|value| positive_duration("delivery-timeout", &value))
            .transpose()?;

        Ok(Self {
            schema,
            message,
            host,
            port,
            topic,
            schema_registry_address: pick(
                args.schema_registry_address,
                file.schema_registry_address,
            ),
            registry_timeout,
            delivery_timeout,
        })
    }

    /// Kafka bootstrap servers in `host:port` form.
    pub fn brokers(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// First non-blank value; blank strings count as unset.
fn pick(cli: Option<String>, file: Option<String>) -> Option<String> {
    cli.filter(|v| !v.trim().is_empty())
        .or(file)
        .filter(|v| !v.trim().is_empty())
}

fn required(field: &'static str, value: Option<String>) -> Result<String, ConfigError> {
    value.ok_or(ConfigError::MissingField(field))
}

fn positive_duration(field: &'static str, value: &str) -> Result<Duration, ConfigError> {
    let duration = parse_duration(value).map_err(|e| ConfigError::InvalidValue {
        field,
        reason: format!("{e:#}"),
    })?;
    if duration.is_zero() {
        return Err(ConfigError::InvalidValue {
            field,
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(duration)
}
