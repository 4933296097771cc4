//! HTTP client for a Confluent-compatible schema registry.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use hey_kafka_avro::AvroCodec;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use crate::error::{RegistryError, Result};
use crate::registry::SchemaRegistry;

/// Content type spoken by the schema registry REST API.
pub const SCHEMA_REGISTRY_CONTENT_TYPE: &str = "application/vnd.schemaregistry.v1+json";

/// Default deadline for a single registry request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for [`HttpSchemaRegistry`]
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Base URL of the registry, e.g. `http://localhost:8081`
    ///
    /// A URL without a scheme (`localhost:8081`) is treated as plain http.
    pub url: String,
    /// Deadline for each HTTP request, connection included
    pub timeout: Duration,
}

impl RegistryConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    schema: &'a str,
}

#[derive(Deserialize)]
struct IdResponse {
    id: u32,
}

#[derive(Deserialize)]
struct SchemaResponse {
    schema: String,
}

/// Registered ids are cached per subject and schema text.
type CacheKey = (String, String);

/// Schema registry client with an in-process id cache.
///
/// Each cache entry is a once-cell: the first caller for a key performs the
/// registration while concurrent callers for the same key wait for its
/// outcome. A failed registration leaves the cell empty, so the next call
/// tries again.
pub struct HttpSchemaRegistry {
    base_url: Url,
    http: Client,
    cache: RwLock<HashMap<CacheKey, Arc<OnceCell<u32>>>>,
}

impl HttpSchemaRegistry {
    pub fn new(config: RegistryConfig) -> Result<Self> {
        let base_url = parse_base_url(&config.url)?;

        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RegistryError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;

        tracing::debug!("Schema registry client configured for {base_url}");

        Ok(Self {
            base_url,
            http,
            cache: RwLock::new(HashMap::new()),
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// Number of (subject, schema) pairs with a cached id.
    pub fn cached_ids(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|slot| slot.initialized())
            .count()
    }

    /// Fetch the schema text registered under `id`.
    pub async fn fetch_schema(&self, id: u32) -> Result<String> {
        let url = self.url_for(&["schemas", "ids", &id.to_string()])?;
        let body = self.call(self.http.get(url.clone()), url).await?;

        let response: SchemaResponse = parse_body(&body)?;
        Ok(response.schema)
    }

    /// Endpoint below the base URL; each segment is percent-encoded, so a
    /// subject containing `/` stays a single path segment.
    fn url_for(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                RegistryError::InvalidConfig(format!(
                    "'{}' cannot be used as a base URL",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Cache slot for `key`, created on first use.
    fn slot(&self, key: &CacheKey) -> Arc<OnceCell<u32>> {
        if let Some(slot) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
        {
            return slot.clone();
        }

        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key.clone())
            .or_default()
            .clone()
    }

    async fn post_schema(&self, subject: &str, schema_text: &str) -> Result<u32> {
        let url = self.url_for(&["subjects", subject, "versions"])?;
        let payload = serde_json::to_vec(&RegisterRequest {
            schema: schema_text,
        })
        .map_err(|e| RegistryError::InvalidConfig(format!("failed to encode request: {e}")))?;

        let request = self
            .http
            .post(url.clone())
            .header(CONTENT_TYPE, SCHEMA_REGISTRY_CONTENT_TYPE)
            .body(payload);
        let body = self.call(request, url).await?;

        let response: IdResponse = parse_body(&body)?;
        tracing::info!(
            "Registered schema under subject '{}' with id {}",
            subject,
            response.id
        );
        Ok(response.id)
    }

    /// Send a request and return the body of a 2xx/3xx response.
    async fn call(&self, request: reqwest::RequestBuilder, url: Url) -> Result<String> {
        let endpoint = url.path().to_string();
        let url = url.to_string();
        let response = request
            .header(ACCEPT, SCHEMA_REGISTRY_CONTENT_TYPE)
            .send()
            .await
            .map_err(|source| RegistryError::Unavailable {
                url: url.clone(),
                source,
            })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|source| RegistryError::Unavailable { url, source })?;

        if !(200..400).contains(&status) {
            return Err(RegistryError::Rejected {
                endpoint,
                status,
                body,
            });
        }

        Ok(body)
    }
}

#[async_trait]
impl SchemaRegistry for HttpSchemaRegistry {
    async fn register_schema(&self, codec: &AvroCodec, subject: &str) -> Result<u32> {
        let key = (subject.to_string(), codec.schema_text().to_string());
        let slot = self.slot(&key);

        if let Some(id) = slot.get() {
            tracing::debug!("Schema id {id} for subject '{subject}' served from cache");
            return Ok(*id);
        }

        tracing::debug!("Schema for subject '{subject}' not cached, registering");
        let id = slot
            .get_or_try_init(|| self.post_schema(subject, codec.schema_text()))
            .await?;
        Ok(*id)
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(RegistryError::InvalidConfig(
            "schema registry URL is empty".to_string(),
        ));
    }

    let with_scheme = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("http://{raw}")
    };

    let url = Url::parse(&with_scheme)
        .map_err(|e| RegistryError::InvalidConfig(format!("invalid URL '{raw}': {e}")))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(RegistryError::InvalidConfig(format!(
            "unsupported URL scheme '{other}' in '{raw}'"
        ))),
    }
}

fn parse_body<T: for<'de> Deserialize<'de>>(body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|source| RegistryError::ResponseParse {
        body: body.to_string(),
        source,
    })
}
