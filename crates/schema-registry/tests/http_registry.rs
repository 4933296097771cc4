//! Integration tests for the HTTP schema registry client.
//!
//! Each test starts an in-process stub registry that assigns ids the way a
//! Confluent registry does (one id per distinct schema) and counts the
//! registrations it receives.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use hey_kafka_avro::AvroCodec;
use hey_kafka_schema_registry::{
    HttpSchemaRegistry, RegistryConfig, RegistryError, SchemaRegistry,
};
use serde_json::{json, Value as JsonValue};
use tokio::net::TcpListener;

const USER_SCHEMA: &str = r#"
{
    "type": "record",
    "name": "UserCreated",
    "fields": [
        {"name": "userId", "type": "long"},
        {"name": "firstReferrer", "type": "string"},
        {"name": "ts", "type": "long"}
    ]
}
"#;

const ORDER_SCHEMA: &str = r#"
{
    "type": "record",
    "name": "OrderPlaced",
    "fields": [
        {"name": "orderId", "type": "string"},
        {"name": "amount", "type": "double"}
    ]
}
"#;

/// How the stub answers registrations
#[derive(Clone, Copy)]
enum Mode {
    Assign,
    Reject,
    Garbage,
}

struct StubRegistry {
    mode: Mode,
    posts: AtomicUsize,
    delay: Duration,
    ids: Mutex<HashMap<String, u32>>,
    content_types: Mutex<Vec<String>>,
    subjects: Mutex<Vec<String>>,
}

impl StubRegistry {
    fn new(mode: Mode) -> Arc<Self> {
        Arc::new(Self {
            mode,
            posts: AtomicUsize::new(0),
            delay: Duration::ZERO,
            ids: Mutex::new(HashMap::new()),
            content_types: Mutex::new(Vec::new()),
            subjects: Mutex::new(Vec::new()),
        })
    }

    fn with_delay(mode: Mode, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            mode,
            posts: AtomicUsize::new(0),
            delay,
            ids: Mutex::new(HashMap::new()),
            content_types: Mutex::new(Vec::new()),
            subjects: Mutex::new(Vec::new()),
        })
    }

    fn posts(&self) -> usize {
        self.posts.load(Ordering::SeqCst)
    }
}

/// Handler for POST /subjects/:subject/versions
async fn register(
    State(stub): State<Arc<StubRegistry>>,
    Path(subject): Path<String>,
    headers: HeaderMap,
    body: String,
) -> Response {
    stub.posts.fetch_add(1, Ordering::SeqCst);
    stub.subjects.lock().unwrap().push(subject);
    if let Some(content_type) = headers.get("content-type").and_then(|v| v.to_str().ok()) {
        stub.content_types
            .lock()
            .unwrap()
            .push(content_type.to_string());
    }

    if !stub.delay.is_zero() {
        tokio::time::sleep(stub.delay).await;
    }

    match stub.mode {
        Mode::Reject => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"error_code": 42201, "message": "Invalid schema"})),
        )
            .into_response(),
        Mode::Garbage => (StatusCode::OK, "not json at all").into_response(),
        Mode::Assign => {
            let request: JsonValue = match serde_json::from_str(&body) {
                Ok(request) => request,
                Err(_) => return (StatusCode::BAD_REQUEST, "bad body").into_response(),
            };
            let Some(schema) = request["schema"].as_str() else {
                return (StatusCode::BAD_REQUEST, "missing schema").into_response();
            };

            let mut ids = stub.ids.lock().unwrap();
            let next_id = ids.len() as u32 + 1;
            let id = *ids.entry(schema.to_string()).or_insert(next_id);
            (StatusCode::OK, Json(json!({ "id": id }))).into_response()
        }
    }
}

/// Handler for GET /schemas/ids/:id
async fn schema_by_id(State(stub): State<Arc<StubRegistry>>, Path(id): Path<u32>) -> Response {
    let ids = stub.ids.lock().unwrap();
    match ids.iter().find(|(_, known)| **known == id) {
        Some((schema, _)) => (StatusCode::OK, Json(json!({ "schema": schema }))).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"error_code": 40403, "message": "Schema not found"})),
        )
            .into_response(),
    }
}

/// Start a stub registry on a random port
async fn start_stub(stub: Arc<StubRegistry>) -> anyhow::Result<(String, tokio::task::JoinHandle<()>)> {
    let app = Router::new()
        .route("/subjects/:subject/versions", post(register))
        .route("/schemas/ids/:id", get(schema_by_id))
        .with_state(stub);

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let base_url = format!("http://{addr}");

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Ok((base_url, server_handle))
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .try_init();
}

#[tokio::test]
async fn test_identical_registrations_hit_network_once() {
    init_tracing();
    let stub = StubRegistry::new(Mode::Assign);
    let (url, _server) = start_stub(stub.clone()).await.unwrap();

    let registry = HttpSchemaRegistry::new(RegistryConfig::new(url)).unwrap();
    let codec = AvroCodec::compile(USER_SCHEMA).unwrap();

    let first = registry.register_schema(&codec, "users").await.unwrap();
    let second = registry.register_schema(&codec, "users").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(stub.posts(), 1);
    assert_eq!(registry.cached_ids(), 1);
}

#[tokio::test]
async fn test_recompiled_codec_shares_cache_entry() {
    let stub = StubRegistry::new(Mode::Assign);
    let (url, _server) = start_stub(stub.clone()).await.unwrap();
    let registry = HttpSchemaRegistry::new(RegistryConfig::new(url)).unwrap();

    for _ in 0..3 {
        let codec = AvroCodec::compile(USER_SCHEMA).unwrap();
        registry.register_schema(&codec, "users").await.unwrap();
    }

    assert_eq!(stub.posts(), 1);
}

#[tokio::test]
async fn test_distinct_schemas_register_separately() {
    let stub = StubRegistry::new(Mode::Assign);
    let (url, _server) = start_stub(stub.clone()).await.unwrap();
    let registry = HttpSchemaRegistry::new(RegistryConfig::new(url)).unwrap();

    let users = AvroCodec::compile(USER_SCHEMA).unwrap();
    let orders = AvroCodec::compile(ORDER_SCHEMA).unwrap();

    let users_id = registry.register_schema(&users, "events").await.unwrap();
    let orders_id = registry.register_schema(&orders, "events").await.unwrap();

    assert_eq!(stub.posts(), 2);
    assert_ne!(users_id, orders_id);
    assert_eq!(registry.cached_ids(), 2);
}

#[tokio::test]
async fn test_same_schema_under_two_subjects_registers_twice() {
    let stub = StubRegistry::new(Mode::Assign);
    let (url, _server) = start_stub(stub.clone()).await.unwrap();
    let registry = HttpSchemaRegistry::new(RegistryConfig::new(url)).unwrap();
    let codec = AvroCodec::compile(USER_SCHEMA).unwrap();

    registry.register_schema(&codec, "users").await.unwrap();
    registry.register_schema(&codec, "users-audit").await.unwrap();

    assert_eq!(stub.posts(), 2);
}

#[tokio::test]
async fn test_concurrent_first_registrations_converge() {
    init_tracing();
    let stub = StubRegistry::with_delay(Mode::Assign, Duration::from_millis(50));
    let (url, _server) = start_stub(stub.clone()).await.unwrap();
    let registry = Arc::new(HttpSchemaRegistry::new(RegistryConfig::new(url)).unwrap());

    let callers = 8;
    let mut handles = Vec::with_capacity(callers);
    for _ in 0..callers {
        let registry = registry.clone();
        handles.push(tokio::spawn(async move {
            let codec = AvroCodec::compile(USER_SCHEMA).unwrap();
            registry.register_schema(&codec, "users").await.unwrap()
        }));
    }

    let mut ids = Vec::with_capacity(callers);
    for handle in handles {
        ids.push(handle.await.unwrap());
    }

    assert!(ids.windows(2).all(|pair| pair[0] == pair[1]));
    assert!(stub.posts() >= 1 && stub.posts() <= callers);
}

#[tokio::test]
async fn test_request_uses_registry_content_type() {
    let stub = StubRegistry::new(Mode::Assign);
    let (url, _server) = start_stub(stub.clone()).await.unwrap();
    let registry = HttpSchemaRegistry::new(RegistryConfig::new(url)).unwrap();
    let codec = AvroCodec::compile(USER_SCHEMA).unwrap();

    registry.register_schema(&codec, "users").await.unwrap();

    let content_types = stub.content_types.lock().unwrap().clone();
    assert_eq!(
        content_types,
        vec!["application/vnd.schemaregistry.v1+json".to_string()]
    );
}

#[tokio::test]
async fn test_rejected_schema_is_not_cached() {
    let stub = StubRegistry::new(Mode::Reject);
    let (url, _server) = start_stub(stub.clone()).await.unwrap();
    let registry = HttpSchemaRegistry::new(RegistryConfig::new(url)).unwrap();
    let codec = AvroCodec::compile(USER_SCHEMA).unwrap();

    let err = registry.register_schema(&codec, "users").await.unwrap_err();
    match err {
        RegistryError::Rejected { status, body, .. } => {
            assert_eq!(status, 422);
            assert!(body.contains("Invalid schema"));
        }
        other => panic!("expected Rejected, got {other:?}"),
    }

    // Failures are retried on the next call
    assert!(registry.register_schema(&codec, "users").await.is_err());
    assert_eq!(stub.posts(), 2);
    assert_eq!(registry.cached_ids(), 0);
}

#[tokio::test]
async fn test_malformed_response_body() {
    let stub = StubRegistry::new(Mode::Garbage);
    let (url, _server) = start_stub(stub).await.unwrap();
    let registry = HttpSchemaRegistry::new(RegistryConfig::new(url)).unwrap();
    let codec = AvroCodec::compile(USER_SCHEMA).unwrap();

    let err = registry.register_schema(&codec, "users").await.unwrap_err();
    assert!(matches!(err, RegistryError::ResponseParse { .. }));
}

#[tokio::test]
async fn test_unreachable_registry() {
    // Reserve a port, then free it so nothing is listening there
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let registry = HttpSchemaRegistry::new(
        RegistryConfig::new(format!("http://{addr}")).with_timeout(Duration::from_secs(2)),
    )
    .unwrap();
    let codec = AvroCodec::compile(USER_SCHEMA).unwrap();

    let err = registry.register_schema(&codec, "users").await.unwrap_err();
    assert!(matches!(err, RegistryError::Unavailable { .. }));
}

#[tokio::test]
async fn test_slow_registry_times_out() {
    let stub = StubRegistry::with_delay(Mode::Assign, Duration::from_secs(5));
    let (url, _server) = start_stub(stub).await.unwrap();
    let registry = HttpSchemaRegistry::new(
        RegistryConfig::new(url).with_timeout(Duration::from_millis(200)),
    )
    .unwrap();
    let codec = AvroCodec::compile(USER_SCHEMA).unwrap();

    let err = registry.register_schema(&codec, "users").await.unwrap_err();
    assert!(matches!(err, RegistryError::Unavailable { .. }));
}

#[tokio::test]
async fn test_fetch_schema_by_id() {
    let stub = StubRegistry::new(Mode::Assign);
    let (url, _server) = start_stub(stub).await.unwrap();
    let registry = HttpSchemaRegistry::new(RegistryConfig::new(url)).unwrap();
    let codec = AvroCodec::compile(ORDER_SCHEMA).unwrap();

    let id = registry.register_schema(&codec, "orders").await.unwrap();
    let schema = registry.fetch_schema(id).await.unwrap();
    assert_eq!(schema, ORDER_SCHEMA);

    let err = registry.fetch_schema(id + 100).await.unwrap_err();
    assert!(matches!(err, RegistryError::Rejected { status: 404, .. }));
}

#[tokio::test]
async fn test_subject_with_reserved_characters() {
    let stub = StubRegistry::new(Mode::Assign);
    let (url, _server) = start_stub(stub.clone()).await.unwrap();
    let registry = HttpSchemaRegistry::new(RegistryConfig::new(url)).unwrap();
    let codec = AvroCodec::compile(USER_SCHEMA).unwrap();

    let id = registry
        .register_schema(&codec, "team/users value")
        .await
        .unwrap();

    assert_eq!(id, 1);
    assert_eq!(
        stub.subjects.lock().unwrap().as_slice(),
        ["team/users value"]
    );
}
