//! HTTP-level tests: generated routes driven with `oneshot` against a recording adapter.

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    extract::Request,
    http::{header, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Router,
};
use layer::{
    Adapter, AdapterError, AdapterRegistry, Document, Layer, LayerError, Library, Logger, Query, Schema,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

/// Records every call; `fail` makes every data call return an error.
#[derive(Default)]
struct RecordingAdapter {
    calls: Mutex<Vec<(&'static str, Value)>>,
    fail: bool,
}

impl RecordingAdapter {
    fn failing() -> Self {
        RecordingAdapter {
            fail: true,
            ..Default::default()
        }
    }

    fn record(&self, op: &'static str, args: Value) -> Result<(), AdapterError> {
        self.calls.lock().unwrap().push((op, args));
        if self.fail {
            Err(AdapterError::Backend(format!("{} failed", op)))
        } else {
            Ok(())
        }
    }

    fn calls(&self) -> Vec<(&'static str, Value)> {
        self.calls.lock().unwrap().clone()
    }

    fn data_calls(&self) -> Vec<(&'static str, Value)> {
        self.calls().into_iter().filter(|(op, _)| *op != "define").collect()
    }
}

#[async_trait]
impl Adapter for RecordingAdapter {
    async fn define(&self, entity: &str, collection: &str, schema: &Schema) -> Result<(), AdapterError> {
        self.calls
            .lock()
            .unwrap()
            .push(("define", json!({ "entity": entity, "collection": collection, "schema": schema })));
        Ok(())
    }

    async fn all(&self, _entity: &str, filter: Query) -> Result<Value, AdapterError> {
        self.record("all", Value::Object(filter))?;
        Ok(json!([
            { "id": 1, "name": "ada", "password": "secret" },
            { "id": 2, "name": "bob", "password": "hunter2" }
        ]))
    }

    async fn find(&self, _entity: &str, query: Query) -> Result<Value, AdapterError> {
        self.record("find", Value::Object(query))?;
        Ok(json!({ "id": 42, "name": "ada" }))
    }

    async fn create(&self, _entity: &str, data: Document) -> Result<Value, AdapterError> {
        self.record("create", Value::Object(data))?;
        Ok(json!({ "id": 1 }))
    }

    async fn upsert(&self, _entity: &str, selector: Query, data: Document) -> Result<Value, AdapterError> {
        self.record("upsert", json!({ "selector": selector, "data": data.clone() }))?;
        Ok(Value::Object(data))
    }

    async fn update(&self, _entity: &str, selector: Query, data: Document) -> Result<Value, AdapterError> {
        self.record("update", json!({ "selector": selector, "data": data.clone() }))?;
        Ok(Value::Object(data))
    }

    async fn remove(&self, _entity: &str, selector: Query) -> Result<Value, AdapterError> {
        self.record("remove", Value::Object(selector))?;
        Ok(json!({ "id": 42 }))
    }

    async fn count(&self, _entity: &str, filter: Query) -> Result<Value, AdapterError> {
        self.record("count", Value::Object(filter))?;
        Ok(json!(2))
    }

    async fn empty(&self, _entity: &str) -> Result<(), AdapterError> {
        self.record("empty", Value::Null)
    }
}

fn library_with(adapter: Arc<RecordingAdapter>) -> Library {
    let mut registry = AdapterRegistry::new();
    registry.register("recording", move |_, _| Ok(adapter.clone() as Arc<dyn Adapter>));
    Layer::with_registry(registry, Logger::default())
        .start(Router::new(), &json!({ "name": "recording" }))
        .unwrap()
}

fn user_descriptor() -> Value {
    json!({
        "collection": true,
        "name": { "type": "string", "required": true, "length": { "min": 3, "max": 32 } },
        "password": { "type": "string", "required": true, "length": { "min": 6 } }
    })
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(b) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn default_route_set_without_routing() {
    let adapter = Arc::new(RecordingAdapter::default());
    let mut lib = library_with(adapter.clone());
    lib.define("User", user_descriptor()).await.unwrap();

    let routes: Vec<(Method, String)> = lib.routes().iter().map(|r| (r.method.clone(), r.path.clone())).collect();
    assert_eq!(
        routes,
        vec![
            (Method::GET, "/users".to_string()),
            (Method::GET, "/user/:id".to_string()),
            (Method::POST, "/user".to_string()),
            (Method::PUT, "/user/:id".to_string()),
            (Method::PATCH, "/user/:id".to_string()),
            (Method::DELETE, "/user/:id".to_string()),
        ]
    );

    let calls = adapter.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "define");
    assert_eq!(calls[0].1["collection"], "User");
    assert_eq!(calls[0].1["schema"]["name"]["type"], "string");
}

#[tokio::test]
async fn explicit_routing_keeps_only_truthy_kinds() {
    let adapter = Arc::new(RecordingAdapter::default());
    let mut lib = library_with(adapter.clone());
    lib.define(
        "User",
        json!({
            "routing": { "fetch": { "by": "name" }, "create": true, "count": false, "empty": true }
        }),
    )
    .await
    .unwrap();

    let paths: Vec<&str> = lib.routes().iter().map(|r| r.path.as_str()).collect();
    assert_eq!(paths, vec!["/user/:name", "/user", "/user/empty"]);
    // not collection-backed
    assert!(adapter.calls().is_empty());

    let app = lib.into_router();
    let (status, body) = send(&app, Method::GET, "/user/empty", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    send(&app, Method::GET, "/user/ada", None).await;
    assert_eq!(adapter.data_calls().last().cloned(), Some(("find", json!({ "name": "ada" }))));
}

#[tokio::test]
async fn invalid_create_never_reaches_adapter() {
    let adapter = Arc::new(RecordingAdapter::default());
    let mut lib = library_with(adapter.clone());
    lib.define("User", user_descriptor()).await.unwrap();
    let app = lib.into_router();

    let (status, body) = send(&app, Method::POST, "/user", Some(json!({ "name": "al" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "validation_error");
    assert_eq!(body["error"]["fields"]["_error"], true);
    assert!(body["error"]["fields"]["name"].is_array());
    assert!(body["error"]["fields"]["password"].is_array());
    assert!(adapter.data_calls().is_empty());
}

#[tokio::test]
async fn valid_create_returns_adapter_result() {
    let adapter = Arc::new(RecordingAdapter::default());
    let mut lib = library_with(adapter.clone());
    lib.define("User", user_descriptor()).await.unwrap();
    let app = lib.into_router();

    let (status, body) = send(
        &app,
        Method::POST,
        "/user",
        Some(json!({ "name": "ada", "password": "lovelace" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "id": 1 }));
    assert_eq!(
        adapter.data_calls(),
        vec![("create", json!({ "name": "ada", "password": "lovelace" }))]
    );
}

#[tokio::test]
async fn fetch_builds_lookup_from_path() {
    let adapter = Arc::new(RecordingAdapter::default());
    let mut lib = library_with(adapter.clone());
    lib.define("User", json!({ "routing": { "fetch": { "by": "id" } } })).await.unwrap();
    let app = lib.into_router();

    let (status, body) = send(&app, Method::GET, "/user/42?extra=1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], 42);
    // not searchable: query string is ignored
    assert_eq!(adapter.data_calls(), vec![("find", json!({ "id": "42" }))]);
}

#[tokio::test]
async fn searchable_fetch_merges_query_string() {
    let adapter = Arc::new(RecordingAdapter::default());
    let mut lib = library_with(adapter.clone());
    lib.define("User", json!({})).await.unwrap();
    let app = lib.into_router();

    send(&app, Method::GET, "/user/7?active=true&id=9", None).await;
    // path value wins over a query parameter of the same name
    assert_eq!(adapter.data_calls(), vec![("find", json!({ "active": "true", "id": "7" }))]);
}

#[tokio::test]
async fn failed_remove_reports_key_and_value() {
    let adapter = Arc::new(RecordingAdapter::failing());
    let mut lib = library_with(adapter.clone());
    lib.define("User", json!({})).await.unwrap();
    let app = lib.into_router();

    let (status, body) = send(&app, Method::DELETE, "/user/42", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "adapter_error");
    assert_eq!(body["error"]["message"], "Could not delete entry with id of 42");
}

#[tokio::test]
async fn failed_reads_are_not_found() {
    let adapter = Arc::new(RecordingAdapter::failing());
    let mut lib = library_with(adapter.clone());
    lib.define("User", json!({})).await.unwrap();
    let app = lib.into_router();

    let (status, body) = send(&app, Method::GET, "/users", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["message"], "No data found.");

    let (status, body) = send(&app, Method::PUT, "/user/3", Some(json!({ "name": "x" }))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["message"], "Could not upsert entry with id of 3");
    assert_eq!(body["error"]["details"]["code"], "backend_error");
}

#[tokio::test]
async fn fetch_all_strips_password_and_forwards_filter() {
    let adapter = Arc::new(RecordingAdapter::default());
    let mut lib = library_with(adapter.clone());
    lib.define("User", json!({})).await.unwrap();
    let app = lib.into_router();

    let (status, body) = send(&app, Method::GET, "/users?limit=1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([{ "id": 1, "name": "ada" }, { "id": 2, "name": "bob" }]));
    assert_eq!(adapter.data_calls(), vec![("all", json!({ "limit": "1" }))]);
}

#[tokio::test]
async fn update_validates_only_present_fields() {
    let adapter = Arc::new(RecordingAdapter::default());
    let mut lib = library_with(adapter.clone());
    lib.define("User", user_descriptor()).await.unwrap();
    let app = lib.into_router();

    let (status, _) = send(&app, Method::PATCH, "/user/1", Some(json!({ "name": "grace" }))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, Method::PATCH, "/user/1", Some(json!({ "password": "abc" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"]["fields"]["password"].is_array());
    assert!(body["error"]["fields"].get("name").is_none());

    assert_eq!(
        adapter.data_calls(),
        vec![("update", json!({ "selector": { "id": "1" }, "data": { "name": "grace" } }))]
    );
}

async fn deny_without_token(req: Request, next: Next) -> Response {
    if req.headers().contains_key(header::AUTHORIZATION) {
        next.run(req).await
    } else {
        StatusCode::UNAUTHORIZED.into_response()
    }
}

#[tokio::test]
async fn middleware_runs_before_handler() {
    let adapter = Arc::new(RecordingAdapter::default());
    let mut lib = library_with(adapter.clone());
    lib.middleware("auth", deny_without_token);
    lib.define(
        "User",
        json!({ "routing": { "fetchAll": { "middleware": ["auth"] }, "count": true } }),
    )
    .await
    .unwrap();
    let app = lib.into_router();

    let (status, _) = send(&app, Method::GET, "/users", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(adapter.data_calls().is_empty());

    let request = Request::builder()
        .uri("/users")
        .header(header::AUTHORIZATION, "Bearer t")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // other kinds are unaffected
    let (status, body) = send(&app, Method::GET, "/user/count", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(2));
}

#[tokio::test]
async fn start_rejects_invalid_database_config() {
    let layer = Layer::new(Logger::default());
    assert!(matches!(
        layer.start(Router::new(), &json!({ "url": "x" })).err(),
        Some(LayerError::Config(_))
    ));
    assert!(matches!(
        layer.start(Router::new(), &json!({ "name": "couchdb" })).err(),
        Some(LayerError::Config(_))
    ));
    assert!(layer.start(Router::new(), &json!({ "name": "memory" })).is_ok());
}

#[tokio::test]
async fn body_limit_rejects_large_payloads() {
    let adapter = Arc::new(RecordingAdapter::default());
    let mut lib = library_with(adapter.clone());
    lib.define("User", json!({})).await.unwrap();
    lib.set_body_limit(16);
    let app = lib.into_router();

    let payload = json!({ "name": "a much longer name than allowed" }).to_string();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/user")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CONTENT_LENGTH, payload.len())
        .body(Body::from(payload))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(adapter.data_calls().is_empty());
}

#[tokio::test]
async fn memory_adapter_end_to_end() {
    let mut lib = layer::start(Router::new(), &json!({ "name": "memory" }), Logger::default()).unwrap();
    lib.define(
        "Post",
        json!({
            "collection": "posts",
            "routing": {
                "fetchAll": true,
                "fetch": { "by": "slug" },
                "create": true,
                "update": { "by": "slug" },
                "remove": { "by": "slug" },
                "count": true,
                "empty": true
            },
            "slug": { "type": "string", "required": true },
            "title": { "type": "string" },
            "meta": { "parent": { "views": { "type": "integer" } } }
        }),
    )
    .await
    .unwrap();
    let app = lib.into_router();

    let (status, created) = send(
        &app,
        Method::POST,
        "/post",
        Some(json!({ "slug": "hello", "title": "Hello", "meta": { "views": 1 } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["id"], 1);

    let (status, _) = send(&app, Method::POST, "/post", Some(json!({ "slug": "bye", "meta": { "views": "x" } }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    send(&app, Method::POST, "/post", Some(json!({ "slug": "second" }))).await;
    let (_, count) = send(&app, Method::GET, "/post/count", None).await;
    assert_eq!(count, json!(2));

    let (status, updated) = send(&app, Method::PATCH, "/post/hello", Some(json!({ "title": "Hi" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Hi");

    let (_, fetched) = send(&app, Method::GET, "/post/hello", None).await;
    assert_eq!(fetched["title"], "Hi");
    assert_eq!(fetched["meta"]["views"], 1);

    let (status, _) = send(&app, Method::DELETE, "/post/hello", None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send(&app, Method::GET, "/post/hello", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["message"], "No data found.");

    let (status, _) = send(&app, Method::GET, "/post/empty", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, all) = send(&app, Method::GET, "/posts", None).await;
    assert_eq!(all, json!([]));
}

#[tokio::test]
async fn invalid_upsert_never_reaches_adapter() {
    let adapter = Arc::new(RecordingAdapter::default());
    let mut lib = library_with(adapter.clone());
    lib.define("User", user_descriptor()).await.unwrap();
    let app = lib.into_router();

    let (status, body) = send(&app, Method::PUT, "/user/1", Some(json!({ "name": "al" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "validation_error");
    assert!(body["error"]["fields"]["password"].is_array());
    assert!(adapter.data_calls().is_empty());
}

#[tokio::test]
async fn failed_update_and_count_are_server_errors() {
    let adapter = Arc::new(RecordingAdapter::failing());
    let mut lib = library_with(adapter.clone());
    lib.define("User", json!({ "routing": { "update": true, "count": true } })).await.unwrap();
    let app = lib.into_router();

    let (status, body) = send(&app, Method::PATCH, "/user/1", Some(json!({ "name": "x" }))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["message"], "Could not update entry with id of 1");

    let (status, body) = send(&app, Method::GET, "/user/count", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["message"], "No data found.");
    assert_eq!(body["error"]["code"], "adapter_error");
}

#[tokio::test]
async fn unreadable_body_is_a_validation_error() {
    let adapter = Arc::new(RecordingAdapter::default());
    let mut lib = library_with(adapter.clone());
    lib.define("User", user_descriptor()).await.unwrap();
    let app = lib.into_router();

    let no_content_type = Request::builder()
        .method(Method::POST)
        .uri("/user")
        .body(Body::from("name=ada"))
        .unwrap();
    let malformed = Request::builder()
        .method(Method::PATCH)
        .uri("/user/1")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"name\": "))
        .unwrap();

    for request in [no_content_type, malformed] {
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "validation_error");
        assert_eq!(body["error"]["fields"]["_error"], true);
        assert!(body["error"]["fields"]["_body"].is_array());
    }
    assert!(adapter.data_calls().is_empty());
}

#[tokio::test]
async fn conflicting_model_leaves_router_intact() {
    let adapter = Arc::new(RecordingAdapter::default());
    let mut lib = library_with(adapter.clone());
    lib.define("User", json!({})).await.unwrap();

    let err = lib.define("user", json!({ "collection": true })).await.err();
    assert!(matches!(err, Some(LayerError::Config(layer::ConfigError::RouteConflict { .. }))));
    // rejected before the adapter saw the collection
    assert!(adapter.calls().is_empty());
    assert_eq!(lib.routes().len(), 6);

    let app = lib.into_router();
    let (status, _) = send(&app, Method::GET, "/user/5", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(adapter.data_calls(), vec![("find", json!({ "id": "5" }))]);
}
