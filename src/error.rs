//! Typed errors and HTTP mapping.

use crate::config::RouteKind;
use crate::service::Check;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Startup and definition errors. The library logs these at error level before returning them;
/// callers are expected to abort startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("database argument is invalid: {0}")]
    InvalidDatabase(String),
    #[error("invalid database adapter name: {0}")]
    UnknownAdapter(String),
    #[error("missing property key in model '{0}'")]
    MissingPropertyKey(String),
    #[error("model '{0}' is already defined")]
    DuplicateModel(String),
    #[error("property '{key}' references unknown model '{parent}'")]
    UnknownModel { key: String, parent: String },
    #[error("invalid descriptor for '{key}': {reason}")]
    InvalidDescriptor { key: String, reason: String },
    #[error("invalid routing: {0}")]
    InvalidRouting(String),
    #[error("route {route} conflicts with registered route {existing}")]
    RouteConflict { route: String, existing: String },
    #[error("unknown middleware: {0}")]
    UnknownMiddleware(String),
    #[error("invalid schema for field '{field}': {reason}")]
    InvalidSchema { field: String, reason: String },
}

#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("unknown entity: {0}")]
    UnknownEntity(String),
    #[error("backend: {0}")]
    Backend(String),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
}

impl AdapterError {
    pub fn code(&self) -> &'static str {
        match self {
            AdapterError::NotFound(_) => "not_found",
            AdapterError::UnknownEntity(_) => "unknown_entity",
            AdapterError::Backend(_) => "backend_error",
            AdapterError::Db(_) => "database_error",
        }
    }

    /// JSON form attached to error responses as `details`.
    pub fn details(&self) -> serde_json::Value {
        serde_json::json!({
            "code": self.code(),
            "message": self.to_string(),
        })
    }
}

/// Errors from the library entry points (`start`, `define`, `listen`).
#[derive(Error, Debug)]
pub enum LayerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Adapter(#[from] AdapterError),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-request failure. Exactly one of these becomes the response when a handler fails.
#[derive(Debug)]
pub enum RouteError {
    Validation(Check),
    Adapter {
        kind: RouteKind,
        message: String,
        details: Option<serde_json::Value>,
    },
}

impl RouteError {
    pub fn status(&self) -> StatusCode {
        match self {
            RouteError::Validation(_) => StatusCode::NOT_FOUND,
            RouteError::Adapter { kind, .. } => match kind {
                RouteKind::FetchAll | RouteKind::Fetch | RouteKind::Create | RouteKind::Empty => {
                    StatusCode::NOT_FOUND
                }
                RouteKind::Upsert | RouteKind::Update | RouteKind::Remove | RouteKind::Count => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Check>,
}

impl IntoResponse for RouteError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = match self {
            RouteError::Validation(check) => ErrorDetail {
                code: "validation_error".to_string(),
                message: "Request body failed validation.".to_string(),
                details: None,
                fields: Some(check),
            },
            RouteError::Adapter { message, details, .. } => ErrorDetail {
                code: if status == StatusCode::NOT_FOUND {
                    "not_found".to_string()
                } else {
                    "adapter_error".to_string()
                },
                message,
                details,
                fields: None,
            },
        };
        (status, Json(ErrorBody { error: detail })).into_response()
    }
}
