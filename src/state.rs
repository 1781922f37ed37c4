//! Per-route state captured at registration. Immutable; shared by every request to that route.

use crate::adapter::Adapter;
use crate::config::{RouteKind, RouteOptions};
use crate::logging::Logger;
use crate::service::Validator;
use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub type MiddlewareFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// Named middleware run before a generated handler. Registered on the library, referenced from
/// route options by name.
pub type Middleware = Arc<dyn Fn(Request, Next) -> MiddlewareFuture + Send + Sync>;

pub struct RouteState {
    pub entity: String,
    pub kind: RouteKind,
    pub options: RouteOptions,
    pub validator: Arc<Validator>,
    pub adapter: Arc<dyn Adapter>,
    pub log: Logger,
}

pub type SharedRouteState = Arc<RouteState>;
