//! Generated CRUD handlers. Each validates (writes only), makes exactly one adapter call, and
//! maps the outcome to one response.

use crate::adapter::{Document, Query};
use crate::config::RouteKind;
use crate::error::{AdapterError, RouteError};
use crate::extractors::Lookup;
use crate::response;
use crate::service::Check;
use crate::state::{RouteState, SharedRouteState};
use axum::{
    extract::{rejection::JsonRejection, Query as QueryParams, State},
    response::Response,
    Json,
};
use serde_json::Value;
use std::collections::HashMap;

const NO_DATA: &str = "No data found.";

/// Map an adapter failure to the kind's status, message and optional details.
fn failure(route: &RouteState, err: AdapterError, value: Option<&str>) -> RouteError {
    let by = route.options.by.as_str();
    let value = value.unwrap_or_default();
    let (message, details) = match route.kind {
        RouteKind::FetchAll | RouteKind::Fetch | RouteKind::Count | RouteKind::Empty => (NO_DATA.to_string(), None),
        RouteKind::Create => ("Could not create entry.".to_string(), Some(err.details())),
        RouteKind::Upsert => (
            format!("Could not upsert entry with {} of {}", by, value),
            Some(err.details()),
        ),
        RouteKind::Update => (format!("Could not update entry with {} of {}", by, value), None),
        RouteKind::Remove => (format!("Could not delete entry with {} of {}", by, value), None),
    };
    route.log.warn(format_args!("{} {} failed: {}", route.kind, route.entity, err));
    RouteError::Adapter {
        kind: route.kind,
        message,
        details,
    }
}

/// Request body as JSON. A body that is missing, mistyped or malformed fails like invalid input.
type JsonBody = Result<Json<Value>, JsonRejection>;

/// Run the validator over a request body; the body reaches the adapter only when it passes.
fn validated(route: &RouteState, body: JsonBody, partial: bool) -> Result<Document, RouteError> {
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => {
            route.log.debug(format_args!("{} {} body rejected: {}", route.kind, route.entity, rejection));
            return Err(RouteError::Validation(Check::body(rejection.body_text())));
        }
    };
    let check = if partial {
        route.validator.check_partial(&body)
    } else {
        route.validator.check(&body)
    };
    match body {
        Value::Object(map) if !check.has_error() => Ok(map),
        _ => {
            route.log.debug(format_args!("{} {} rejected by validation", route.kind, route.entity));
            Err(RouteError::Validation(check))
        }
    }
}

pub async fn fetch_all(
    State(route): State<SharedRouteState>,
    QueryParams(params): QueryParams<HashMap<String, String>>,
) -> Result<Response, RouteError> {
    let filter: Query = params.into_iter().map(|(k, v)| (k, Value::String(v))).collect();
    let data = route
        .adapter
        .all(&route.entity, filter)
        .await
        .map_err(|e| failure(&route, e, None))?;
    Ok(response::ok(data, &route.options.remove))
}

pub async fn fetch(State(route): State<SharedRouteState>, lookup: Lookup) -> Result<Response, RouteError> {
    let data = route
        .adapter
        .find(&route.entity, lookup.query)
        .await
        .map_err(|e| failure(&route, e, Some(&lookup.value)))?;
    Ok(response::ok(data, &route.options.remove))
}

pub async fn create(State(route): State<SharedRouteState>, body: JsonBody) -> Result<Response, RouteError> {
    let data = validated(&route, body, false)?;
    let created = route
        .adapter
        .create(&route.entity, data)
        .await
        .map_err(|e| failure(&route, e, None))?;
    Ok(response::ok(created, &route.options.remove))
}

pub async fn upsert(
    State(route): State<SharedRouteState>,
    lookup: Lookup,
    body: JsonBody,
) -> Result<Response, RouteError> {
    let data = validated(&route, body, false)?;
    let stored = route
        .adapter
        .upsert(&route.entity, lookup.query, data)
        .await
        .map_err(|e| failure(&route, e, Some(&lookup.value)))?;
    Ok(response::ok(stored, &route.options.remove))
}

pub async fn update(
    State(route): State<SharedRouteState>,
    lookup: Lookup,
    body: JsonBody,
) -> Result<Response, RouteError> {
    let data = validated(&route, body, true)?;
    let updated = route
        .adapter
        .update(&route.entity, lookup.query, data)
        .await
        .map_err(|e| failure(&route, e, Some(&lookup.value)))?;
    Ok(response::ok(updated, &route.options.remove))
}

pub async fn remove(State(route): State<SharedRouteState>, lookup: Lookup) -> Result<Response, RouteError> {
    let removed = route
        .adapter
        .remove(&route.entity, lookup.query)
        .await
        .map_err(|e| failure(&route, e, Some(&lookup.value)))?;
    Ok(response::ok(removed, &route.options.remove))
}

pub async fn count(
    State(route): State<SharedRouteState>,
    QueryParams(params): QueryParams<HashMap<String, String>>,
) -> Result<Response, RouteError> {
    let filter: Query = params.into_iter().map(|(k, v)| (k, Value::String(v))).collect();
    let n = route
        .adapter
        .count(&route.entity, filter)
        .await
        .map_err(|e| failure(&route, e, None))?;
    Ok(response::ok(n, &[]))
}

pub async fn empty(State(route): State<SharedRouteState>) -> Result<Response, RouteError> {
    route
        .adapter
        .empty(&route.entity)
        .await
        .map_err(|e| failure(&route, e, None))?;
    Ok(response::no_content())
}
