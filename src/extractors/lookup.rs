//! Lookup query for keyed routes (`/{route}/:{by}`).

use crate::adapter::Query;
use crate::state::SharedRouteState;
use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Path, Query as QueryParams},
    http::request::Parts,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use std::collections::HashMap;

/// The path value and the adapter query built from it: `{by: value}`, plus query-string
/// parameters when the route is searchable.
#[derive(Clone, Debug)]
pub struct Lookup {
    pub value: String,
    pub query: Query,
}

#[async_trait]
impl FromRequestParts<SharedRouteState> for Lookup {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &SharedRouteState) -> Result<Self, Self::Rejection> {
        // The path has exactly one parameter; its name may differ from `by` when kinds share a path.
        let Path(value) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;

        let mut query = Query::new();
        if state.options.searchable {
            let QueryParams(params) = QueryParams::<HashMap<String, String>>::from_request_parts(parts, state)
                .await
                .map_err(IntoResponse::into_response)?;
            query.extend(params.into_iter().map(|(k, v)| (k, Value::String(v))));
        }
        query.insert(state.options.by.clone(), Value::String(value.clone()));
        Ok(Lookup { value, query })
    }
}
