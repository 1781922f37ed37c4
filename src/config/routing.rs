//! Routing DSL: resolves a model's `routing` value into the routes to generate.

use crate::config::{RouteKind, RouteOptions};
use crate::error::ConfigError;
use serde_json::Value;

/// One route to generate: its kind and the options captured by its handler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteSpec {
    pub kind: RouteKind,
    pub options: RouteOptions,
}

impl RouteSpec {
    pub fn new(kind: RouteKind, options: RouteOptions) -> Self {
        RouteSpec { kind, options }
    }
}

/// Route set used when a model supplies no routing (or `routing: true`). count and empty are off.
pub fn default_routes() -> Vec<RouteSpec> {
    vec![
        RouteSpec::new(RouteKind::FetchAll, RouteOptions::default().remove(&["password"])),
        RouteSpec::new(RouteKind::Fetch, RouteOptions::default().by("id").searchable(true)),
        RouteSpec::new(RouteKind::Create, RouteOptions::default()),
        RouteSpec::new(RouteKind::Upsert, RouteOptions::default().by("id")),
        RouteSpec::new(RouteKind::Update, RouteOptions::default().by("id")),
        RouteSpec::new(RouteKind::Remove, RouteOptions::default().by("id")),
    ]
}

/// Resolve a routing value.
/// - absent, null or `true`: default set
/// - `false`: nothing
/// - object: each known kind set to `true` or an options object; other values and unknown keys are skipped
pub fn resolve_routes(routing: Option<&Value>) -> Result<Vec<RouteSpec>, ConfigError> {
    let map = match routing {
        None | Some(Value::Null) | Some(Value::Bool(true)) => return Ok(default_routes()),
        Some(Value::Bool(false)) => return Ok(Vec::new()),
        Some(Value::Object(map)) => map,
        Some(other) => {
            return Err(ConfigError::InvalidRouting(format!(
                "expected an object or boolean, got {}",
                other
            )))
        }
    };

    let mut out = Vec::new();
    for kind in RouteKind::ALL {
        let options = match map.get(kind.as_str()) {
            Some(Value::Bool(true)) => RouteOptions::default(),
            Some(v @ Value::Object(_)) => serde_json::from_value(v.clone())
                .map_err(|e| ConfigError::InvalidRouting(format!("{}: {}", kind, e)))?,
            _ => continue,
        };
        if options.by.is_empty() {
            return Err(ConfigError::InvalidRouting(format!("{}: `by` must not be empty", kind)));
        }
        out.push(RouteSpec::new(kind, options));
    }
    Ok(out)
}
