//! Raw config types: database selection and per-route options.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Database selection passed to `start`. `name` picks the adapter; everything else is adapter-specific.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub name: String,
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

impl DatabaseConfig {
    pub fn new(name: impl Into<String>) -> Self {
        DatabaseConfig {
            name: name.into(),
            options: Map::new(),
        }
    }

    /// Parse and check a raw database argument: must be an object with a non-empty string `name`.
    pub fn from_value(value: &Value) -> Result<Self, ConfigError> {
        let obj = value
            .as_object()
            .ok_or_else(|| ConfigError::InvalidDatabase("must be an object".into()))?;
        match obj.get("name").and_then(Value::as_str) {
            Some(name) if !name.trim().is_empty() => {}
            _ => return Err(ConfigError::InvalidDatabase("must have a name property".into())),
        }
        serde_json::from_value(value.clone()).map_err(|e| ConfigError::InvalidDatabase(e.to_string()))
    }

    pub fn with_option(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.options.insert(key.to_string(), value.into());
        self
    }

    pub fn option_str(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(Value::as_str)
    }

    pub fn option_u64(&self, key: &str) -> Option<u64> {
        self.options.get(key).and_then(|v| match v {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        })
    }
}

/// The eight CRUD-style operations a model can expose.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RouteKind {
    FetchAll,
    Fetch,
    Create,
    Count,
    Empty,
    Upsert,
    Update,
    Remove,
}

impl RouteKind {
    pub const ALL: [RouteKind; 8] = [
        RouteKind::FetchAll,
        RouteKind::Fetch,
        RouteKind::Create,
        RouteKind::Count,
        RouteKind::Empty,
        RouteKind::Upsert,
        RouteKind::Update,
        RouteKind::Remove,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RouteKind::FetchAll => "fetchAll",
            RouteKind::Fetch => "fetch",
            RouteKind::Create => "create",
            RouteKind::Count => "count",
            RouteKind::Empty => "empty",
            RouteKind::Upsert => "upsert",
            RouteKind::Update => "update",
            RouteKind::Remove => "remove",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        RouteKind::ALL.into_iter().find(|k| k.as_str() == key)
    }

    /// Kinds addressed by a path parameter (`/{route}/:{by}`).
    pub fn is_keyed(&self) -> bool {
        matches!(
            self,
            RouteKind::Fetch | RouteKind::Upsert | RouteKind::Update | RouteKind::Remove
        )
    }
}

impl fmt::Display for RouteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for one generated route. `true` in a routing map means `RouteOptions::default()`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteOptions {
    /// Path parameter and lookup key.
    pub by: String,
    /// Fields stripped from responses (e.g. password hashes).
    pub remove: Vec<String>,
    /// Names of middleware registered on the library, outermost first.
    pub middleware: Vec<String>,
    /// fetch: merge extra query-string parameters into the lookup query.
    pub searchable: bool,
}

impl Default for RouteOptions {
    fn default() -> Self {
        RouteOptions {
            by: "id".into(),
            remove: Vec::new(),
            middleware: Vec::new(),
            searchable: false,
        }
    }
}

impl RouteOptions {
    pub fn by(mut self, by: impl Into<String>) -> Self {
        self.by = by.into();
        self
    }

    pub fn remove(mut self, fields: &[&str]) -> Self {
        self.remove = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn searchable(mut self, searchable: bool) -> Self {
        self.searchable = searchable;
        self
    }
}

/// `collection` key of a model descriptor: `true` uses the model name, a string names the collection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CollectionConfig {
    Enabled(bool),
    Named(String),
}

impl CollectionConfig {
    /// Backing collection name for `model`, or None when the model is not collection-backed.
    pub fn collection_name(&self, model: &str) -> Option<String> {
        match self {
            CollectionConfig::Enabled(true) => Some(model.to_string()),
            CollectionConfig::Enabled(false) => None,
            CollectionConfig::Named(s) if s.is_empty() => Some(model.to_string()),
            CollectionConfig::Named(s) => Some(s.clone()),
        }
    }
}
