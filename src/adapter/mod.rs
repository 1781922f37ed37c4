//! Database adapters: the persistence seam behind every generated route.
//!
//! An adapter is picked by the `name` of the database config passed to `start`, through an
//! [`AdapterRegistry`]. `memory` and `postgres` are registered by default.

mod memory;
mod postgres;

pub use memory::MemoryAdapter;
pub use postgres::PostgresAdapter;

use crate::config::DatabaseConfig;
use crate::error::AdapterError;
use crate::logging::Logger;
use crate::model::Schema;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Lookup or filter passed to an adapter. Values from paths and query strings arrive as strings.
pub type Query = Map<String, Value>;

/// Request body handed to create/upsert/update.
pub type Document = Map<String, Value>;

/// Query keys interpreted as paging rather than field filters.
pub const PAGING_KEYS: [&str; 2] = ["offset", "limit"];

#[async_trait]
pub trait Adapter: Send + Sync {
    /// Register a model's flattened schema under its backing collection.
    async fn define(&self, entity: &str, collection: &str, schema: &Schema) -> Result<(), AdapterError>;

    /// All matching entries as a JSON array. `offset`/`limit` page the result.
    async fn all(&self, entity: &str, filter: Query) -> Result<Value, AdapterError>;

    /// First entry matching `query`.
    async fn find(&self, entity: &str, query: Query) -> Result<Value, AdapterError>;

    async fn create(&self, entity: &str, data: Document) -> Result<Value, AdapterError>;

    /// Replace the entry matching `selector`, or insert one carrying the selector's fields.
    async fn upsert(&self, entity: &str, selector: Query, data: Document) -> Result<Value, AdapterError>;

    /// Merge `data` into the entry matching `selector`.
    async fn update(&self, entity: &str, selector: Query, data: Document) -> Result<Value, AdapterError>;

    /// Delete the entry matching `selector` and return it.
    async fn remove(&self, entity: &str, selector: Query) -> Result<Value, AdapterError>;

    /// Number of matching entries.
    async fn count(&self, entity: &str, filter: Query) -> Result<Value, AdapterError>;

    /// Delete every entry of the entity.
    async fn empty(&self, entity: &str) -> Result<(), AdapterError>;
}

/// Builds an adapter from the database config.
pub type AdapterFactory =
    Arc<dyn Fn(&DatabaseConfig, &Logger) -> Result<Arc<dyn Adapter>, AdapterError> + Send + Sync>;

/// Adapter factories keyed by database name.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    by_name: HashMap<String, AdapterFactory>,
}

impl AdapterRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        AdapterRegistry {
            by_name: HashMap::new(),
        }
    }

    /// Registry with `memory` and `postgres`.
    pub fn with_builtin() -> Self {
        let mut registry = AdapterRegistry::new();
        registry.register("memory", |config, log| {
            Ok(Arc::new(MemoryAdapter::from_config(config, log)) as Arc<dyn Adapter>)
        });
        registry.register("postgres", |config, log| {
            Ok(Arc::new(PostgresAdapter::connect_lazy(config, log)?) as Arc<dyn Adapter>)
        });
        registry
    }

    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&DatabaseConfig, &Logger) -> Result<Arc<dyn Adapter>, AdapterError> + Send + Sync + 'static,
    {
        self.by_name.insert(name.to_string(), Arc::new(factory));
    }

    pub fn get(&self, name: &str) -> Option<&AdapterFactory> {
        self.by_name.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }
}

/// Split `offset`/`limit` out of a filter. Unparseable values are ignored.
pub fn paging(filter: &Query) -> (Option<u64>, Option<u64>) {
    let parse = |key: &str| {
        filter.get(key).and_then(|v| match v {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        })
    };
    (parse("offset"), parse("limit"))
}

/// Selector fields carried into an entry inserted by upsert; a numeric `id` string becomes a number.
pub fn selector_document(selector: &Query) -> Document {
    selector
        .iter()
        .map(|(k, v)| {
            let value = match (k.as_str(), v) {
                ("id", Value::String(s)) => s.parse::<i64>().map(Value::from).unwrap_or_else(|_| v.clone()),
                _ => v.clone(),
            };
            (k.clone(), value)
        })
        .collect()
}

/// Document written by upsert: the selector fields, overridden by the body. Keeps the entry
/// findable by the key it was upserted under.
pub fn upsert_document(selector: &Query, data: Document) -> Document {
    let mut doc = selector_document(selector);
    doc.extend(data);
    doc
}
