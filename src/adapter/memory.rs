//! In-process adapter. Entries live in per-entity vectors behind an `RwLock`; ids are assigned
//! from a counter when a created entry has none.

use crate::adapter::{paging, upsert_document, Adapter, Document, Query, PAGING_KEYS};
use crate::config::DatabaseConfig;
use crate::error::AdapterError;
use crate::logging::Logger;
use crate::model::Schema;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::RwLock;

struct Collection {
    name: String,
    next_id: u64,
    rows: Vec<Document>,
}

impl Collection {
    fn position(&self, query: &Query) -> Option<usize> {
        self.rows.iter().position(|row| matches_query(row, query))
    }

    fn insert(&mut self, mut doc: Document) -> Document {
        match doc.get("id").and_then(Value::as_u64) {
            Some(id) => self.next_id = self.next_id.max(id.saturating_add(1)),
            None if !doc.contains_key("id") => {
                doc.insert("id".into(), Value::from(self.next_id));
                self.next_id += 1;
            }
            None => {}
        }
        self.rows.push(doc.clone());
        doc
    }
}

pub struct MemoryAdapter {
    seed_id: u64,
    log: Logger,
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryAdapter {
    pub fn new(log: &Logger) -> Self {
        MemoryAdapter {
            seed_id: 1,
            log: log.component("database"),
            collections: RwLock::new(HashMap::new()),
        }
    }

    /// Honors `seed_id` (first assigned id, default 1).
    pub fn from_config(config: &DatabaseConfig, log: &Logger) -> Self {
        let mut adapter = MemoryAdapter::new(log);
        if let Some(seed) = config.option_u64("seed_id") {
            adapter.seed_id = seed;
        }
        adapter
    }

    fn read<T>(&self, entity: &str, f: impl FnOnce(&Collection) -> T) -> Result<T, AdapterError> {
        let guard = self
            .collections
            .read()
            .map_err(|_| AdapterError::Backend("state lock".into()))?;
        let collection = guard
            .get(entity)
            .ok_or_else(|| AdapterError::UnknownEntity(entity.to_string()))?;
        Ok(f(collection))
    }

    fn write<T>(
        &self,
        entity: &str,
        f: impl FnOnce(&mut Collection) -> Result<T, AdapterError>,
    ) -> Result<T, AdapterError> {
        let mut guard = self
            .collections
            .write()
            .map_err(|_| AdapterError::Backend("state lock".into()))?;
        let collection = guard
            .get_mut(entity)
            .ok_or_else(|| AdapterError::UnknownEntity(entity.to_string()))?;
        f(collection)
    }
}

/// Loose equality between a stored value and a query value: query values from paths and query
/// strings are strings, so `"42"` matches `42` and `"true"` matches `true`.
fn loose_eq(stored: &Value, wanted: &Value) -> bool {
    match (stored, wanted) {
        (Value::String(a), Value::String(b)) => a == b,
        (other, Value::String(b)) => other.to_string() == *b,
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (a, b) => a == b,
    }
}

fn matches_query(row: &Document, query: &Query) -> bool {
    query
        .iter()
        .filter(|(k, _)| !PAGING_KEYS.contains(&k.as_str()))
        .all(|(k, wanted)| row.get(k).map(|v| loose_eq(v, wanted)).unwrap_or(false))
}

fn describe(query: &Query) -> String {
    query
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(", ")
}

#[async_trait]
impl Adapter for MemoryAdapter {
    async fn define(&self, entity: &str, collection: &str, schema: &Schema) -> Result<(), AdapterError> {
        let mut guard = self
            .collections
            .write()
            .map_err(|_| AdapterError::Backend("state lock".into()))?;
        self.log.debug(format_args!(
            "Defining collection {} for {} ({} fields)",
            collection,
            entity,
            schema.len()
        ));
        guard.insert(
            entity.to_string(),
            Collection {
                name: collection.to_string(),
                next_id: self.seed_id,
                rows: Vec::new(),
            },
        );
        Ok(())
    }

    async fn all(&self, entity: &str, filter: Query) -> Result<Value, AdapterError> {
        let (offset, limit) = paging(&filter);
        self.read(entity, |c| {
            let rows = c
                .rows
                .iter()
                .filter(|row| matches_query(row, &filter))
                .skip(offset.unwrap_or(0) as usize)
                .take(limit.map(|n| n as usize).unwrap_or(usize::MAX))
                .map(|row| Value::Object(row.clone()))
                .collect();
            Value::Array(rows)
        })
    }

    async fn find(&self, entity: &str, query: Query) -> Result<Value, AdapterError> {
        self.read(entity, |c| c.position(&query).map(|i| Value::Object(c.rows[i].clone())))?
            .ok_or_else(|| AdapterError::NotFound(format!("{} where {}", entity, describe(&query))))
    }

    async fn create(&self, entity: &str, data: Document) -> Result<Value, AdapterError> {
        self.write(entity, |c| {
            if let Some(id) = data.get("id") {
                if c.rows.iter().any(|row| row.get("id").map(|v| loose_eq(v, id)).unwrap_or(false)) {
                    return Err(AdapterError::Backend(format!("duplicate id {} in {}", id, c.name)));
                }
            }
            Ok(Value::Object(c.insert(data)))
        })
    }

    async fn upsert(&self, entity: &str, selector: Query, data: Document) -> Result<Value, AdapterError> {
        self.write(entity, |c| {
            let mut doc = upsert_document(&selector, data);
            match c.position(&selector) {
                Some(i) => {
                    if let Some(id) = c.rows[i].get("id").cloned() {
                        doc.insert("id".into(), id);
                    }
                    c.rows[i] = doc.clone();
                    Ok(Value::Object(doc))
                }
                None => Ok(Value::Object(c.insert(doc))),
            }
        })
    }

    async fn update(&self, entity: &str, selector: Query, data: Document) -> Result<Value, AdapterError> {
        self.write(entity, |c| {
            let i = c
                .position(&selector)
                .ok_or_else(|| AdapterError::NotFound(format!("{} where {}", entity, describe(&selector))))?;
            let row = &mut c.rows[i];
            row.extend(data);
            Ok(Value::Object(row.clone()))
        })
    }

    async fn remove(&self, entity: &str, selector: Query) -> Result<Value, AdapterError> {
        self.write(entity, |c| {
            let i = c
                .position(&selector)
                .ok_or_else(|| AdapterError::NotFound(format!("{} where {}", entity, describe(&selector))))?;
            Ok(Value::Object(c.rows.remove(i)))
        })
    }

    async fn count(&self, entity: &str, filter: Query) -> Result<Value, AdapterError> {
        self.read(entity, |c| {
            Value::from(c.rows.iter().filter(|row| matches_query(row, &filter)).count())
        })
    }

    async fn empty(&self, entity: &str) -> Result<(), AdapterError> {
        self.write(entity, |c| {
            c.rows.clear();
            Ok(())
        })
    }
}
