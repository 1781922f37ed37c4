//! Model definitions: named property stores that flatten into a plain schema.

use crate::error::ConfigError;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Flattened property-to-descriptor mapping, consumed by the validator and the adapter.
pub type Schema = Map<String, Value>;

#[derive(Clone, Debug, PartialEq)]
pub enum Property {
    /// Descriptor object with a `type` marker and optional constraints.
    Primitive(Value),
    /// Embedded definition, flattened recursively by `build`.
    Nested(Definition),
}

impl Property {
    pub fn primitive(descriptor: Value) -> Self {
        Property::Primitive(descriptor)
    }

    pub fn nested(definition: Definition) -> Self {
        Property::Nested(definition)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Definition {
    name: String,
    store: BTreeMap<String, Property>,
}

impl Definition {
    pub fn new(name: impl Into<String>) -> Self {
        Definition {
            name: name.into(),
            store: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Store `property` under `key`, replacing any previous one. Empty keys are rejected.
    pub fn property(&mut self, key: &str, property: Property) -> Result<&mut Self, ConfigError> {
        if key.is_empty() {
            return Err(ConfigError::MissingPropertyKey(self.name.clone()));
        }
        self.store.insert(key.to_string(), property);
        Ok(self)
    }

    pub fn get(&self, key: &str) -> Option<&Property> {
        self.store.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Property)> {
        self.store.iter().map(|(k, p)| (k.as_str(), p))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.store.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Fresh plain schema; nested definitions are built recursively.
    pub fn build(&self) -> Schema {
        self.store
            .iter()
            .map(|(key, property)| {
                let value = match property {
                    Property::Primitive(descriptor) => descriptor.clone(),
                    Property::Nested(definition) => Value::Object(definition.build()),
                };
                (key.clone(), value)
            })
            .collect()
    }
}
