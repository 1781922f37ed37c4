//! Raw model descriptors: the JSON object handed to `define`, split into routing, collection,
//! and schema properties.

use crate::config::CollectionConfig;
use crate::error::ConfigError;
use crate::model::{Definition, Property};
use serde_json::{Map, Value};

/// Where a property's descriptor comes from.
#[derive(Clone, Debug, PartialEq)]
pub enum PropertySource {
    Primitive(Value),
    /// `{ "parent": { ...descriptor } }`
    Inline(ModelDescriptor),
    /// `{ "parent": "Model" }`, resolved against previously defined models.
    Named(String),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModelDescriptor {
    pub routing: Option<Value>,
    pub collection: Option<CollectionConfig>,
    pub properties: Vec<(String, PropertySource)>,
    /// Keys that are neither nested nor typed; not part of the schema.
    pub ignored: Vec<String>,
}

impl ModelDescriptor {
    /// Split a raw descriptor. `null` is an empty model.
    pub fn from_value(model: &str, value: Value) -> Result<Self, ConfigError> {
        let mut obj = match value {
            Value::Null => return Ok(ModelDescriptor::default()),
            Value::Object(obj) => obj,
            other => {
                return Err(ConfigError::InvalidDescriptor {
                    key: model.to_string(),
                    reason: format!("expected an object, got {}", other),
                })
            }
        };

        let routing = obj.remove("routing");
        let collection = match obj.remove("collection") {
            None | Some(Value::Null) => None,
            Some(Value::Bool(b)) => Some(CollectionConfig::Enabled(b)),
            Some(Value::String(s)) => Some(CollectionConfig::Named(s)),
            Some(other) => {
                return Err(ConfigError::InvalidDescriptor {
                    key: "collection".into(),
                    reason: format!("expected a boolean or string, got {}", other),
                })
            }
        };

        let mut properties = Vec::new();
        let mut ignored = Vec::new();
        for (key, value) in obj {
            match classify(&key, value)? {
                Some(source) => properties.push((key, source)),
                None => ignored.push(key),
            }
        }

        Ok(ModelDescriptor {
            routing,
            collection,
            properties,
            ignored,
        })
    }

    /// Build the definition. `lookup` resolves `parent` references by model name.
    pub fn to_definition<'a, F>(&self, name: &str, lookup: &F) -> Result<Definition, ConfigError>
    where
        F: Fn(&str) -> Option<&'a Definition>,
    {
        let mut definition = Definition::new(name);
        for (key, source) in &self.properties {
            let property = match source {
                PropertySource::Primitive(descriptor) => Property::primitive(descriptor.clone()),
                PropertySource::Inline(nested) => {
                    Property::nested(nested.to_definition(&format!("{}.{}", name, key), lookup)?)
                }
                PropertySource::Named(parent) => {
                    let found = lookup(parent).ok_or_else(|| ConfigError::UnknownModel {
                        key: key.clone(),
                        parent: parent.clone(),
                    })?;
                    Property::nested(found.clone())
                }
            };
            definition.property(key, property)?;
        }
        Ok(definition)
    }
}

fn is_set(v: Option<&Value>) -> bool {
    !matches!(v, None | Some(Value::Null) | Some(Value::Bool(false)))
}

fn classify(key: &str, value: Value) -> Result<Option<PropertySource>, ConfigError> {
    let obj: Map<String, Value> = match value {
        Value::Object(obj) => obj,
        _ => return Ok(None),
    };
    if is_set(obj.get("parent")) {
        return match obj.get("parent") {
            Some(Value::String(name)) => Ok(Some(PropertySource::Named(name.clone()))),
            Some(nested @ Value::Object(_)) => Ok(Some(PropertySource::Inline(
                ModelDescriptor::from_value(key, nested.clone())?,
            ))),
            Some(other) => Err(ConfigError::InvalidDescriptor {
                key: key.to_string(),
                reason: format!("parent must be a model name or descriptor, got {}", other),
            }),
            None => Ok(None),
        };
    }
    if is_set(obj.get("type")) {
        return Ok(Some(PropertySource::Primitive(Value::Object(obj))));
    }
    Ok(None)
}
