//! Request validation compiled from a model definition.

use crate::error::ConfigError;
use crate::model::{Definition, Property};
use regex::Regex;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ValueType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
    Any,
}

impl ValueType {
    fn parse(s: &str) -> Option<Self> {
        Some(match s.to_lowercase().as_str() {
            "string" | "text" => ValueType::String,
            "number" | "float" => ValueType::Number,
            "integer" | "int" => ValueType::Integer,
            "boolean" | "bool" => ValueType::Boolean,
            "array" => ValueType::Array,
            "object" => ValueType::Object,
            "any" => ValueType::Any,
            _ => return None,
        })
    }

    fn matches(&self, v: &Value) -> bool {
        match self {
            ValueType::String => v.is_string(),
            ValueType::Number => v.is_number(),
            ValueType::Integer => v.is_i64() || v.is_u64(),
            ValueType::Boolean => v.is_boolean(),
            ValueType::Array => v.is_array(),
            ValueType::Object => v.is_object(),
            ValueType::Any => true,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            ValueType::String => "a string",
            ValueType::Number => "a number",
            ValueType::Integer => "an integer",
            ValueType::Boolean => "a boolean",
            ValueType::Array => "an array",
            ValueType::Object => "an object",
            ValueType::Any => "a value",
        }
    }
}

#[derive(Clone, Debug)]
struct LeafRule {
    ty: ValueType,
    required: bool,
    min_length: Option<u64>,
    max_length: Option<u64>,
    minimum: Option<f64>,
    maximum: Option<f64>,
    pattern: Option<Regex>,
    allowed: Option<Vec<Value>>,
    format: Option<String>,
}

#[derive(Clone, Debug)]
enum Rule {
    Leaf(LeafRule),
    Nested(Vec<(String, Rule)>),
}

/// Compiled validator for one model. Build once at route registration, reuse per request.
#[derive(Clone, Debug)]
pub struct Validator {
    rules: Vec<(String, Rule)>,
}

/// Outcome of `Validator::check`. Serializes as `{"_error": bool, "<field>": ["problem", ...]}`;
/// nested fields use dotted paths.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Check {
    errors: BTreeMap<String, Vec<String>>,
}

impl Check {
    pub fn has_error(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn field(&self, name: &str) -> Option<&[String]> {
        self.errors.get(name).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.errors.keys().map(String::as_str)
    }

    /// Failure for a body that could not be read as JSON at all.
    pub fn body(problem: impl Into<String>) -> Self {
        let mut check = Check::default();
        check.push("_body", problem.into());
        check
    }

    fn push(&mut self, field: &str, problem: String) {
        self.errors.entry(field.to_string()).or_default().push(problem);
    }
}

impl Serialize for Check {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.errors.len() + 1))?;
        map.serialize_entry("_error", &self.has_error())?;
        for (field, problems) in &self.errors {
            map.serialize_entry(field, problems)?;
        }
        map.end()
    }
}

impl Validator {
    /// Nested properties become nested rules whatever their keys are named.
    pub fn new(definition: &Definition) -> Result<Self, ConfigError> {
        Ok(Validator {
            rules: compile(definition, "")?,
        })
    }

    /// Full check: required fields must be present.
    pub fn check(&self, data: &Value) -> Check {
        self.run(data, true)
    }

    /// Partial check (PATCH): only the fields present are validated.
    pub fn check_partial(&self, data: &Value) -> Check {
        self.run(data, false)
    }

    fn run(&self, data: &Value, full: bool) -> Check {
        let mut check = Check::default();
        match data {
            Value::Object(obj) => check_object(&self.rules, obj, "", full, &mut check),
            _ => check.push("_body", "must be a JSON object".into()),
        }
        check
    }
}

fn path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

fn compile(definition: &Definition, prefix: &str) -> Result<Vec<(String, Rule)>, ConfigError> {
    let mut rules = Vec::with_capacity(definition.len());
    for (key, property) in definition.iter() {
        let field = path(prefix, key);
        let rule = match property {
            Property::Nested(nested) => Rule::Nested(compile(nested, &field)?),
            Property::Primitive(descriptor) => {
                let obj = descriptor.as_object().ok_or_else(|| ConfigError::InvalidSchema {
                    field: field.clone(),
                    reason: "descriptor must be an object".into(),
                })?;
                Rule::Leaf(compile_leaf(&field, obj)?)
            }
        };
        rules.push((key.to_string(), rule));
    }
    Ok(rules)
}

fn compile_leaf(field: &str, obj: &Map<String, Value>) -> Result<LeafRule, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidSchema {
        field: field.to_string(),
        reason,
    };
    let ty = obj
        .get("type")
        .and_then(Value::as_str)
        .and_then(ValueType::parse)
        .ok_or_else(|| {
            let marker = obj.get("type").cloned().unwrap_or(Value::Null);
            invalid(format!("unknown type marker {}", marker))
        })?;
    let length = obj.get("length");
    let pattern = match obj.get("pattern").and_then(Value::as_str) {
        Some(p) => Some(Regex::new(p).map_err(|e| invalid(format!("invalid pattern: {}", e)))?),
        None => None,
    };
    Ok(LeafRule {
        ty,
        required: obj.get("required").and_then(Value::as_bool).unwrap_or(false),
        min_length: length.and_then(|l| l.get("min")).and_then(Value::as_u64),
        max_length: length.and_then(|l| l.get("max")).and_then(Value::as_u64),
        minimum: obj.get("min").and_then(Value::as_f64),
        maximum: obj.get("max").and_then(Value::as_f64),
        pattern,
        allowed: obj.get("allowed").and_then(Value::as_array).cloned(),
        format: obj.get("format").and_then(Value::as_str).map(str::to_lowercase),
    })
}

fn check_object(rules: &[(String, Rule)], obj: &Map<String, Value>, prefix: &str, full: bool, check: &mut Check) {
    for (key, rule) in rules {
        let field = path(prefix, key);
        let value = obj.get(key).filter(|v| !v.is_null());
        match (rule, value) {
            (Rule::Leaf(leaf), None) => {
                if full && leaf.required {
                    check.push(&field, "is required".into());
                }
            }
            (Rule::Leaf(leaf), Some(v)) => check_leaf(&field, v, leaf, check),
            (Rule::Nested(children), None) => {
                if full {
                    check_object(children, &Map::new(), &field, full, check);
                }
            }
            (Rule::Nested(children), Some(Value::Object(inner))) => {
                check_object(children, inner, &field, full, check)
            }
            (Rule::Nested(_), Some(_)) => check.push(&field, "must be an object".into()),
        }
    }
}

fn check_leaf(field: &str, v: &Value, rule: &LeafRule, check: &mut Check) {
    if !rule.ty.matches(v) {
        check.push(field, format!("must be {}", rule.ty.name()));
        return;
    }
    let len = match v {
        Value::String(s) => Some(s.chars().count() as u64),
        Value::Array(a) => Some(a.len() as u64),
        _ => None,
    };
    if let (Some(min), Some(n)) = (rule.min_length, len) {
        if n < min {
            check.push(field, format!("must be at least {} characters", min));
        }
    }
    if let (Some(max), Some(n)) = (rule.max_length, len) {
        if n > max {
            check.push(field, format!("must be at most {} characters", max));
        }
    }
    if let Some(n) = v.as_f64() {
        if let Some(min) = rule.minimum {
            if n < min {
                check.push(field, format!("must be at least {}", min));
            }
        }
        if let Some(max) = rule.maximum {
            if n > max {
                check.push(field, format!("must be at most {}", max));
            }
        }
    }
    if let (Some(re), Some(s)) = (&rule.pattern, v.as_str()) {
        if !re.is_match(s) {
            check.push(field, "does not match required pattern".into());
        }
    }
    if let Some(allowed) = &rule.allowed {
        if !allowed.iter().any(|a| value_eq(v, a)) {
            check.push(
                field,
                format!("must be one of: {:?}", allowed.iter().take(5).collect::<Vec<_>>()),
            );
        }
    }
    if let (Some(format), Some(s)) = (rule.format.as_deref(), v.as_str()) {
        match format {
            "email" => {
                if !s.contains('@') || s.len() < 3 {
                    check.push(field, "must be a valid email".into());
                }
            }
            "uuid" => {
                if uuid::Uuid::parse_str(s).is_err() {
                    check.push(field, "must be a valid UUID".into());
                }
            }
            _ => {}
        }
    }
}

fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(n), Value::Number(m)) => n.as_f64() == m.as_f64(),
        _ => a == b,
    }
}
