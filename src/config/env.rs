//! Server settings from the process environment.

use serde_json::{json, Value};

pub const DEFAULT_PORT: u16 = 1337;

#[derive(Clone, Debug, PartialEq)]
pub struct ServerConfig {
    pub port: u16,
    /// Logger level and subscriber filter (e.g. "info", "debug").
    pub log_level: String,
    /// Adapter name ("memory", "postgres", ...).
    pub database: String,
    pub database_url: Option<String>,
    pub body_limit: Option<usize>,
}

impl ServerConfig {
    /// Read `LAYER_PORT`, `LAYER_LOG`, `LAYER_DATABASE`, `DATABASE_URL`, `LAYER_BODY_LIMIT`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        ServerConfig {
            port: lookup("LAYER_PORT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            log_level: lookup("LAYER_LOG").unwrap_or_else(|| "info".into()),
            database: lookup("LAYER_DATABASE").unwrap_or_else(|| "memory".into()),
            database_url: lookup("DATABASE_URL").filter(|s| !s.is_empty()),
            body_limit: lookup("LAYER_BODY_LIMIT").and_then(|s| s.parse().ok()),
        }
    }

    /// Database argument for `start`.
    pub fn database_value(&self) -> Value {
        let mut value = json!({ "name": self.database });
        if let Some(url) = &self.database_url {
            value["url"] = Value::String(url.clone());
        }
        value
    }
}
