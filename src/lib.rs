//! Layer: convention-based REST routes for declared models, backed by a pluggable database adapter.

pub mod adapter;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod inflect;
pub mod library;
pub mod logging;
pub mod model;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;

pub use adapter::{Adapter, AdapterRegistry, Document, MemoryAdapter, PostgresAdapter, Query};
pub use config::{DatabaseConfig, RouteKind, RouteOptions, ServerConfig};
pub use error::{AdapterError, ConfigError, LayerError, RouteError};
pub use library::{start, Layer, Library};
pub use logging::Logger;
pub use model::{Definition, Property, Schema};
pub use routes::RouteEntry;
pub use service::{Check, Validator};
