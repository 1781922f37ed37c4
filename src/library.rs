//! Library entry point: `start` resolves the database adapter and wraps the host router;
//! `define` turns a model descriptor into a definition, a backing collection, and routes.

use crate::adapter::{Adapter, AdapterRegistry};
use crate::config::{resolve_routes, DatabaseConfig};
use crate::error::{ConfigError, LayerError};
use crate::logging::Logger;
use crate::model::{Definition, ModelDescriptor};
use crate::routes::{model_routes, ModelContext, PathTable, RouteEntry};
use crate::service::Validator;
use crate::state::{Middleware, MiddlewareFuture};
use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use axum::Router;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::limit::RequestBodyLimitLayer;

/// Start with the built-in adapters (`memory`, `postgres`).
pub fn start(application: Router, database: &Value, log: Logger) -> Result<Library, LayerError> {
    Layer::new(log).start(application, database)
}

/// Adapter registry plus logger; `start` picks the adapter named by the database config.
#[derive(Clone)]
pub struct Layer {
    adapters: AdapterRegistry,
    log: Logger,
}

impl Layer {
    pub fn new(log: Logger) -> Self {
        Self::with_registry(AdapterRegistry::with_builtin(), log)
    }

    pub fn with_registry(adapters: AdapterRegistry, log: Logger) -> Self {
        Layer { adapters, log }
    }

    /// Register a custom adapter factory under `name`.
    pub fn adapter<F>(mut self, name: &str, factory: F) -> Self
    where
        F: Fn(&DatabaseConfig, &Logger) -> Result<Arc<dyn Adapter>, crate::error::AdapterError>
            + Send
            + Sync
            + 'static,
    {
        self.adapters.register(name, factory);
        self
    }

    pub fn start(&self, application: Router, database: &Value) -> Result<Library, LayerError> {
        let log = self.log.component("core");
        let config = DatabaseConfig::from_value(database).map_err(|e| {
            log.fatal(&e);
            e
        })?;

        log.info(format_args!("Loading Database Adapter: {}", config.name));
        let factory = self.adapters.get(&config.name).ok_or_else(|| {
            let e = ConfigError::UnknownAdapter(config.name.clone());
            log.fatal(&e);
            e
        })?;
        let database = factory(&config, &self.log.component("database")).map_err(|e| {
            log.fatal(&e);
            e
        })?;

        Ok(Library {
            application,
            store: HashMap::new(),
            database,
            middleware: HashMap::new(),
            routes: Vec::new(),
            paths: PathTable::default(),
            body_limit: None,
            log,
        })
    }
}

/// Host router plus everything defined on it.
pub struct Library {
    application: Router,
    store: HashMap<String, Definition>,
    database: Arc<dyn Adapter>,
    middleware: HashMap<String, Middleware>,
    routes: Vec<RouteEntry>,
    paths: PathTable,
    body_limit: Option<usize>,
    log: Logger,
}

impl Library {
    /// Define a model and register its routes. Nothing is registered when any step fails.
    pub async fn define(&mut self, name: &str, descriptor: Value) -> Result<&Definition, LayerError> {
        let model_log = self.log.component("model");
        model_log.info(format_args!("Defining Model: {}", name));

        match self.define_inner(name, descriptor).await {
            Ok(definition) => Ok(definition),
            Err(e) => {
                model_log.fatal(&e);
                Err(e)
            }
        }
    }

    async fn define_inner(&mut self, name: &str, descriptor: Value) -> Result<&Definition, LayerError> {
        if name.is_empty() {
            return Err(ConfigError::MissingPropertyKey(name.to_string()).into());
        }
        if self.store.contains_key(name) {
            return Err(ConfigError::DuplicateModel(name.to_string()).into());
        }

        let descriptor = ModelDescriptor::from_value(name, descriptor)?;
        let model_log = self.log.component("model");
        for key in &descriptor.ignored {
            model_log.debug(format_args!("Ignoring key {} of {}: no type or parent", key, name));
        }
        let store = &self.store;
        let definition = descriptor.to_definition(name, &|parent: &str| store.get(parent))?;
        let schema = definition.build();
        let validator = Arc::new(Validator::new(&definition)?);

        let specs = resolve_routes(descriptor.routing.as_ref())?;
        let routing_log = self.log.component("routing");
        routing_log.info("Creating routes...");
        let generated = model_routes(
            &ModelContext {
                entity: name.to_string(),
                validator,
                adapter: self.database.clone(),
                log: routing_log,
            },
            specs,
            &self.middleware,
        )?;
        self.paths.check(&generated)?;

        if let Some(collection) = descriptor.collection.as_ref().and_then(|c| c.collection_name(name)) {
            self.database.define(name, &collection, &schema).await?;
        }

        let mut application = std::mem::take(&mut self.application);
        for p in generated.paths {
            self.paths.insert(&p.path, &p.methods);
            application = application.route(&p.path, p.router);
        }
        self.application = application;
        self.routes.extend(generated.entries);
        Ok(self.store.entry(name.to_string()).or_insert(definition))
    }

    /// Register middleware that route options can reference by name.
    pub fn middleware<F, Fut>(&mut self, name: &str, f: F) -> &mut Self
    where
        F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        let mw: Middleware = Arc::new(move |req: Request, next: Next| -> MiddlewareFuture { Box::pin(f(req, next)) });
        self.middleware.insert(name.to_string(), mw);
        self
    }

    pub fn model(&self, name: &str) -> Option<&Definition> {
        self.store.get(name)
    }

    /// Registered routes in definition order.
    pub fn routes(&self) -> &[RouteEntry] {
        &self.routes
    }

    pub fn database(&self) -> Arc<dyn Adapter> {
        self.database.clone()
    }

    pub fn set_body_limit(&mut self, bytes: usize) -> &mut Self {
        self.body_limit = Some(bytes);
        self
    }

    pub fn into_router(self) -> Router {
        match self.body_limit {
            Some(limit) => self.application.layer(RequestBodyLimitLayer::new(limit)),
            None => self.application,
        }
    }

    /// Serve on `0.0.0.0:port` until the server fails.
    pub async fn listen(self, port: u16) -> Result<(), LayerError> {
        let listener = TcpListener::bind(("0.0.0.0", port)).await?;
        let port = listener.local_addr()?.port();
        self.log.info(format_args!("Server started at: http://localhost:{}/", port));
        axum::serve(listener, self.into_router()).await?;
        Ok(())
    }
}
