//! Model route generation: one handler per enabled route kind, at its conventional path.
//!
//! | kind     | verb   | path               |
//! |----------|--------|--------------------|
//! | fetchAll | GET    | /{plural(route)}   |
//! | fetch    | GET    | /{route}/:{by}     |
//! | create   | POST   | /{route}           |
//! | upsert   | PUT    | /{route}/:{by}     |
//! | update   | PATCH  | /{route}/:{by}     |
//! | remove   | DELETE | /{route}/:{by}     |
//! | count    | GET    | /{route}/count     |
//! | empty    | GET    | /{route}/empty     |

use crate::adapter::Adapter;
use crate::config::{RouteKind, RouteSpec};
use crate::error::ConfigError;
use crate::handlers;
use crate::inflect::{pluralize, route_name};
use crate::logging::Logger;
use crate::service::Validator;
use crate::state::{Middleware, RouteState};
use axum::extract::Request;
use axum::http::Method;
use axum::middleware::{from_fn, Next};
use axum::routing::{delete, get, patch, post, put, MethodRouter};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// A registered route, as reported by `Library::routes`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteEntry {
    pub entity: String,
    pub kind: RouteKind,
    pub method: Method,
    pub path: String,
}

impl fmt::Display for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>6} {}", self.method.as_str(), self.path)
    }
}

/// What every route of one model shares.
pub struct ModelContext {
    pub entity: String,
    pub validator: Arc<Validator>,
    pub adapter: Arc<dyn Adapter>,
    pub log: Logger,
}

/// One axum path of a model and the verbs its router answers.
pub struct ModelPath {
    pub path: String,
    pub methods: Vec<Method>,
    pub router: MethodRouter,
}

/// Routes for one model, grouped by path shape so kinds sharing `/{route}/:param` land on one
/// axum path even when their `by` names differ.
pub struct ModelRoutes {
    pub paths: Vec<ModelPath>,
    pub entries: Vec<RouteEntry>,
}

/// Axum paths already registered, keyed by shape. axum panics on a duplicate verb or on a second
/// parameter name at the same position, so both are checked here first.
#[derive(Default)]
pub struct PathTable {
    by_shape: BTreeMap<String, (String, Vec<Method>)>,
}

impl PathTable {
    pub fn check(&self, routes: &ModelRoutes) -> Result<(), ConfigError> {
        for p in &routes.paths {
            let Some((taken, methods)) = self.by_shape.get(&shape(&p.path)) else {
                continue;
            };
            if *taken != p.path {
                return Err(ConfigError::RouteConflict {
                    route: p.path.clone(),
                    existing: taken.clone(),
                });
            }
            if let Some(m) = p.methods.iter().find(|m| methods.contains(m)) {
                return Err(ConfigError::RouteConflict {
                    route: format!("{} {}", m, p.path),
                    existing: format!("{} {}", m, taken),
                });
            }
        }
        Ok(())
    }

    pub fn insert(&mut self, path: &str, methods: &[Method]) {
        self.by_shape
            .entry(shape(path))
            .or_insert_with(|| (path.to_string(), Vec::new()))
            .1
            .extend_from_slice(methods);
    }
}

fn verb(kind: RouteKind) -> Method {
    match kind {
        RouteKind::FetchAll | RouteKind::Fetch | RouteKind::Count | RouteKind::Empty => Method::GET,
        RouteKind::Create => Method::POST,
        RouteKind::Upsert => Method::PUT,
        RouteKind::Update => Method::PATCH,
        RouteKind::Remove => Method::DELETE,
    }
}

/// Conventional path for a kind. `route` is the lowercase model name.
pub fn route_path(kind: RouteKind, route: &str, by: &str) -> String {
    match kind {
        RouteKind::FetchAll => format!("/{}", pluralize(route)),
        RouteKind::Create => format!("/{}", route),
        RouteKind::Count => format!("/{}/count", route),
        RouteKind::Empty => format!("/{}/empty", route),
        RouteKind::Fetch | RouteKind::Upsert | RouteKind::Update | RouteKind::Remove => {
            format!("/{}/:{}", route, by)
        }
    }
}

/// Path with parameter names erased: `/user/:id` and `/user/:name` share a shape.
fn shape(path: &str) -> String {
    path.split('/')
        .map(|seg| if seg.starts_with(':') { ":" } else { seg })
        .collect::<Vec<_>>()
        .join("/")
}

fn handler_for(kind: RouteKind) -> MethodRouter<Arc<RouteState>> {
    match kind {
        RouteKind::FetchAll => get(handlers::fetch_all),
        RouteKind::Fetch => get(handlers::fetch),
        RouteKind::Create => post(handlers::create),
        RouteKind::Upsert => put(handlers::upsert),
        RouteKind::Update => patch(handlers::update),
        RouteKind::Remove => delete(handlers::remove),
        RouteKind::Count => get(handlers::count),
        RouteKind::Empty => get(handlers::empty),
    }
}

/// Wrap a route in its named middleware; the first name runs first.
fn with_middleware(
    mut router: MethodRouter,
    names: &[String],
    registry: &HashMap<String, Middleware>,
) -> Result<MethodRouter, ConfigError> {
    for name in names.iter().rev() {
        let mw = registry
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownMiddleware(name.clone()))?;
        router = router.layer(from_fn(move |req: Request, next: Next| {
            let mw = mw.clone();
            async move { mw(req, next).await }
        }));
    }
    Ok(router)
}

/// Build handlers for `specs`. Nothing is registered; the caller merges `paths` into its router.
pub fn model_routes(
    model: &ModelContext,
    specs: Vec<RouteSpec>,
    middleware: &HashMap<String, Middleware>,
) -> Result<ModelRoutes, ConfigError> {
    let route = route_name(&model.entity);
    let mut by_shape: BTreeMap<String, ModelPath> = BTreeMap::new();
    let mut entries = Vec::with_capacity(specs.len());

    for spec in specs {
        let path = route_path(spec.kind, &route, &spec.options.by);
        let entry = RouteEntry {
            entity: model.entity.clone(),
            kind: spec.kind,
            method: verb(spec.kind),
            path: path.clone(),
        };
        model.log.debug(format_args!("Creating {} route {}", spec.kind, entry));

        let middleware_names = spec.options.middleware.clone();
        let state = Arc::new(RouteState {
            entity: model.entity.clone(),
            kind: spec.kind,
            options: spec.options,
            validator: model.validator.clone(),
            adapter: model.adapter.clone(),
            log: model.log.clone(),
        });
        let router = with_middleware(handler_for(spec.kind).with_state(state), &middleware_names, middleware)?;

        let key = shape(&path);
        let merged = match by_shape.remove(&key) {
            Some(mut existing) => {
                existing.methods.push(entry.method.clone());
                existing.router = existing.router.merge(router);
                existing
            }
            None => ModelPath {
                path,
                methods: vec![entry.method.clone()],
                router,
            },
        };
        by_shape.insert(key, merged);
        entries.push(entry);
    }

    Ok(ModelRoutes {
        paths: by_shape.into_values().collect(),
        entries,
    })
}
