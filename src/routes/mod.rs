//! Route generation for defined models.

mod model;
pub use model::{model_routes, route_path, ModelContext, ModelPath, ModelRoutes, PathTable, RouteEntry};
