//! HTTP handlers for generated model routes.

pub mod route;
pub use route::*;
