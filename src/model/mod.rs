//! Model definition builder.

mod definition;
mod descriptor;

pub use definition::{Definition, Property, Schema};
pub use descriptor::{ModelDescriptor, PropertySource};
