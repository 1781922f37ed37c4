//! Request validation for generated write routes.

mod validation;
pub use validation::{Check, Validator};
