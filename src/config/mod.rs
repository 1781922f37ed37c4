pub mod types;
pub mod routing;
pub mod env;

pub use types::*;
pub use routing::*;
pub use env::*;
