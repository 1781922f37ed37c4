mod lookup;
pub use lookup::Lookup;
