pub mod bar;
pub mod validator;

// Re-export the canonical series types (e.g. `use crate::market_data::Series`).
pub use bar::{Bar, Series};
pub use validator::{validate, validate_json, SeriesInput};
