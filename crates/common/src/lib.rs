//! Shared error model and value aliases used across all graphbind crates.

pub mod error;

pub use error::{DEFAULT_ERROR_CODE, ErrorLevel, ErrorLocation, GqlError};

/// JSON value shuttled between resolvers, codecs, and the engine.
pub type Json = serde_json::Value;

/// JSON object map, the currency for arguments and directive results.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;
