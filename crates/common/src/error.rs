//! GraphQL field error model.
//!
//! Every error this layer produces normalizes to the GraphQL spec error shape
//! (`message`, `locations`, `path`, `extensions`) with two extra extension
//! keys: `code` and `level`. The level separates recoverable errors (the
//! field nulls out, execution continues) from fatal ones (the affected field
//! subtree is aborted).

use serde::{Deserialize, Serialize};

/// Default error code when a caller does not supply one.
pub const DEFAULT_ERROR_CODE: &str = "000";

/// Error severity.
///
/// `Warning` errors are reported alongside partial data; `Fatal` errors abort
/// resolution of the field subtree they occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorLevel {
    Warning,
    Fatal,
}

impl ErrorLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Fatal => "fatal",
        }
    }
}

/// Location in the query document an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorLocation {
    pub line: usize,
    pub column: usize,
}

/// A typed GraphQL field error.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct GqlError {
    pub message: String,
    pub code: String,
    pub level: ErrorLevel,
    pub locations: Vec<ErrorLocation>,
    pub path: Vec<String>,
    pub extensions: serde_json::Map<String, serde_json::Value>,
}

impl GqlError {
    fn new(message: impl Into<String>, level: ErrorLevel) -> Self {
        Self {
            message: message.into(),
            code: DEFAULT_ERROR_CODE.to_string(),
            level,
            locations: Vec::new(),
            path: Vec::new(),
            extensions: serde_json::Map::new(),
        }
    }

    /// A recoverable error; execution continues with the field nulled.
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(message, ErrorLevel::Warning)
    }

    /// A fatal error; resolution of the field subtree stops.
    pub fn fatal(message: impl Into<String>) -> Self {
        Self::new(message, ErrorLevel::Fatal)
    }

    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    /// Attach an extra extension entry. `code` and `level` are always set
    /// from the error itself and cannot be overridden here.
    #[must_use]
    pub fn with_extension(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extensions.insert(key.into(), value);
        self
    }

    pub fn is_fatal(&self) -> bool {
        self.level == ErrorLevel::Fatal
    }

    /// Merge the error's own `code` and `level` into its extension map and
    /// return the combined map, as serialized into the response envelope.
    pub fn extension_map(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut map = self.extensions.clone();
        map.entry("code".to_string())
            .or_insert_with(|| serde_json::Value::String(self.code.clone()));
        map.insert(
            "level".to_string(),
            serde_json::Value::String(self.level.as_str().to_string()),
        );
        map
    }
}
