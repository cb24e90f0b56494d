//! Custom scalar codec binding.
//!
//! A codec attaches wire conversion to an SDL-declared scalar by name.
//! `decode` runs on inbound argument values (after engine coercion, before
//! the resolver), `encode` on outbound resolver output. Registration is
//! picked up at the next schema binding; already-bound schemas keep the
//! codec set they were built with.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use graphbind_common::{GqlError, Json};

/// Wire conversion for one named scalar. Implementations must be pure value
/// transforms; null never reaches a codec.
pub trait ScalarCodec: Send + Sync {
    /// Domain value to wire value, applied to resolver output.
    fn encode(&self, value: &Json) -> Result<Json, GqlError>;

    /// Wire value to domain value, applied to argument values.
    fn decode(&self, raw: &Json) -> Result<Json, GqlError>;
}

/// Name-keyed codec registry. Re-registering a name replaces the codec.
#[derive(Default)]
pub struct ScalarRegistry {
    codecs: RwLock<HashMap<String, Arc<dyn ScalarCodec>>>,
}

impl ScalarRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, name: impl Into<String>, codec: impl ScalarCodec + 'static) {
        let name = name.into();
        let mut codecs = self.codecs.write().unwrap_or_else(|e| e.into_inner());
        if codecs.insert(name.clone(), Arc::new(codec)).is_some() {
            tracing::debug!(scalar = %name, "scalar codec replaced");
        }
    }

    /// Immutable copy of the current codec set, captured at binding time.
    pub fn snapshot(&self) -> HashMap<String, Arc<dyn ScalarCodec>> {
        let codecs = self.codecs.read().unwrap_or_else(|e| e.into_inner());
        codecs.clone()
    }
}
