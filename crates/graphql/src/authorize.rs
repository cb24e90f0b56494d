//! Field-level authorization.
//!
//! One predicate gates every bound field. It runs after directives and
//! before argument decoding; a `false` verdict aborts the field with a
//! fatal error. Without a configured predicate all calls are allowed,
//! which is the documented deployer responsibility.

use std::sync::{Arc, RwLock};

use crate::resolvers::OperationKind;

/// What the predicate sees for one field call.
#[derive(Debug, Clone)]
pub struct AuthorizeInfo {
    /// Kind of the executing operation, not of the field's binding site.
    pub operation: OperationKind,
    /// Type the field is declared on.
    pub src_type: String,
    /// Named type of the field's result.
    pub dst_type: String,
    /// Snake_case method name the binder selected.
    pub resolver: String,
    pub session_id: Option<String>,
}

pub type AuthPredicate = Arc<dyn Fn(&AuthorizeInfo) -> bool + Send + Sync>;

/// Holder for the configured predicate. Wrapped fields read it live, so a
/// newly configured predicate applies to already-bound schemas.
#[derive(Default)]
pub struct AuthGate {
    predicate: RwLock<Option<AuthPredicate>>,
}

impl AuthGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, predicate: impl Fn(&AuthorizeInfo) -> bool + Send + Sync + 'static) {
        let mut slot = self.predicate.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(Arc::new(predicate));
    }

    pub fn clear(&self) {
        let mut slot = self.predicate.write().unwrap_or_else(|e| e.into_inner());
        *slot = None;
    }

    pub fn predicate(&self) -> Option<AuthPredicate> {
        let slot = self.predicate.read().unwrap_or_else(|e| e.into_inner());
        slot.clone()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn sample() -> AuthorizeInfo {
        AuthorizeInfo {
            operation: OperationKind::Query,
            src_type: "User".to_string(),
            dst_type: "Company".to_string(),
            resolver: "company".to_string(),
            session_id: None,
        }
    }

    #[test]
    fn unset_gate_has_no_predicate() {
        let gate = AuthGate::new();
        assert!(gate.predicate().is_none());
    }

    #[test]
    fn set_replaces_and_clear_removes() {
        let gate = AuthGate::new();
        gate.set(|_| false);
        assert!(!(gate.predicate().unwrap())(&sample()));

        gate.set(|info| info.session_id.is_some());
        assert!(!(gate.predicate().unwrap())(&sample()));

        gate.clear();
        assert!(gate.predicate().is_none());
    }
}
