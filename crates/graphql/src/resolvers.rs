//! Resolver providers and the per-call resolver context.
//!
//! A provider is an explicit table of async methods keyed by snake_case
//! name, attached to a schema type. Binding looks methods up by the
//! translated field name; there is no runtime reflection.

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, RwLock},
};

use futures::future::BoxFuture;

use graphbind_common::{GqlError, Json, JsonMap};

use crate::context::RequestContext;

/// Kind of the operation a request is executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

impl OperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Mutation => "mutation",
            Self::Subscription => "subscription",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a bound field sits in the schema: on a root operation type or
/// nested inside the result graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Query,
    Mutation,
    Subscription,
    Nested,
}

impl BindingKind {
    /// Fallback operation kind when a request did not record one.
    pub fn operation(self) -> OperationKind {
        match self {
            Self::Mutation => OperationKind::Mutation,
            Self::Subscription => OperationKind::Subscription,
            Self::Query | Self::Nested => OperationKind::Query,
        }
    }
}

/// Request-data marker recording which operation kind is executing, so
/// nested fields report the kind of the operation that reached them.
#[derive(Debug, Clone, Copy)]
pub struct ExecutingOperation(pub OperationKind);

/// Everything a resolver method sees for one field call. Built fresh per
/// call; never shared between fields.
pub struct ResolverInfo {
    pub operation: OperationKind,
    /// Snake_case method name the binder selected.
    pub resolver: String,
    /// Arguments with snake_case keys and scalar codecs already applied.
    pub args: JsonMap,
    /// Parent resolver output, absent on root fields.
    pub parent: Option<Json>,
    /// Named type of the field's result.
    pub type_name: String,
    /// Type the field is declared on.
    pub parent_type_name: String,
    pub session_id: Option<String>,
    /// Directive results keyed by directive name.
    pub directives: HashMap<String, Json>,
    pub context: Arc<RequestContext>,
    /// Raw GraphQL field name, before translation.
    pub field_name: String,
}

impl ResolverInfo {
    /// Convenience argument accessor.
    pub fn arg(&self, name: &str) -> Option<&Json> {
        self.args.get(name)
    }

    /// Result of a named directive, if one ran for this field.
    pub fn directive(&self, name: &str) -> Option<&Json> {
        self.directives.get(name)
    }
}

pub type ResolverFuture = BoxFuture<'static, Result<Json, GqlError>>;

/// Boxed async resolver method.
pub type ResolverFn = Arc<dyn Fn(ResolverInfo) -> ResolverFuture + Send + Sync>;

/// Method table for one schema type.
#[derive(Default, Clone)]
pub struct Provider {
    methods: HashMap<String, ResolverFn>,
}

impl Provider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a method under its snake_case name. Adding an existing name
    /// replaces it.
    #[must_use]
    pub fn method<F, Fut>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(ResolverInfo) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Json, GqlError>> + Send + 'static,
    {
        self.methods
            .insert(name.into(), Arc::new(move |info| Box::pin(f(info))));
        self
    }

    pub fn resolver(&self, name: &str) -> Option<ResolverFn> {
        self.methods.get(name).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

/// Providers keyed by schema type name. Registration replaces; the binder
/// takes a snapshot, so changes apply at the next schema (re)load.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: RwLock<HashMap<String, Arc<Provider>>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, type_name: impl Into<String>, provider: Provider) {
        let type_name = type_name.into();
        let mut providers = self.providers.write().unwrap_or_else(|e| e.into_inner());
        if providers.insert(type_name.clone(), Arc::new(provider)).is_some() {
            tracing::debug!(type_name = %type_name, "provider replaced");
        }
    }

    pub fn snapshot(&self) -> HashMap<String, Arc<Provider>> {
        let providers = self.providers.read().unwrap_or_else(|e| e.into_inner());
        providers.clone()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use {super::*, serde_json::json};

    fn info(resolver: &str) -> ResolverInfo {
        ResolverInfo {
            operation: OperationKind::Query,
            resolver: resolver.to_string(),
            args: JsonMap::new(),
            parent: None,
            type_name: "User".to_string(),
            parent_type_name: "Query".to_string(),
            session_id: None,
            directives: HashMap::new(),
            context: Arc::new(RequestContext::detached()),
            field_name: "user".to_string(),
        }
    }

    #[tokio::test]
    async fn provider_methods_are_looked_up_by_name() {
        let provider = Provider::new()
            .method("get_user", |info: ResolverInfo| async move {
                Ok(json!({"resolver": info.resolver}))
            });

        let method = provider.resolver("get_user").unwrap();
        let out = method(info("get_user")).await.unwrap();
        assert_eq!(out["resolver"], "get_user");
        assert!(provider.resolver("missing").is_none());
    }

    #[test]
    fn registry_snapshot_detaches_from_later_registrations() {
        let registry = ProviderRegistry::new();
        registry.register("Query", Provider::new().method("a", |_| async { Ok(json!(1)) }));

        let snapshot = registry.snapshot();
        registry.register("User", Provider::new().method("b", |_| async { Ok(json!(2)) }));

        assert!(snapshot.contains_key("Query"));
        assert!(!snapshot.contains_key("User"));
    }

    #[test]
    fn binding_kind_falls_back_to_matching_operation() {
        assert_eq!(BindingKind::Mutation.operation(), OperationKind::Mutation);
        assert_eq!(BindingKind::Nested.operation(), OperationKind::Query);
        assert_eq!(OperationKind::Subscription.as_str(), "subscription");
    }
}
