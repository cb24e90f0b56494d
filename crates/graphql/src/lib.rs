//! Resolver binding and execution interception for SDL-first GraphQL.
//!
//! Query parsing, validation, and field orchestration are delegated to the
//! engine; this crate owns everything that happens around a resolver call:
//! custom scalar codecs, custom field directives, authorization, naming
//! translation between camelCase fields and snake_case provider methods,
//! and construction of the engine schema from validated SDL fragments.
//!
//! The gateway crate wires bound schemas into HTTP routes; this crate is
//! transport-agnostic and can execute requests directly via
//! [`schema::execute`].

pub mod authorize;
pub mod context;
pub mod directives;
pub mod error;
pub mod loader;
pub mod naming;
pub mod resolvers;
pub mod scalars;
pub mod schema;
pub mod value;

pub use {
    authorize::{AuthGate, AuthPredicate, AuthorizeInfo},
    context::RequestContext,
    directives::{Directive, DirectiveRegistry},
    error::denied,
    loader::{LoadError, load_schema},
    naming::camel_to_snake,
    resolvers::{OperationKind, Provider, ProviderRegistry, ResolverInfo},
    scalars::{ScalarCodec, ScalarRegistry},
    schema::{BindError, BoundSchema, ExecuteRequest, bind, execute},
};
