//! HTTP execution orchestrator.
//!
//! Ties the pieces together: YAML config, one bound schema snapshot per
//! configured GraphQL route, cookie-based session continuity, and the
//! `{data, errors}` response envelope. Field errors are reported in the
//! envelope with HTTP 200; only transport-level failures (malformed body,
//! unknown route) change the status code.

pub mod config;
pub mod routes;
pub mod server;

pub use {
    config::{GatewayConfig, RouteConfig, RouteMode, ServerConfig, load_config},
    server::Server,
};

/// Initialize structured logging. `RUST_LOG` overrides the default level.
pub fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
