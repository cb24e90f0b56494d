//! Gateway configuration (YAML).

use std::path::{Path, PathBuf};

use serde::Deserialize;

fn default_cookie_name() -> String {
    "session_id".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

/// Top-level gateway configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    pub http_port: u16,
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// Enables GraphiQL on GET and more verbose default logging.
    #[serde(default)]
    pub debug: bool,
    /// Adds the `Secure` attribute to session cookies. Off by default so
    /// plain-HTTP development setups keep working; turn it on behind TLS.
    #[serde(default)]
    pub secure_cookies: bool,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouteConfig {
    pub mode: RouteMode,
    /// URL path the route is mounted at, e.g. `/graphql`.
    pub endpoint: String,
    /// Directory tree holding the route's SDL fragments.
    pub schema: PathBuf,
}

/// Route handler kind. Only GraphQL routes exist; unknown modes fail the
/// config parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteMode {
    Gql,
}

/// Load and parse the YAML config file.
pub fn load_config(path: &Path) -> anyhow::Result<GatewayConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let config: GatewayConfig = serde_yaml::from_str(&raw)
        .map_err(|e| anyhow::anyhow!("invalid config {}: {e}", path.display()))?;
    tracing::debug!(path = %path.display(), routes = config.server.routes.len(), "config loaded");
    Ok(config)
}
