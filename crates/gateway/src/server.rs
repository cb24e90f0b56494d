//! Gateway server: registries, route snapshots, and the axum router.

use std::{collections::HashMap, path::PathBuf, sync::Arc, time::Duration};

use {
    axum::{Router, routing::get},
    tokio::sync::RwLock,
};

use {
    graphbind_graphql::{
        AuthGate, AuthorizeInfo, BoundSchema, Directive, DirectiveRegistry, Provider,
        ProviderRegistry, ScalarCodec, ScalarRegistry, bind, load_schema,
    },
    graphbind_sessions::SessionStore,
};

use crate::{config::GatewayConfig, routes};

/// Sweep cadence for expired sessions.
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// One configured GraphQL route and its published schema snapshot.
pub(crate) struct RouteState {
    schema_dir: PathBuf,
    bound: RwLock<Option<Arc<BoundSchema>>>,
}

impl RouteState {
    pub(crate) async fn bound(&self) -> Option<Arc<BoundSchema>> {
        self.bound.read().await.clone()
    }
}

/// The execution orchestrator.
///
/// Holds every registry (scalars, directives, providers, the authorization
/// predicate) and one schema snapshot per configured route. Scalar and
/// provider registrations take effect at the next [`Server::load`]; directive
/// and predicate changes apply to bound schemas immediately.
pub struct Server {
    config: GatewayConfig,
    sessions: Arc<SessionStore>,
    scalars: ScalarRegistry,
    providers: ProviderRegistry,
    directives: Arc<DirectiveRegistry>,
    auth: Arc<AuthGate>,
    routes: HashMap<String, RouteState>,
}

impl Server {
    pub fn new(config: GatewayConfig) -> Self {
        let routes = config
            .server
            .routes
            .iter()
            .map(|route| {
                (
                    route.endpoint.clone(),
                    RouteState {
                        schema_dir: route.schema.clone(),
                        bound: RwLock::new(None),
                    },
                )
            })
            .collect();
        Self {
            config,
            sessions: Arc::new(SessionStore::new()),
            scalars: ScalarRegistry::new(),
            providers: ProviderRegistry::new(),
            directives: Arc::new(DirectiveRegistry::new()),
            auth: Arc::new(AuthGate::new()),
            routes,
        }
    }

    // ── Registration ────────────────────────────────────────────────────────

    pub fn scalar(&self, name: impl Into<String>, codec: impl ScalarCodec + 'static) {
        self.scalars.register(name, codec);
    }

    pub fn directive(&self, name: impl Into<String>, handler: impl Directive + 'static) {
        self.directives.register(name, handler);
    }

    pub fn provider(&self, type_name: impl Into<String>, provider: Provider) {
        self.providers.register(type_name, provider);
    }

    pub fn on_authorize(&self, predicate: impl Fn(&AuthorizeInfo) -> bool + Send + Sync + 'static) {
        self.auth.set(predicate);
    }

    // ── Accessors ───────────────────────────────────────────────────────────

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub(crate) fn route(&self, path: &str) -> Option<&RouteState> {
        self.routes.get(path)
    }

    // ── Lifecycle ───────────────────────────────────────────────────────────

    /// (Re)load and bind every configured route. Each route gets a complete
    /// replacement snapshot; in-flight requests keep the one they started
    /// with. Any load or bind failure aborts without touching the remaining
    /// routes' published snapshots.
    pub async fn load(&self) -> anyhow::Result<()> {
        for (endpoint, route) in &self.routes {
            let schema = Arc::new(load_schema(&route.schema_dir)?);
            let bound = bind(
                schema,
                &self.providers.snapshot(),
                self.scalars.snapshot(),
                self.directives.clone(),
                self.auth.clone(),
            )?;
            *route.bound.write().await = Some(Arc::new(bound));
            tracing::info!(endpoint = %endpoint, "route bound");
        }
        Ok(())
    }

    /// Build the axum router over all configured routes.
    pub fn router(self: &Arc<Self>) -> Router {
        let mut router: Router<Arc<Server>> = Router::new();
        for endpoint in self.routes.keys() {
            router = router.route(
                endpoint,
                get(routes::graphql_get).post(routes::graphql_post),
            );
        }
        router
            .fallback(routes::not_found)
            .with_state(self.clone())
    }

    /// Load all routes, start the session sweeper, and serve HTTP until the
    /// listener fails.
    pub async fn serve(self: Arc<Self>) -> anyhow::Result<()> {
        self.load().await?;
        let _sweeper = self.sessions.start_sweeper(SESSION_SWEEP_INTERVAL);

        let addr = format!("{}:{}", self.config.server.host, self.config.http_port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        tracing::info!(addr = %addr, "gateway listening");
        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}
