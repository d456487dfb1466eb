//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the gateway handler
//! - Wire up middleware (tracing, request ID, timeout, identity)
//! - Match each request to a route and run its tier gate
//! - Forward allowed requests to the upstream
//! - Apply configuration updates without a restart

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::{header, uri::Scheme, Request, StatusCode, Uri},
    middleware,
    response::Response,
    routing::any,
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::admin::{setup_admin_router, AdminState};
use crate::config::{shared, ServiceConfig, SharedConfig};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer, RequestIdExt};
use crate::identity::{resolve_identity_middleware, Caller, ForwardedIdentity, IdentityResolver};
use crate::limiter::decision::error_response;
use crate::limiter::TierGates;
use crate::observability::metrics;
use crate::routing::RouteTable;
use crate::store::{CounterStore, MemoryStore, TimedStore};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: SharedConfig,
    pub routes: Arc<ArcSwap<RouteTable>>,
    pub gates: TierGates,
    pub client: Client<HttpConnector, Body>,
}

/// The rate-limiting gateway.
pub struct HttpServer {
    router: Router,
    state: AppState,
    store: Arc<dyn CounterStore>,
    sweeper: Option<MemoryStore>,
}

impl HttpServer {
    /// Create a gateway backed by an in-process counter store.
    ///
    /// `store.timeout_ms` and `store.sweep_interval_secs` follow config
    /// reloads.
    pub fn new(config: ServiceConfig) -> Self {
        let memory = MemoryStore::new();
        let live = Arc::new(ArcSwap::from_pointee(config));
        let timeouts = live.clone();
        let store: Arc<dyn CounterStore> = Arc::new(TimedStore::with_source(
            memory.clone(),
            Arc::new(move || Duration::from_millis(timeouts.load().store.timeout_ms)),
        ));
        let mut server = Self::with_shared(live, store);
        server.sweeper = Some(memory);
        server
    }

    /// Create a gateway over an existing counter store.
    pub fn with_store(config: ServiceConfig, store: Arc<dyn CounterStore>) -> Self {
        Self::with_shared(shared(config), store)
    }

    fn with_shared(config: SharedConfig, store: Arc<dyn CounterStore>) -> Self {
        let (routes, request_timeout) = {
            let current = config.load();
            (
                Arc::new(ArcSwap::from_pointee(RouteTable::from_config(&current.routes))),
                Duration::from_secs(current.timeouts.request_secs),
            )
        };
        let resolver: Arc<dyn IdentityResolver> = Arc::new(ForwardedIdentity::new(config.clone()));

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        let state = AppState {
            gates: TierGates::new(store.clone(), config.clone()),
            config,
            routes,
            client,
        };

        let router = Self::build_router(state.clone(), resolver, request_timeout);
        Self {
            router,
            state,
            store,
            sweeper: None,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(
        state: AppState,
        resolver: Arc<dyn IdentityResolver>,
        request_timeout: Duration,
    ) -> Router {
        Router::new()
            .route("/", any(gateway_handler))
            .route("/{*path}", any(gateway_handler))
            .with_state(state)
            .layer(middleware::from_fn_with_state(resolver, resolve_identity_middleware))
            .layer(TimeoutLayer::new(request_timeout))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// Router for the admin API, sharing this gateway's store and config.
    pub fn admin_router(&self) -> Router {
        setup_admin_router(AdminState {
            config: self.state.config.clone(),
            routes: self.state.routes.clone(),
            store: self.store.clone(),
        })
    }

    /// Gateway router, for serving it on a custom stack.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run the server until `shutdown` fires.
    ///
    /// Configurations received on `config_updates` replace the live one;
    /// counters are kept.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<ServiceConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        if let Some(memory) = &self.sweeper {
            let config = self.state.config.clone();
            memory.spawn_sweeper(
                move || Duration::from_secs(config.load().store.sweep_interval_secs),
                shutdown.resubscribe(),
            );
        }

        let state = self.state.clone();
        let mut reload_shutdown = shutdown.resubscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    update = config_updates.recv() => match update {
                        Some(config) => apply_config(&state, config),
                        None => break,
                    },
                    _ = reload_shutdown.recv() => break,
                }
            }
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

fn apply_config(state: &AppState, config: ServiceConfig) {
    let routes = RouteTable::from_config(&config.routes);
    tracing::info!(
        routes = routes.len(),
        decay_minutes = config.rate_limits.decay_minutes,
        "Applying new configuration"
    );
    state.routes.store(Arc::new(routes));
    state.config.store(Arc::new(config));
}

/// Route lookup, auth check, gate, forward.
async fn gateway_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let path = request.uri().path().to_string();
    let route = state.routes.load().match_path(&path).cloned();

    let Some(route) = route else {
        tracing::debug!(request_id = %request.request_id(), path = %path, "No route matched");
        metrics::record_rejected("unrouted");
        return error_response(StatusCode::NOT_FOUND, "Not Found", "No matching route.");
    };

    if route.require_auth && request.extensions().get::<Caller>().is_none() {
        tracing::debug!(request_id = %request.request_id(), route = %route.name, "Unauthenticated request");
        metrics::record_rejected("unauthenticated");
        return error_response(
            StatusCode::UNAUTHORIZED,
            "Unauthenticated",
            "Authentication required.",
        );
    }

    let gate = state.gates.for_tier(route.tier);
    gate.handle(request, &route.endpoint_type, |req| forward(&state, req))
        .await
}

async fn forward(state: &AppState, request: Request<Body>) -> Response {
    let start = Instant::now();
    let upstream = state.config.load().upstream.address.clone();
    let request_id = request.request_id().to_string();

    let (mut parts, body) = request.into_parts();
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    let uri = match Uri::builder()
        .scheme(Scheme::HTTP)
        .authority(upstream.as_str())
        .path_and_query(path_and_query)
        .build()
    {
        Ok(uri) => uri,
        Err(e) => {
            tracing::error!(request_id = %request_id, upstream = %upstream, error = %e, "Invalid upstream address");
            return error_response(StatusCode::BAD_GATEWAY, "Bad Gateway", "Upstream request failed.");
        }
    };
    parts.uri = uri;
    parts.headers.remove(header::HOST);

    let upstream_result: Result<hyper::Response<hyper::body::Incoming>, _> =
        state.client.request(Request::from_parts(parts, body)).await;
    match upstream_result {
        Ok(response) => {
            metrics::record_upstream(response.status().as_u16(), start);
            let (parts, body) = response.into_parts();
            Response::from_parts(parts, Body::new(body))
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, upstream = %upstream, error = %e, "Upstream error");
            metrics::record_upstream(StatusCode::BAD_GATEWAY.as_u16(), start);
            error_response(StatusCode::BAD_GATEWAY, "Bad Gateway", "Upstream request failed.")
        }
    }
}
