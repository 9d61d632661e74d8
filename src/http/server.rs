//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the Axum router (health endpoint + catch-all proxy)
//! - Wire up middleware (tracing, CORS, rate limiting, body limit,
//!   concurrency ceiling)
//! - Serve with graceful shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::Method,
    middleware,
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};
use chrono::Utc;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::config::validation::ValidationError;
use crate::config::GatewayConfig;
use crate::http::dispatch;
use crate::routing::RouteTable;
use crate::security::cors::cors_middleware;
use crate::security::rate_limit::{rate_limit_middleware, RateLimiterState};

use axum::body::Body;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub table: Arc<RouteTable>,
    pub client: Client<HttpConnector, Body>,
    pub upstream_timeout: Duration,
}

/// HTTP server for the API gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    ///
    /// Fails if the route table cannot be built (the process must not
    /// serve traffic with an invalid table).
    pub fn new(config: GatewayConfig) -> Result<Self, ValidationError> {
        let table = Arc::new(RouteTable::from_config(&config.services, config.strategy)?);

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        let state = AppState {
            table,
            client,
            upstream_timeout: Duration::from_secs(config.timeouts.upstream_secs),
        };

        let router = Self::build_router(&config, state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        let mut router = Router::new()
            .route("/", any(root_handler))
            .route("/{*path}", any(dispatch::proxy_handler))
            .with_state(state);

        if config.rate_limit.enabled {
            let limiter = Arc::new(RateLimiterState::new(&config.rate_limit));
            router = router.layer(middleware::from_fn_with_state(
                limiter,
                rate_limit_middleware,
            ));
        }

        // CORS sits outside rate limiting so preflights are answered
        // directly and 429s still carry CORS headers.
        router.layer(middleware::from_fn(cors_middleware)).layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(GlobalConcurrencyLimitLayer::new(
                    config.listener.max_connections,
                ))
                .layer(RequestBodyLimitLayer::new(config.security.max_body_size)),
        )
    }

    /// Run the server until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

/// Root path: `GET /` is the gateway health endpoint; every other verb
/// goes through normal dispatch so the 404 envelope contract also holds
/// on `/` (no prefix matches it).
async fn root_handler(state: State<AppState>, request: Request) -> Response {
    if request.method() == Method::GET {
        return health_handler().await.into_response();
    }
    dispatch::proxy_handler(state, request).await
}

/// Gateway health endpoint; answered directly, never proxied.
async fn health_handler() -> Json<Value> {
    Json(json!({
        "message": "API Gateway",
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
