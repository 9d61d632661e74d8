//! Fleet-Tracking API Gateway
//!
//! Fronts the fleet-tracking backend services: routes requests by path
//! prefix, balances across origins, forwards with trust headers, and
//! converts every upstream failure into a structured gateway response.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌───────────────────────────────────────────────┐
//!                    │                  API GATEWAY                   │
//!                    │                                                │
//!   Client Request   │  ┌──────────┐   ┌──────────┐   ┌───────────┐  │
//!   ─────────────────┼─▶│ security │──▶│  http    │──▶│  routing  │  │
//!                    │  │cors/rate │   │ dispatch │   │   table   │  │
//!                    │  └──────────┘   └────┬─────┘   └─────┬─────┘  │
//!                    │                      │               │        │
//!                    │                      │               ▼        │
//!                    │                      │       ┌──────────────┐ │
//!                    │                      │       │load_balancer │ │
//!                    │                      │       │  (rr/random/ │ │
//!                    │                      │       │  least-conn) │ │
//!                    │                      ▼       └──────────────┘ │
//!   Client Response  │  ┌──────────┐   ┌──────────┐                  │
//!   ◀────────────────┼──│ envelope │◀──│ upstream │◀─────────────────┼── Backend
//!                    │  │404/502/  │   │  call +  │                  │   Service
//!                    │  │504 JSON  │   │ deadline │                  │
//!                    │  └──────────┘   └──────────┘                  │
//!                    └───────────────────────────────────────────────┘
//! ```

// Core subsystems
pub mod config;
pub mod http;
pub mod routing;

// Traffic management
pub mod load_balancer;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod security;

use tokio::net::TcpListener;

use crate::http::HttpServer;
use crate::lifecycle::Shutdown;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration first; the log level comes from it.
    let config = config::env::from_env()?;
    observability::logging::init(&config.observability.log_level);

    tracing::info!("fleet-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        services = config.services.len(),
        strategy = ?config.strategy,
        upstream_timeout_secs = config.timeouts.upstream_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => observability::metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        lifecycle::signals::wait_for_signal().await;
        shutdown.trigger();
    });

    let server = HttpServer::new(config)?;
    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
