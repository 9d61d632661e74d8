//! Route table: path prefix → origin pool.
//!
//! # Responsibilities
//! - Map a request path to the backend service that owns it
//! - Apply the selection strategy when a service has multiple origins
//!
//! # Design Decisions
//! - Prefixes are scanned in declaration order; first match wins
//! - Matching is a raw string-prefix test, not segment-aware: `/api/account`
//!   also matches `/api/accountant`. This reproduces the deployed routing
//!   behavior; see DESIGN.md before "fixing" it
//! - Explicit `None` on no match rather than a silent default

use std::sync::Arc;

use crate::config::{LoadBalanceStrategy, ServiceConfig};
use crate::config::validation::ValidationError;
use crate::load_balancer::origin::{Origin, OriginGuard};
use crate::load_balancer::pool::OriginPool;

/// One registered prefix and its origin pool.
#[derive(Debug)]
struct Route {
    prefix: String,
    service: String,
    pool: OriginPool,
}

/// The outcome of a successful resolution.
#[derive(Debug)]
pub struct Resolution {
    /// Guard for the selected origin; holds the in-flight count until drop.
    pub origin: OriginGuard,
    /// The prefix that matched, to be stripped from the forwarded path.
    pub prefix: String,
    /// Service name, for logging and metrics.
    pub service: String,
}

/// Immutable mapping from path prefixes to origin pools.
///
/// Built once at startup; the only mutable state inside is the per-pool
/// selection state (round-robin cursors, in-flight counters).
#[derive(Debug)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Build the table from validated service configs.
    ///
    /// Fails fast on an empty origin list or an unparsable origin, so the
    /// process never starts serving with a broken table.
    pub fn from_config(
        services: &[ServiceConfig],
        strategy: LoadBalanceStrategy,
    ) -> Result<Self, ValidationError> {
        let mut routes = Vec::with_capacity(services.len());

        for service in services {
            let mut origins = Vec::with_capacity(service.origins.len());
            for raw in &service.origins {
                let origin = Origin::parse(raw).map_err(|e| ValidationError::InvalidOrigin {
                    service: service.name.clone(),
                    origin: raw.clone(),
                    reason: e.to_string(),
                })?;
                origins.push(Arc::new(origin));
            }

            let pool = OriginPool::new(origins, strategy).map_err(|_| {
                ValidationError::EmptyOrigins {
                    service: service.name.clone(),
                }
            })?;

            routes.push(Route {
                prefix: service.prefix.clone(),
                service: service.name.clone(),
                pool,
            });
        }

        Ok(Self { routes })
    }

    /// Resolve a request path to an origin.
    ///
    /// Returns `None` when no prefix matches; the caller answers 404.
    pub fn resolve(&self, path: &str) -> Option<Resolution> {
        let route = self
            .routes
            .iter()
            .find(|r| path.starts_with(&r.prefix))?;

        Some(Resolution {
            origin: route.pool.select(),
            prefix: route.prefix.clone(),
            service: route.service.clone(),
        })
    }

    /// Number of registered prefixes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
