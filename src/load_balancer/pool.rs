//! Per-service origin pool.
//!
//! # Responsibilities
//! - Own the origins configured for one path prefix
//! - Bypass strategy selection entirely for single-origin pools
//! - Hand out connection guards for in-flight tracking

use std::sync::Arc;

use crate::config::LoadBalanceStrategy;
use crate::load_balancer::{
    least_conn::LeastConnections,
    origin::{Origin, OriginGuard},
    random::Random,
    round_robin::RoundRobin,
    LoadBalancer,
};

/// The origins behind one path prefix, plus the selection strategy.
///
/// Invariant: the origin list is never empty. This is enforced at
/// construction and relied upon by [`OriginPool::select`].
#[derive(Debug)]
pub struct OriginPool {
    origins: Vec<Arc<Origin>>,
    balancer: Box<dyn LoadBalancer>,
}

/// Error returned when a pool would be constructed without origins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmptyPool;

impl std::fmt::Display for EmptyPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "origin pool must not be empty")
    }
}

impl std::error::Error for EmptyPool {}

impl OriginPool {
    /// Create a pool. Fails if `origins` is empty.
    pub fn new(
        origins: Vec<Arc<Origin>>,
        strategy: LoadBalanceStrategy,
    ) -> Result<Self, EmptyPool> {
        if origins.is_empty() {
            return Err(EmptyPool);
        }

        let balancer: Box<dyn LoadBalancer> = match strategy {
            LoadBalanceStrategy::RoundRobin => Box::new(RoundRobin::new()),
            LoadBalanceStrategy::Random => Box::new(Random::new()),
            LoadBalanceStrategy::LeastConnections => Box::new(LeastConnections::new()),
        };

        Ok(Self { origins, balancer })
    }

    /// Select an origin and acquire its in-flight guard.
    pub fn select(&self) -> OriginGuard {
        // Single-origin pools skip the strategy entirely.
        if self.origins.len() == 1 {
            return self.origins[0].acquire();
        }

        match self.balancer.next_origin(&self.origins) {
            Some(origin) => origin.acquire(),
            // Unreachable while the non-empty invariant holds.
            None => self.origins[0].acquire(),
        }
    }

    pub fn len(&self) -> usize {
        self.origins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }

    pub fn origins(&self) -> &[Arc<Origin>] {
        &self.origins
    }
}
