//! Least Connections load balancing strategy.

use std::sync::Arc;

use crate::load_balancer::{origin::Origin, LoadBalancer};

/// Least connections selector.
/// Selects the origin with the minimum number of in-flight requests,
/// as tracked by the RAII guards handed out per dispatch.
#[derive(Debug, Default)]
pub struct LeastConnections;

impl LeastConnections {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoadBalancer for LeastConnections {
    fn next_origin(&self, origins: &[Arc<Origin>]) -> Option<Arc<Origin>> {
        // In case of tie, the first one is selected (stability)
        origins.iter().min_by_key(|o| o.in_flight()).cloned()
    }
}
