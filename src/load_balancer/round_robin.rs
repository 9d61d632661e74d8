//! Round-robin load balancing strategy.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::load_balancer::{origin::Origin, LoadBalancer};

/// Round-robin selector.
/// Stores an internal cursor to rotate through origins; each pool owns
/// its own instance, so cursors are per-prefix.
#[derive(Debug, Default)]
pub struct RoundRobin {
    cursor: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoadBalancer for RoundRobin {
    fn next_origin(&self, origins: &[Arc<Origin>]) -> Option<Arc<Origin>> {
        if origins.is_empty() {
            return None;
        }

        // The modulo also bounds the index if the counter ever drifts
        // (e.g., usize wraparound under sustained load).
        let n = self.cursor.fetch_add(1, Ordering::Relaxed);
        Some(origins[n % origins.len()].clone())
    }
}
