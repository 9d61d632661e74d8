//! Random load balancing strategy.

use rand::Rng;
use std::sync::Arc;

use crate::load_balancer::{origin::Origin, LoadBalancer};

/// Uniform random selector. Carries no shared state between calls.
#[derive(Debug, Default)]
pub struct Random;

impl Random {
    pub fn new() -> Self {
        Self
    }
}

impl LoadBalancer for Random {
    fn next_origin(&self, origins: &[Arc<Origin>]) -> Option<Arc<Origin>> {
        if origins.is_empty() {
            return None;
        }

        let index = rand::thread_rng().gen_range(0..origins.len());
        Some(origins[index].clone())
    }
}
