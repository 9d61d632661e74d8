//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Prefix matched → service's OriginPool identified
//!     → pool.rs (single-origin bypass or strategy dispatch)
//!     → Apply load balancing algorithm:
//!         - round_robin.rs (per-pool atomic cursor)
//!         - random.rs (uniform choice, no shared state)
//!         - least_conn.rs (pick origin with fewest in-flight requests)
//!     → origin.rs (RAII guard tracking the in-flight count)
//!     → Return origin guard
//! ```
//!
//! # Design Decisions
//! - Selection state is owned by the pool instance, never a process global,
//!   so tables are unit-testable in isolation
//! - The cursor is advanced with a lock-free atomic; the index is reduced
//!   modulo the origin count so counter drift can never go out of bounds
//! - No health tracking: a dead origin fails its request and the cursor
//!   still advances for the next one

pub mod least_conn;
pub mod origin;
pub mod pool;
pub mod random;
pub mod round_robin;

use std::sync::Arc;

use origin::Origin;

/// Trait for origin selection strategies.
pub trait LoadBalancer: Send + Sync + std::fmt::Debug {
    /// Pick the next origin. Returns `None` only for an empty slice.
    fn next_origin(&self, origins: &[Arc<Origin>]) -> Option<Arc<Origin>>;
}
