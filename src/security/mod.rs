//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → cors.rs (answer preflight, decorate responses)
//!     → rate_limit.rs (check per-client limits)
//!     → Pass to dispatch
//! ```
//!
//! # Design Decisions
//! - Fail closed: a rate-limited request never reaches the route table
//! - No trust in client input beyond the forwarded-for key, which is only
//!   used for bucketing, never for authorization

pub mod cors;
pub mod rate_limit;
