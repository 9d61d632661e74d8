//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path
//!     → table.rs (ordered prefix scan, first match wins)
//!     → matched service's OriginPool applies the selection strategy
//!     → Return: origin guard + matched prefix, or explicit no-match
//!
//! Table Construction (at startup):
//!     ServiceConfig[]
//!     → Parse origins, build per-service pools
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Table compiled at startup, immutable at runtime except selection state
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same path always matches the same prefix
//! - First match wins, in configuration declaration order

pub mod table;

pub use table::{Resolution, RouteTable};
