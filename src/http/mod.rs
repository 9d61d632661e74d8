//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → dispatch.rs (resolve origin, rewrite path, forward with deadline)
//!     → error.rs (synthesized envelopes for 404/502/504)
//!     → Relay to client
//! ```

pub mod dispatch;
pub mod error;
pub mod server;

pub use error::GatewayError;
pub use server::HttpServer;
