//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! process environment
//!     → env.rs (read <SERVICE>_HOST/_PORT/_URLS pairs)
//!     → validation.rs (semantic checks, all errors collected)
//!     → GatewayConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the process restarts to pick up changes
//! - All fields have defaults so a bare environment still yields a working
//!   local setup
//! - Validation separates syntactic (parsing) from semantic checks and is
//!   fatal at startup: an invalid route table never serves traffic

pub mod env;
pub mod schema;
pub mod validation;

pub use schema::GatewayConfig;
pub use schema::ListenerConfig;
pub use schema::LoadBalanceStrategy;
pub use schema::ObservabilityConfig;
pub use schema::RateLimitConfig;
pub use schema::SecurityConfig;
pub use schema::ServiceConfig;
pub use schema::TimeoutConfig;
