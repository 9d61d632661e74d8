//! Origin abstraction.
//!
//! # Responsibilities
//! - Represent a single backend origin (base URL)
//! - Track in-flight requests (for Least Connections LB)

use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use url::Url;

/// A single backend origin.
#[derive(Debug)]
pub struct Origin {
    /// Base URL exactly as configured, without a trailing slash
    /// (e.g., "http://localhost:4000"). Used verbatim when building
    /// target URLs and the `x-gateway-upstream` header.
    base: String,
    /// Parsed form of `base`.
    url: Url,
    /// Number of requests currently in flight to this origin.
    in_flight: AtomicUsize,
}

impl Origin {
    /// Parse an origin from its configured base URL.
    pub fn parse(raw: &str) -> Result<Self, url::ParseError> {
        let url = Url::parse(raw)?;
        Ok(Self {
            base: raw.trim_end_matches('/').to_string(),
            url,
            in_flight: AtomicUsize::new(0),
        })
    }

    /// The configured base URL, without trailing slash.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// The parsed base URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Current number of in-flight requests.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Acquire a guard that counts one in-flight request until dropped.
    pub fn acquire(self: &Arc<Self>) -> OriginGuard {
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        OriginGuard {
            origin: self.clone(),
        }
    }
}

/// RAII guard that decrements the in-flight count when the request ends.
#[derive(Debug)]
pub struct OriginGuard {
    origin: Arc<Origin>,
}

impl Deref for OriginGuard {
    type Target = Origin;

    fn deref(&self) -> &Self::Target {
        &self.origin
    }
}

impl Drop for OriginGuard {
    fn drop(&mut self) {
        self.origin.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}
