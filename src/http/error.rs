//! Gateway error taxonomy and response envelopes.
//!
//! # Responsibilities
//! - Classify every dispatch failure (no route / timeout / transport)
//! - Convert each failure into its stable JSON envelope
//!
//! # Design Decisions
//! - Failures are fully absorbed here: the client always receives a
//!   well-formed HTTP response with a machine-readable `error` field,
//!   never a raw error or a dropped connection
//! - 404 means "the gateway doesn't know this path"; 502/504 mean "the
//!   gateway knows it but the backend failed/stalled"

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde_json::json;
use thiserror::Error;

/// Everything that can go wrong while dispatching one request.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No configured prefix matches the request path.
    #[error("Service not found")]
    NoRouteMatch,

    /// The upstream call exceeded its deadline.
    #[error("The upstream service did not respond in time")]
    UpstreamTimeout,

    /// Connection refused, DNS failure, reset, or any other network fault.
    #[error("upstream request failed: {0}")]
    UpstreamTransport(String),
}

impl GatewayError {
    /// The status code this failure surfaces as.
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::NoRouteMatch => StatusCode::NOT_FOUND,
            GatewayError::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::UpstreamTransport(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            GatewayError::NoRouteMatch => json!({
                "error": "Service not found",
            }),
            GatewayError::UpstreamTimeout => json!({
                "error": "Gateway Timeout",
                "message": self.to_string(),
                "timestamp": Utc::now().to_rfc3339(),
            }),
            GatewayError::UpstreamTransport(message) => json!({
                "error": "Bad Gateway",
                "message": message,
                "timestamp": Utc::now().to_rfc3339(),
            }),
        };

        (status, Json(body)).into_response()
    }
}
