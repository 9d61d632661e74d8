//! Proxy dispatch: one inbound request, exactly one upstream call.
//!
//! # Responsibilities
//! - Resolve the target origin via the route table
//! - Strip the matched prefix from the forwarded path
//! - Apply the forwarding header policy (trust token, x-forwarded-*)
//! - Enforce the upstream deadline and relay the outcome
//!
//! # Design Decisions
//! - No retries and no failover: a failed origin fails that request, and
//!   the round-robin cursor still advances for the next one
//! - The deadline cancels only this call's network operation; dropping the
//!   timed-out future aborts the in-flight upstream request
//! - Every failure path produces a structured JSON envelope (see error.rs)

use std::time::Instant;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{
        header::{self, HeaderMap, HeaderName, HeaderValue},
        Uri,
    },
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::http::error::GatewayError;
use crate::http::server::AppState;
use crate::observability::metrics;

pub static X_FORWARDED_BY: HeaderName = HeaderName::from_static("x-forwarded-by");
pub static X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
pub static X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");
pub static X_REAL_IP: HeaderName = HeaderName::from_static("x-real-ip");
pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");
pub static X_GATEWAY_UPSTREAM: HeaderName = HeaderName::from_static("x-gateway-upstream");
pub static X_GATEWAY_ORIGINAL_PATH: HeaderName =
    HeaderName::from_static("x-gateway-original-path");

/// Main proxy handler: resolve, rewrite, forward, relay.
pub async fn proxy_handler(State(state): State<AppState>, request: Request) -> Response {
    let start = Instant::now();
    let path = request.uri().path().to_string();
    let query = request.uri().query().map(str::to_owned);
    let method = request.method().clone();

    let resolution = match state.table.resolve(&path) {
        Some(resolution) => resolution,
        None => {
            tracing::warn!(method = %method, path = %path, "no service for path");
            metrics::record_request(method.as_str(), 404, "none", start);
            return GatewayError::NoRouteMatch.into_response();
        }
    };

    let request_id = request
        .headers()
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let target_path = rewrite_path(&path, &resolution.prefix);
    let upstream = resolution.origin.base().to_string();

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %path,
        service = %resolution.service,
        upstream = %upstream,
        target_path = %target_path,
        "dispatching request"
    );

    let uri = match target_uri(&upstream, &target_path, query.as_deref()) {
        Ok(uri) => uri,
        Err(message) => {
            tracing::error!(request_id = %request_id, path = %path, %message, "target URI rejected");
            metrics::record_request(method.as_str(), 502, &upstream, start);
            return GatewayError::UpstreamTransport(message).into_response();
        }
    };

    let (parts, body) = request.into_parts();
    let mut outbound = match axum::http::Request::builder()
        .method(method.clone())
        .uri(uri)
        .body(body)
    {
        Ok(outbound) => outbound,
        Err(e) => {
            metrics::record_request(method.as_str(), 502, &upstream, start);
            return GatewayError::UpstreamTransport(e.to_string()).into_response();
        }
    };
    *outbound.headers_mut() = forward_headers(&parts.headers, &request_id);

    // The origin guard stays alive for the whole upstream call so the
    // least-connections counter reflects in-flight work.
    match tokio::time::timeout(state.upstream_timeout, state.client.request(outbound)).await {
        Err(_elapsed) => {
            tracing::warn!(
                request_id = %request_id,
                upstream = %upstream,
                timeout = ?state.upstream_timeout,
                "upstream deadline exceeded"
            );
            metrics::record_request(method.as_str(), 504, &upstream, start);
            GatewayError::UpstreamTimeout.into_response()
        }
        Ok(Err(e)) => {
            tracing::error!(request_id = %request_id, upstream = %upstream, error = %e, "upstream transport failure");
            metrics::record_request(method.as_str(), 502, &upstream, start);
            GatewayError::UpstreamTransport(e.to_string()).into_response()
        }
        Ok(Ok(response)) => {
            let status = response.status();
            metrics::record_request(method.as_str(), status.as_u16(), &upstream, start);

            let (mut parts, body) = response.into_parts();
            if let Ok(value) = HeaderValue::from_str(&upstream) {
                parts.headers.insert(X_GATEWAY_UPSTREAM.clone(), value);
            }
            if let Ok(value) = HeaderValue::from_str(&path) {
                parts.headers.insert(X_GATEWAY_ORIGINAL_PATH.clone(), value);
            }

            Response::from_parts(parts, Body::new(body))
        }
    }
}

/// Strip the matched prefix from the inbound path; an empty result is
/// normalized to "/".
fn rewrite_path(path: &str, prefix: &str) -> String {
    let stripped = path.strip_prefix(prefix).unwrap_or(path);
    if stripped.is_empty() {
        "/".to_string()
    } else {
        stripped.to_string()
    }
}

/// Combine origin base, rewritten path, and original query into the
/// upstream URI.
fn target_uri(base: &str, path: &str, query: Option<&str>) -> Result<Uri, String> {
    let mut target = String::with_capacity(base.len() + path.len() + 16);
    target.push_str(base);
    target.push_str(path);
    if let Some(query) = query {
        target.push('?');
        target.push_str(query);
    }
    target.parse::<Uri>().map_err(|e| e.to_string())
}

/// Build the outbound header set.
///
/// Copies everything except the connection-management headers (`host`,
/// `connection`), then sets the gateway trust headers. `x-forwarded-by`
/// doubles as the trust token every downstream service checks.
fn forward_headers(inbound: &HeaderMap, request_id: &str) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(inbound.len() + 4);

    for (name, value) in inbound {
        if name == header::HOST || name == header::CONNECTION {
            continue;
        }
        out.append(name.clone(), value.clone());
    }

    let client = inbound
        .get(&X_FORWARDED_FOR)
        .or_else(|| inbound.get(&X_REAL_IP))
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("unknown"));

    out.insert(X_FORWARDED_BY.clone(), HeaderValue::from_static("gateway"));
    out.insert(X_FORWARDED_FOR.clone(), client);
    if !out.contains_key(&X_FORWARDED_PROTO) {
        out.insert(X_FORWARDED_PROTO.clone(), HeaderValue::from_static("http"));
    }
    if let Ok(value) = HeaderValue::from_str(request_id) {
        out.insert(X_REQUEST_ID.clone(), value);
    }

    out
}
