//! End-to-end tests for routing, load balancing, and error envelopes.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use fleet_gateway::config::{GatewayConfig, ServiceConfig};
use fleet_gateway::http::HttpServer;
use fleet_gateway::lifecycle::Shutdown;

mod common;

fn service(name: &str, prefix: &str, origins: &[String]) -> ServiceConfig {
    ServiceConfig {
        name: name.to_string(),
        prefix: prefix.to_string(),
        origins: origins.to_vec(),
    }
}

fn origin(addr: SocketAddr) -> String {
    format!("http://{}", addr)
}

/// Spawn the gateway on an already-chosen port; returns the shutdown handle.
async fn spawn_gateway(config: GatewayConfig, proxy_addr: SocketAddr) -> Shutdown {
    let server = HttpServer::new(config).unwrap();
    let listener = tokio::net::TcpListener::bind(proxy_addr).await.unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

#[tokio::test]
async fn proxies_to_matched_service() {
    let backend_addr: SocketAddr = "127.0.0.1:29101".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:29102".parse().unwrap();

    common::start_mock_backend(backend_addr, "account ok").await;

    let mut config = GatewayConfig::default();
    config
        .services
        .push(service("account", "/api/account", &[origin(backend_addr)]));
    let shutdown = spawn_gateway(config, proxy_addr).await;

    let res = client()
        .get(format!("http://{}/api/account/login", proxy_addr))
        .send()
        .await
        .expect("gateway unreachable");

    assert_eq!(res.status(), 200);
    assert_eq!(
        res.headers().get("x-gateway-upstream").unwrap(),
        &origin(backend_addr)
    );
    assert_eq!(
        res.headers().get("x-gateway-original-path").unwrap(),
        "/api/account/login"
    );
    assert_eq!(res.text().await.unwrap(), "account ok");

    shutdown.trigger();
}

#[tokio::test]
async fn round_robin_alternates_between_origins() {
    let b1_addr: SocketAddr = "127.0.0.1:29111".parse().unwrap();
    let b2_addr: SocketAddr = "127.0.0.1:29112".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:29113".parse().unwrap();

    common::start_mock_backend(b1_addr, "b1").await;
    common::start_mock_backend(b2_addr, "b2").await;

    let mut config = GatewayConfig::default();
    config.services.push(service(
        "account",
        "/api/account",
        &[origin(b1_addr), origin(b2_addr)],
    ));
    let shutdown = spawn_gateway(config, proxy_addr).await;

    let client = client();
    let mut bodies = Vec::new();
    for _ in 0..3 {
        let res = client
            .get(format!("http://{}/api/account/ping", proxy_addr))
            .send()
            .await
            .expect("gateway unreachable");
        bodies.push(res.text().await.unwrap());
    }

    assert_eq!(bodies, vec!["b1", "b2", "b1"]);

    shutdown.trigger();
}

#[tokio::test]
async fn unknown_path_returns_404_envelope() {
    let proxy_addr: SocketAddr = "127.0.0.1:29121".parse().unwrap();

    let mut config = GatewayConfig::default();
    // Configured service exists, but its prefix doesn't match the request.
    config.services.push(service(
        "account",
        "/api/account",
        &["http://127.0.0.1:29129".to_string()],
    ));
    let shutdown = spawn_gateway(config, proxy_addr).await;

    let res = client()
        .get(format!("http://{}/api/does-not-exist", proxy_addr))
        .send()
        .await
        .expect("gateway unreachable");

    assert_eq!(res.status(), 404);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Service not found");

    shutdown.trigger();
}

#[tokio::test]
async fn refused_connection_returns_502_envelope() {
    let proxy_addr: SocketAddr = "127.0.0.1:29131".parse().unwrap();

    let mut config = GatewayConfig::default();
    // Nothing listens on the origin port.
    config.services.push(service(
        "account",
        "/api/account",
        &["http://127.0.0.1:29139".to_string()],
    ));
    let shutdown = spawn_gateway(config, proxy_addr).await;

    let res = client()
        .get(format!("http://{}/api/account/login", proxy_addr))
        .send()
        .await
        .expect("gateway unreachable");

    assert_eq!(res.status(), 502);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Bad Gateway");
    assert!(body["message"].is_string());
    assert!(body["timestamp"].is_string());

    shutdown.trigger();
}

#[tokio::test]
async fn stalled_upstream_returns_504_envelope() {
    let backend_addr: SocketAddr = "127.0.0.1:29141".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:29142".parse().unwrap();

    common::start_stalling_backend(backend_addr).await;

    let mut config = GatewayConfig::default();
    config.timeouts.upstream_secs = 1;
    config
        .services
        .push(service("account", "/api/account", &[origin(backend_addr)]));
    let shutdown = spawn_gateway(config, proxy_addr).await;

    let started = std::time::Instant::now();
    let res = client()
        .get(format!("http://{}/api/account/slow", proxy_addr))
        .send()
        .await
        .expect("gateway unreachable");

    assert_eq!(res.status(), 504);
    assert!(
        started.elapsed() < Duration::from_secs(5),
        "deadline should bound the wait"
    );
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Gateway Timeout");
    assert!(body["timestamp"].is_string());

    shutdown.trigger();
}

#[tokio::test]
async fn forwards_trust_headers_and_strips_host() {
    let backend_addr: SocketAddr = "127.0.0.1:29151".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:29152".parse().unwrap();

    common::start_echo_backend(backend_addr).await;

    let mut config = GatewayConfig::default();
    config
        .services
        .push(service("account", "/api/account", &[origin(backend_addr)]));
    let shutdown = spawn_gateway(config, proxy_addr).await;

    let res = client()
        .get(format!("http://{}/api/account/whoami", proxy_addr))
        .header("x-real-ip", "203.0.113.9")
        .header("authorization", "Bearer token-1")
        .send()
        .await
        .expect("gateway unreachable");

    assert_eq!(res.status(), 200);
    let head = res.text().await.unwrap();

    assert!(head.contains("x-forwarded-by: gateway"), "head: {head}");
    assert!(head.contains("x-forwarded-for: 203.0.113.9"), "head: {head}");
    assert!(head.contains("x-forwarded-proto: http"), "head: {head}");
    assert!(head.contains("authorization: Bearer token-1"), "head: {head}");
    assert!(head.contains("x-request-id:"), "head: {head}");
    // The inbound Host (the gateway's own address) must not be forwarded.
    assert!(!head.contains(&proxy_addr.to_string()), "head: {head}");

    shutdown.trigger();
}

#[tokio::test]
async fn rewrites_path_and_keeps_query() {
    let backend_addr: SocketAddr = "127.0.0.1:29161".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:29162".parse().unwrap();

    common::start_echo_backend(backend_addr).await;

    let mut config = GatewayConfig::default();
    config
        .services
        .push(service("account", "/api/account", &[origin(backend_addr)]));
    let shutdown = spawn_gateway(config, proxy_addr).await;

    let client = client();

    let head = client
        .get(format!("http://{}/api/account/login?next=home", proxy_addr))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(head.starts_with("GET /login?next=home HTTP/1.1"), "head: {head}");

    // A path equal to the prefix forwards as "/".
    let head = client
        .get(format!("http://{}/api/account", proxy_addr))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(head.starts_with("GET / HTTP/1.1"), "head: {head}");

    shutdown.trigger();
}

#[tokio::test]
async fn preflight_is_answered_without_proxying() {
    let backend_addr: SocketAddr = "127.0.0.1:29171".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:29172".parse().unwrap();

    let hits = Arc::new(AtomicU32::new(0));
    let backend_hits = hits.clone();
    common::start_programmable_backend(backend_addr, move || {
        let hits = backend_hits.clone();
        async move {
            hits.fetch_add(1, Ordering::SeqCst);
            (200, "hit".to_string())
        }
    })
    .await;

    let mut config = GatewayConfig::default();
    config
        .services
        .push(service("account", "/api/account", &[origin(backend_addr)]));
    let shutdown = spawn_gateway(config, proxy_addr).await;

    let res = client()
        .request(
            reqwest::Method::OPTIONS,
            format!("http://{}/api/account/login", proxy_addr),
        )
        .header("origin", "https://fleet.example.com")
        .send()
        .await
        .expect("gateway unreachable");

    assert_eq!(res.status(), 204);
    assert_eq!(
        res.headers().get("access-control-allow-origin").unwrap(),
        "https://fleet.example.com"
    );
    assert_eq!(hits.load(Ordering::SeqCst), 0, "preflight must not be proxied");

    shutdown.trigger();
}

#[tokio::test]
async fn health_endpoint_is_served_by_the_gateway() {
    let proxy_addr: SocketAddr = "127.0.0.1:29181".parse().unwrap();

    let mut config = GatewayConfig::default();
    config.services.push(service(
        "account",
        "/api/account",
        &["http://127.0.0.1:29189".to_string()],
    ));
    let shutdown = spawn_gateway(config, proxy_addr).await;

    let res = client()
        .get(format!("http://{}/", proxy_addr))
        .send()
        .await
        .expect("gateway unreachable");

    assert_eq!(res.status(), 200);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["message"], "API Gateway");

    shutdown.trigger();
}

#[tokio::test]
async fn non_get_root_gets_the_gateway_envelope() {
    let proxy_addr: SocketAddr = "127.0.0.1:29211".parse().unwrap();

    let mut config = GatewayConfig::default();
    config.services.push(service(
        "account",
        "/api/account",
        &["http://127.0.0.1:29219".to_string()],
    ));
    let shutdown = spawn_gateway(config, proxy_addr).await;

    // Only GET is answered by the health endpoint; other verbs on "/" go
    // through dispatch, and since no prefix matches "/" they get the
    // structured not-found envelope rather than a bare 405.
    let res = client()
        .post(format!("http://{}/", proxy_addr))
        .send()
        .await
        .expect("gateway unreachable");

    assert_eq!(res.status(), 404);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Service not found");

    shutdown.trigger();
}

#[tokio::test]
async fn rate_limit_rejects_after_burst() {
    let backend_addr: SocketAddr = "127.0.0.1:29191".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:29192".parse().unwrap();

    common::start_mock_backend(backend_addr, "ok").await;

    let mut config = GatewayConfig::default();
    config.rate_limit.requests_per_second = 1;
    config.rate_limit.burst_size = 2;
    config
        .services
        .push(service("account", "/api/account", &[origin(backend_addr)]));
    let shutdown = spawn_gateway(config, proxy_addr).await;

    let client = client();
    let url = format!("http://{}/api/account/ping", proxy_addr);

    assert_eq!(client.get(&url).send().await.unwrap().status(), 200);
    assert_eq!(client.get(&url).send().await.unwrap().status(), 200);

    let res = client.get(&url).send().await.unwrap();
    assert_eq!(res.status(), 429);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Too Many Requests");

    shutdown.trigger();
}

#[tokio::test]
async fn failed_origin_is_not_retried_on_a_sibling() {
    // Both origins down: the selected one fails the request with 502 and
    // the gateway never falls over to the other.
    let proxy_addr: SocketAddr = "127.0.0.1:29201".parse().unwrap();

    let mut config = GatewayConfig::default();
    config.services.push(service(
        "account",
        "/api/account",
        &[
            "http://127.0.0.1:29208".to_string(),
            "http://127.0.0.1:29209".to_string(),
        ],
    ));
    let shutdown = spawn_gateway(config, proxy_addr).await;

    let res = client()
        .get(format!("http://{}/api/account/login", proxy_addr))
        .send()
        .await
        .expect("gateway unreachable");

    assert_eq!(res.status(), 502);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Bad Gateway");

    shutdown.trigger();
}
