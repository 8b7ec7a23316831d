//! ADX cost-control query proxy.
//!
//! Sits between client applications and a cloud-hosted analytical query
//! engine (Azure Data Explorer) and bounds the cost and load imposed on
//! it: many small per-metric lookups are folded into single "latest value
//! per name" queries, results are cached briefly, and outbound query
//! volume is throttled by a sliding-window rate limiter.
//!
//! The library exposes the core components for embedding; the binary
//! serves them over a thin HTTP surface.

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

pub mod batch;
pub mod cache;
pub mod client;
pub mod error;
pub mod executor;
pub mod limiter;
pub mod metrics;
pub mod routes;
pub mod state;
pub mod types;

pub use state::{AppState, ProxyConfig};

/// Initialize Prometheus metrics registry.
/// Should be called once before starting the server.
pub fn init_metrics() {
    if let Err(e) = metrics::register_metrics() {
        warn!("Failed to register Prometheus metrics: {}", e);
    }
}

/// Build the HTTP router over the shared state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health and observability
        .route("/health", get(routes::health))
        .route("/live", get(routes::live))
        .route("/stats", get(routes::stats))
        .route("/metrics", get(routes::metrics_prometheus))
        // Query endpoints
        .route("/api/query", post(routes::execute_query))
        .route("/api/query/batch", post(routes::execute_query_batch))
        .route("/api/telemetry/latest", post(routes::telemetry_latest))
        .route("/api/alarms/latest", post(routes::alarms_latest))
        // Middleware
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the proxy server.
///
/// This function starts the HTTP server and blocks until it's shut down.
pub async fn run_server(config: ProxyConfig) -> anyhow::Result<()> {
    init_metrics();

    info!(
        port = config.port,
        "Starting adx-proxy v{}",
        env!("CARGO_PKG_VERSION")
    );

    let state = Arc::new(AppState::new(config.clone()));
    let app = router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("adx-proxy listening on http://{}", addr);
    print_banner(&config, &addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Print the startup banner
fn print_banner(config: &ProxyConfig, addr: &str) {
    println!();
    println!("==================================================");
    println!("  adx-proxy v{}", env!("CARGO_PKG_VERSION"));
    println!("==================================================");
    println!("  Listening on: http://{}", addr);
    println!(
        "  Query engine: {}",
        config
            .adx
            .as_ref()
            .map(|adx| adx.cluster.as_str())
            .unwrap_or("not configured (degraded mode)")
    );
    println!();
    println!("  Throttle configuration:");
    println!(
        "    Max queries: {} per {}s window",
        config.limiter.max_requests,
        config.limiter.window.as_secs()
    );
    println!();
    println!("  Cache configuration:");
    println!(
        "    TTL: {}s (historical: {}s), capacity: {} entries",
        config.cache.default_ttl.as_secs(),
        config.cache.historical_ttl.as_secs(),
        config.cache.capacity
    );
    println!();
    println!("  Endpoints:");
    println!("    Query:     POST /api/query, POST /api/query/batch");
    println!("    Telemetry: POST /api/telemetry/latest");
    println!("    Alarms:    POST /api/alarms/latest");
    println!("    Health:    GET  /health, /live, /stats, /metrics");
    println!("==================================================");
    println!();
}
