//! adx-proxy - cost-control proxy for Azure Data Explorer telemetry.
//!
//! The proxy sits between dashboards and the billed query engine,
//! providing:
//! - result caching with short TTLs
//! - batched "latest value per name" lookups
//! - rate limiting of outbound queries
//!
//! ## Quick Start
//!
//! ```bash
//! # Degraded mode (no engine configured): serves empty results
//! adx-proxy
//!
//! # Full configuration
//! ADX_CLUSTER_URI=https://mycluster.region.kusto.windows.net \
//! ADX_DATABASE=telemetry \
//! ADX_CLIENT_ID=... ADX_CLIENT_SECRET=... ADX_TENANT_ID=... \
//! adx-proxy
//! ```

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use adx_proxy::{run_server, ProxyConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("adx_proxy=info,tower_http=info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    let config = ProxyConfig::from_env();
    run_server(config).await
}
