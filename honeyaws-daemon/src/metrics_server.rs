//! Prometheus metrics HTTP server.
//!
//! Uses the built-in HTTP listener from `metrics-exporter-prometheus`.
//! Once installed, every `metrics::counter!()` and `metrics::histogram!()`
//! call in the publisher is exported on `http://{listen_addr}:{port}/metrics`.

use std::net::SocketAddr;

use anyhow::Result;
use honeyaws_core::config::MetricsConfig;
use honeyaws_core::metrics::{OBJECT_PARSE_DURATION_BUCKETS, PUBLISHER_OBJECT_PARSE_DURATION_SECONDS};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};

/// Resolve the listener address from the `[metrics]` section.
pub fn listen_addr(config: &MetricsConfig) -> Result<SocketAddr> {
    format!("{}:{}", config.listen_addr, config.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid metrics listen address: {}", e))
}

/// Install the global metrics recorder and start the HTTP listener.
///
/// Call once per process, from inside a tokio runtime.
///
/// # Errors
///
/// - The listen address does not parse
/// - Socket binding fails
/// - A global recorder is already installed
pub fn install_metrics_recorder(config: &MetricsConfig) -> Result<()> {
    let addr = listen_addr(config)?;

    if addr.ip().is_unspecified() {
        tracing::warn!(
            listen_addr = %addr,
            "metrics endpoint is exposed on all interfaces"
        );
    }

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(
            Matcher::Full(PUBLISHER_OBJECT_PARSE_DURATION_SECONDS.to_owned()),
            &OBJECT_PARSE_DURATION_BUCKETS,
        )
        .map_err(|e| anyhow::anyhow!("invalid histogram buckets: {}", e))?
        .install()
        .map_err(|e| anyhow::anyhow!("failed to install metrics recorder: {}", e))?;

    honeyaws_core::metrics::describe_all();

    tracing::info!(listen_addr = %addr, "Prometheus metrics endpoint active");
    Ok(())
}
