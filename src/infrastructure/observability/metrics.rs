//! Prometheus metrics infrastructure

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, response::IntoResponse, routing::get, Router};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

use super::config::MetricsConfig;
use crate::domain::Verdict;

const LOOKUP_DURATION: &str = "semantic_cache_lookup_duration_seconds";

/// Handle to the installed recorder, rendered by the scrape endpoint
#[derive(Clone)]
pub struct PrometheusMetrics {
    handle: Arc<PrometheusHandle>,
}

impl PrometheusMetrics {
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Install the global Prometheus recorder
///
/// Returns `None` when metrics are disabled or a recorder is already
/// installed; the cache keeps working either way.
pub fn init_metrics(config: &MetricsConfig) -> Option<PrometheusMetrics> {
    if !config.enabled {
        tracing::info!("Prometheus metrics disabled");
        return None;
    }

    let installed = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(LOOKUP_DURATION.to_string()),
            &config.lookup_buckets,
        )
        .and_then(|builder| builder.install_recorder());

    match installed {
        Ok(handle) => {
            gauge!("semantic_cache_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
            tracing::info!(path = %config.path, "Prometheus metrics initialized");

            Some(PrometheusMetrics {
                handle: Arc::new(handle),
            })
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize Prometheus metrics");
            None
        }
    }
}

/// Router serving the scrape endpoint at `path`
pub fn create_metrics_router(metrics: PrometheusMetrics, path: &str) -> Router {
    Router::new()
        .route(path, get(metrics_handler))
        .with_state(metrics)
}

async fn metrics_handler(State(metrics): State<PrometheusMetrics>) -> impl IntoResponse {
    metrics.render()
}

/// Record a completed cache lookup
pub fn record_lookup(verdict: Verdict, duration: Duration) {
    counter!("semantic_cache_lookups_total", "verdict" => verdict.as_str()).increment(1);
    histogram!(LOOKUP_DURATION).record(duration.as_secs_f64());
}

/// Record one call to an embedding backend
pub fn record_embedding_request(provider: &str, success: bool) {
    let labels = [
        ("provider", provider.to_string()),
        ("status", if success { "success" } else { "error" }.to_string()),
    ];

    counter!("embedding_requests_total", &labels).increment(1);
}

/// Record a refresh attempt
pub fn record_refresh(success: bool) {
    let status = if success { "success" } else { "error" };
    counter!("semantic_cache_refreshes_total", "status" => status).increment(1);
}

/// Publish the current number of stored records
pub fn set_record_count(records: usize) {
    gauge!("semantic_cache_records").set(records as f64);
}
