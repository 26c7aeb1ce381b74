use axum::{http::StatusCode, response::IntoResponse};
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::{sync::OnceLock, time::Duration};

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub fn init_metrics() {
    if PROMETHEUS_HANDLE.get().is_some() {
        return;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            let _ = PROMETHEUS_HANDLE.set(handle);

            // Register series up front so a fresh scrape is never empty
            counter!("rdap_requests_total", "tld" => "unknown").absolute(0);
            counter!("rdap_cache_hits_total").absolute(0);
            counter!("rdap_cache_misses_total").absolute(0);
            counter!("rdap_errors_total", "error_type" => "unknown").absolute(0);
            histogram!("rdap_request_duration_seconds").record(0.0);
        }
        Err(e) => {
            tracing::error!("Failed to install metrics recorder: {}", e);
        }
    }
}

pub fn increment_requests(domain: &str) {
    counter!("rdap_requests_total", "tld" => tld_label(domain)).increment(1);
}

pub fn increment_cache_hits() {
    counter!("rdap_cache_hits_total").increment(1);
}

pub fn increment_cache_misses() {
    counter!("rdap_cache_misses_total").increment(1);
}

pub fn increment_errors(error_type: &'static str) {
    counter!("rdap_errors_total", "error_type" => error_type).increment(1);
}

pub fn record_query_time(elapsed: Duration) {
    histogram!("rdap_request_duration_seconds").record(elapsed.as_secs_f64());
}

pub async fn metrics_handler() -> impl IntoResponse {
    match PROMETHEUS_HANDLE.get() {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "Metrics not initialized".to_string(),
        ),
    }
}

fn tld_label(domain: &str) -> String {
    crate::resolver::extract_tld(domain).unwrap_or_else(|_| "unknown".to_string())
}
