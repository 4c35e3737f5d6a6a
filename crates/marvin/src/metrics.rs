//! Prometheus counters for the HTTP surface

use axum::http::StatusCode;
use axum::response::IntoResponse;
use lazy_static::lazy_static;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounterVec, Registry, TextEncoder};
use std::sync::OnceLock;
use tracing::warn;

lazy_static! {
    static ref REGISTRY: Registry = Registry::new();
}

static REQ_COUNTER: OnceLock<IntCounterVec> = OnceLock::new();
static COMPLETION_LATENCY: OnceLock<Histogram> = OnceLock::new();

pub fn init_metrics() {
    if REQ_COUNTER.get().is_none() {
        match IntCounterVec::new(
            prometheus::opts!("requests_total", "Total requests per route"),
            &["route", "status"],
        ) {
            Ok(counter) => {
                REGISTRY.register(Box::new(counter.clone())).ok();
                let _ = REQ_COUNTER.set(counter);
            }
            Err(e) => warn!("Failed to create request counter: {}", e),
        }
    }

    if COMPLETION_LATENCY.get().is_none() {
        match Histogram::with_opts(HistogramOpts::new(
            "completion_latency_seconds",
            "Time spent waiting for the hosted model",
        )) {
            Ok(histogram) => {
                REGISTRY.register(Box::new(histogram.clone())).ok();
                let _ = COMPLETION_LATENCY.set(histogram);
            }
            Err(e) => warn!("Failed to create completion histogram: {}", e),
        }
    }
}

pub fn inc_request(route: &str, status: StatusCode) {
    if let Some(counter) = REQ_COUNTER.get() {
        counter.with_label_values(&[route, status.as_str()]).inc();
    }
}

pub fn observe_completion(seconds: f64) {
    if let Some(histogram) = COMPLETION_LATENCY.get() {
        histogram.observe(seconds);
    }
}

pub async fn get_metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!("Failed to encode metrics: {}", e);
        return (StatusCode::INTERNAL_SERVER_ERROR, [("content-type", "text/plain")], Vec::new());
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4")],
        buffer,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_request_counter_is_exported() {
        init_metrics();
        inc_request("/api/chat", StatusCode::OK);
        observe_completion(0.25);

        let response = get_metrics().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("requests_total"));
        assert!(text.contains("completion_latency_seconds"));
    }
}
