//! Metrics endpoint handler for Prometheus scraping.
//!
//! Each request triggers one synchronous collection pass over the process
//! table and renders the result in Prometheus text format. There is no
//! caching: every scrape sees a fresh enumeration.

use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{Encoder, TextEncoder};
use tracing::{debug, error};

use crate::state::SharedState;

/// Buffer capacity for metrics encoding.
const BUFFER_CAP: usize = 64 * 1024;

/// Error type for metrics endpoint failures.
#[derive(Debug)]
pub enum MetricsError {
    EncodingFailed,
}

impl IntoResponse for MetricsError {
    fn into_response(self) -> axum::response::Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to encode metrics",
        )
            .into_response()
    }
}

/// Handler for the /metrics endpoint.
pub async fn metrics_handler(State(state): State<SharedState>) -> Result<String, MetricsError> {
    let start = Instant::now();
    debug!("Processing /metrics request");

    // Reset before populating so processes that exited drop out
    state.metrics.reset();

    let samples = state.collector.collect();
    for sample in &samples {
        state.metrics.record(sample);
    }

    let families = state.registry.gather();
    let mut buffer = Vec::with_capacity(BUFFER_CAP);
    let encoder = TextEncoder::new();

    if encoder.encode(&families, &mut buffer).is_err() {
        error!("Failed to encode Prometheus metrics");
        return Err(MetricsError::EncodingFailed);
    }

    debug!(
        "Metrics request completed: {} processes, {} bytes, {:.3}ms",
        samples.len(),
        buffer.len(),
        start.elapsed().as_secs_f64() * 1000.0
    );

    String::from_utf8(buffer).map_err(|_| MetricsError::EncodingFailed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::get;
    use axum::Router;
    use http_body_util::BodyExt;
    use prometheus::Registry;
    use tower::ServiceExt;

    use crate::collector::ProcessCollector;
    use crate::metrics::ProcessMetrics;
    use crate::state::AppState;

    fn write_process(root: &Path, pid: u32, comm: &str, statm: &str) {
        let dir = root.join(pid.to_string());
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("comm"), format!("{comm}\n")).unwrap();
        fs::write(dir.join("statm"), statm).unwrap();
    }

    fn test_app(proc_root: &Path) -> Router {
        let registry = Registry::new();
        let metrics = ProcessMetrics::new(&registry).unwrap();
        let collector =
            ProcessCollector::with_parameters(proc_root, 100.0, 4096, Some(1 << 30));
        let state = Arc::new(AppState {
            registry,
            metrics,
            collector,
        });
        Router::new()
            .route("/metrics", get(metrics_handler))
            .with_state(state)
    }

    async fn scrape(app: Router) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_scrape_renders_collected_processes() {
        let dir = tempfile::tempdir().unwrap();
        write_process(dir.path(), 4242, "testproc", "4096 1024 100 10 0 500 0");

        let (status, body) = scrape(test_app(dir.path())).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("process_info{name=\"testproc\",pid=\"4242\"} 4242"));
        assert!(body.contains("process_memory_usage{name=\"testproc\",pid=\"4242\"}"));
        // first scrape has no CPU baseline yet
        assert!(!body.contains("process_cpu_usage{"));
    }

    #[tokio::test]
    async fn test_scrape_with_empty_process_table_returns_200() {
        let dir = tempfile::tempdir().unwrap();

        let (status, body) = scrape(test_app(dir.path())).await;
        assert_eq!(status, StatusCode::OK);
        assert!(!body.contains("process_info{"));
    }

    #[tokio::test]
    async fn test_exited_process_disappears_on_next_scrape() {
        let dir = tempfile::tempdir().unwrap();
        write_process(dir.path(), 4242, "shortlived", "4096 1024 0 0 0 0 0");

        let app = test_app(dir.path());
        let (_, body) = scrape(app.clone()).await;
        assert!(body.contains("shortlived"));

        fs::remove_dir_all(dir.path().join("4242")).unwrap();
        let (_, body) = scrape(app).await;
        assert!(!body.contains("shortlived"));
    }
}
