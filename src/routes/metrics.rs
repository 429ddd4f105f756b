use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Install the global Prometheus recorder and describe the booth's metrics.
pub fn install_recorder() -> Result<Arc<PrometheusHandle>, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    metrics::describe_counter!("swap_jobs_submitted_total", "Face swap jobs accepted");
    metrics::describe_counter!(
        "swap_jobs_succeeded_total",
        "Face swap jobs that returned a result URL"
    );
    metrics::describe_counter!(
        "swap_jobs_failed_total",
        "Face swap jobs that failed or were canceled upstream"
    );
    metrics::describe_counter!(
        "swap_jobs_result_missing_total",
        "Face swap jobs that succeeded without a usable output URL"
    );
    metrics::describe_counter!(
        "swap_cleanup_failures_total",
        "Temporary image deletions that failed"
    );
    metrics::describe_gauge!("swap_active_jobs", "Face swap jobs currently tracked");

    Ok(Arc::new(handle))
}

/// GET /metrics — Prometheus text exposition.
pub async fn prometheus_metrics(State(handle): State<Arc<PrometheusHandle>>) -> impl IntoResponse {
    handle.render()
}
