//! Prometheus metrics endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;
use store::StoreNode;

/// State of the metrics route: the exporter handle and the node whose
/// gauges are sampled on each scrape.
#[derive(Clone)]
pub struct MetricsState {
    pub handle: PrometheusHandle,
    pub node: Arc<StoreNode>,
}

/// GET /metrics: Prometheus text exposition.
pub async fn get(State(state): State<MetricsState>) -> impl IntoResponse {
    metrics::gauge!("store_pending_reservations").set(state.node.pending_reservations() as f64);
    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.handle.render(),
    )
}
