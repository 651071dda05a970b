//! HTTP facade and process wiring for a store node.
//!
//! Provides REST endpoints for every client operation of one store,
//! with structured logging (tracing) and Prometheus metrics. Peer traffic
//! does not pass through here; it arrives on the node's UDP listener.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use domain::{AuditSink, FanoutAuditSink, MemoryAuditSink, TracingAuditSink};
use metrics_exporter_prometheus::PrometheusHandle;
use store::{NodeConfig, StoreNode};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use wire::PeerClient;

use routes::metrics::MetricsState;
pub use routes::store::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: AppState, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(MetricsState {
            handle: metrics_handle,
            node: state.node.clone(),
        });

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/items",
            post(routes::store::add_item).get(routes::store::list_items),
        )
        .route("/items/search", get(routes::store::find_item))
        .route("/items/{id}/remove", post(routes::store::remove_item))
        .route("/purchases", post(routes::store::purchase))
        .route("/returns", post(routes::store::return_item))
        .route("/exchanges", post(routes::store::exchange))
        .route("/waitlist", post(routes::store::join_waitlist))
        .route("/customers/{id}", get(routes::store::customer))
        .route("/sagas", get(routes::store::sagas))
        .route("/audit/{actor}", get(routes::store::audit))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Builds a node whose audit trail goes both to tracing and to an
/// in-memory log served on `/audit/{actor}`.
pub fn create_state(config: NodeConfig, peers: Arc<dyn PeerClient>) -> AppState {
    let audit = Arc::new(MemoryAuditSink::new());
    let sinks: Vec<Arc<dyn AuditSink>> = vec![
        Arc::new(TracingAuditSink) as Arc<dyn AuditSink>,
        audit.clone() as Arc<dyn AuditSink>,
    ];
    let node = StoreNode::new(config, peers).with_audit(Arc::new(FanoutAuditSink::new(sinks)));
    AppState {
        node: Arc::new(node),
        audit,
    }
}
