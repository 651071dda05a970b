//! Store node entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use wire::{UdpListener, UdpPeerClient};

/// How often idle exchange reservations are swept.
const SWEEP_INTERVAL: Duration = Duration::from_secs(5);

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

#[tokio::main]
async fn main() {
    // 1. Load configuration
    let config = api::config::Config::from_env().expect("invalid configuration");

    // 2. Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 3. Install Prometheus metrics recorder
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 4. Create the store node
    let node_config = config.node_config();
    let udp_addr = node_config
        .listen_addr()
        .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 0)));
    let peers = Arc::new(UdpPeerClient::new(
        node_config.peers.clone(),
        node_config.peer_timeout,
    ));
    let state = api::create_state(node_config, peers);
    if config.seed_sample_data {
        state
            .node
            .seed_sample_inventory()
            .expect("failed to seed sample inventory");
    }

    // 5. Start the peer listener and reservation sweeper
    let listener = UdpListener::bind(udp_addr)
        .await
        .expect("failed to bind peer socket");
    let udp_addr = listener.local_addr().unwrap_or(udp_addr);
    tracing::info!(store = %config.store_code, %udp_addr, "peer listener started");
    let peer_server = tokio::spawn(listener.serve(state.node.clone()));
    let sweeper = state.node.spawn_reservation_sweeper(SWEEP_INTERVAL);

    // 6. Build the application
    let app = api::create_app(state, metrics_handle);

    // 7. Start server
    let addr = config.addr();
    tracing::info!(store = %config.store_code, %addr, "starting HTTP server");

    let http_listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(http_listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    sweeper.abort();
    peer_server.abort();
    tracing::info!("server shut down gracefully");
}
