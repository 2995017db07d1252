//! Process entry point: load configuration, construct the long-lived
//! components, bind the HTTP listener, and serve until shutdown.

use processor_gateway::config::GatewayConfig;
use processor_gateway::ingress;
use processor_gateway::store::{CoordinationStore, RedisStore};
use processor_gateway::GatewayApp;
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = GatewayConfig::from_env().expect("invalid gateway configuration");

    let store: Arc<dyn CoordinationStore> = Arc::new(
        RedisStore::connect(&config.store_connection_string)
            .await
            .expect("failed to connect to coordination store"),
    );

    let app = GatewayApp::build(&config, store).expect("failed to construct upstream HTTP clients");

    let addr = std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = TcpListener::bind(&addr).await.expect("failed to bind listener");

    tracing::info!(%addr, "processor-gateway listening");

    axum::serve(listener, ingress::router(app).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

/// Waits for SIGINT or SIGTERM. In-flight requests are allowed to finish;
/// no new connections are accepted after this resolves.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received, draining in-flight requests");
}
