//! Presence Hub - Binary Entry Point
//!
//! Loads configuration from the environment and serves the WebSocket, player
//! and internal HTTP endpoints until Ctrl-C or SIGTERM.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use presence_hub::api::{create_router, AppState};
use presence_hub::config::ServerConfig;
use presence_hub::presence::ConnectionRegistry;
use presence_hub::social::SocialGraph;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "presence_hub=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Presence Hub v{}", presence_hub::VERSION);

    let config = ServerConfig::from_env().context("invalid configuration")?;
    tracing::info!(
        host = %config.host,
        port = config.port,
        social_graph = ?config.social_graph_file,
        idle_timeout = ?config.idle_timeout,
        "Configuration loaded"
    );

    let social = Arc::new(match &config.social_graph_file {
        Some(path) => SocialGraph::from_file(path)
            .with_context(|| format!("failed to load social graph from {}", path.display()))?,
        None => {
            tracing::warn!("SOCIAL_GRAPH_FILE not set, starting with an empty social graph");
            SocialGraph::new()
        }
    });

    let registry = ConnectionRegistry::new(social.clone());
    let state = Arc::new(AppState::from_config(registry, social, &config));
    let app = create_router(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("Presence Hub listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Presence Hub stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutting down Presence Hub...");
}
