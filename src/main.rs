use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use pong_arena_server::config::ServerConfig;
use pong_arena_server::lobby::manager::spawn_lobby;
use pong_arena_server::metrics::{self, Metrics};
use pong_arena_server::net::broadcast::ConnectionBroadcaster;
use pong_arena_server::net::transport::WebTransportServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    info!("Pong Arena Server v{}", env!("CARGO_PKG_VERSION"));

    let config = ServerConfig::load_or_default();
    config.validate().map_err(anyhow::Error::msg)?;
    info!(
        "Configuration loaded: {}:{}, max_rooms={}",
        config.bind_address, config.port, config.max_rooms
    );

    let metrics = Arc::new(Metrics::new());

    if config.metrics_enabled() {
        let metrics_clone = metrics.clone();
        let bind_address = config.bind_address.to_string();
        let metrics_port = config.metrics_port;
        tokio::spawn(async move {
            if let Err(e) = metrics::start_metrics_server(metrics_clone, bind_address, metrics_port).await {
                error!("Metrics server error: {}", e);
            }
        });
    }

    let broadcaster = Arc::new(ConnectionBroadcaster::new(metrics.clone()));
    let (lobby, lobby_task) = spawn_lobby(config.max_rooms, broadcaster.clone(), metrics.clone());

    let server = WebTransportServer::new(config.clone(), lobby.clone(), broadcaster, metrics).await?;

    info!("Server ready on https://{}", server.bind_addr());
    info!(
        "Chrome flag: --ignore-certificate-errors-spki-list={}",
        server.cert_hash()
    );

    let shutdown = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received"),
            Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
        }
    };

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Server error: {}", e);
            }
        }
        _ = shutdown => {
            info!("Shutting down...");
        }
    }

    lobby.shutdown();
    if let Err(e) = lobby_task.await {
        error!("Lobby task failed: {}", e);
    }
    info!("Server stopped");

    Ok(())
}
