//! Spread Multiplayer Server
//!
//! Authoritative backend for the realtime territory-spread game: clients
//! connect over WebSocket, coordinate in lobbies and exchange turn-based
//! moves until one player remains.

use tokio::net::TcpListener;
use tracing::info;

use spread_server::{config::ServerConfig, lobby::LobbyHandle, transport};

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter("spread_server=info")
        .init();

    let mut config = ServerConfig::default();
    if let Some(port) = std::env::args().nth(1) {
        match port.parse::<u16>() {
            Ok(port) => config.bind_address.set_port(port),
            Err(_) => {
                tracing::error!("Invalid port argument: {}", port);
                std::process::exit(1);
            }
        }
    }

    let listener = match TcpListener::bind(config.bind_address).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("Failed to bind {}: {}", config.bind_address, err);
            std::process::exit(1);
        }
    };

    info!("Spread Server v{}", env!("CARGO_PKG_VERSION"));
    info!("Listening on {}", config.bind_address);

    let lobby = LobbyHandle::spawn(config.clone());
    transport::run(listener, lobby, config).await;
}
