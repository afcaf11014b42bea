//! Server configuration

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

/// Server configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind the server
    pub bind_address: SocketAddr,
    /// Per-connection outbound queue length; slow clients lose broadcasts
    /// past this point
    pub outbound_queue: usize,
    /// Smallest lobby size a creator may request
    pub min_players: u8,
    /// Largest lobby size a creator may request
    pub max_players: u8,
    /// Smallest board dimension a creator may request
    pub min_board: u8,
    /// Largest board dimension a creator may request
    pub max_board: u8,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".parse().unwrap(),
            outbound_queue: 256,
            min_players: 2,
            max_players: 8,
            min_board: 2,
            max_board: 32,
        }
    }
}

impl ServerConfig {
    /// Clamp requested lobby options into the configured bounds.
    pub fn clamp_options(
        &self,
        options: spread_protocol::LobbyOptions,
    ) -> spread_protocol::LobbyOptions {
        spread_protocol::LobbyOptions {
            name: options.name,
            max_players: options.max_players.clamp(self.min_players, self.max_players),
            width: options.width.clamp(self.min_board, self.max_board),
            height: options.height.clamp(self.min_board, self.max_board),
        }
    }
}
