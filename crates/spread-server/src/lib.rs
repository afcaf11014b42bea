//! Spread Multiplayer Server
//!
//! Coordination layer for the chain-reaction territory game: one directory
//! actor owning the session registry and lobby catalog, one actor per
//! running match, and a WebSocket transport fanning JSON commands in and
//! events out.

pub mod config;
pub mod error;
pub mod game;
pub mod lobby;
pub mod protocol;
pub mod session;
pub mod transport;

pub use config::ServerConfig;
pub use error::ServerError;
pub use game::{GameActor, GameHandle};
pub use lobby::{LobbyCommand, LobbyHandle};
pub use protocol::{deserialize_command, serialize_event, ClientCommand, ServerEvent};
pub use session::Session;
