//! Shared wire-level records for the Spread server.
//!
//! Everything here is plain data: board cells, moves, lobby records and the
//! JSON helpers that put them on the wire. The simulation lives in
//! `spread-core`, the actors in `spread-server`.

pub mod lobby;
pub mod types;
pub mod wire;

pub use lobby::{Lobby, LobbyOptions, LobbyStatus};
pub use types::{Cell, FieldSnapshot, LobbyId, Move, PlayerId};
pub use wire::WireError;
