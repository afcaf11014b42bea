use serde::{Deserialize, Serialize};

use crate::{LobbyId, PlayerId};

/// Client-chosen lobby settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyOptions {
    pub name: String,
    pub max_players: u8,
    /// Board width in cells.
    pub width: u8,
    /// Board height in cells.
    pub height: u8,
}

/// Lobby lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LobbyStatus {
    Open,
    InProgress,
    Finished,
}

/// A pre-match room as seen on the wire.
///
/// While a lobby exists its member list is non-empty and the host is always
/// a current member; the directory actor maintains both.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lobby {
    pub id: LobbyId,
    pub host_player_id: PlayerId,
    /// Members in join order.
    pub players: Vec<PlayerId>,
    pub options: LobbyOptions,
    pub status: LobbyStatus,
}
