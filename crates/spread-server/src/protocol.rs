//! Client/server message envelopes.
//!
//! One JSON object per command or event, discriminated by a `type` field in
//! snake_case. Extends the shared records in `spread-protocol` with the
//! server's own envelope enums.

use serde::{Deserialize, Serialize};

use spread_protocol::{FieldSnapshot, Lobby, LobbyId, Move, PlayerId};

/// Client-to-server commands
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    /// Liveness probe
    Ping,
    /// Request a snapshot of the lobby catalog
    ListLobbies,
    /// Create a lobby and become its host
    CreateLobby {
        name: String,
        #[serde(default = "default_max_players")]
        max_players: u8,
        /// `[width, height]`
        #[serde(default = "default_board_size")]
        board_size: [u8; 2],
    },
    /// Join an open lobby
    JoinLobby { lobby_id: LobbyId },
    /// Leave the current lobby
    LeaveLobby,
    /// Start the match (host only)
    StartGame,
    /// Place a dot in the current match
    MakeMove { cell_id: usize },
}

fn default_max_players() -> u8 {
    4
}

fn default_board_size() -> [u8; 2] {
    [8, 8]
}

/// Server-to-client events
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Greeting sent once the connection is registered
    ServerReady { player_id: PlayerId, message: String },
    /// A lobby appeared (broadcast to everyone connected)
    LobbyCreated { lobby: Lobby },
    /// A lobby's members, host or status changed
    LobbyUpdate { lobby: Lobby },
    /// A lobby emptied out and was deleted
    LobbyGone { lobby_id: LobbyId },
    /// Reply to create/join: the sender is now a member
    Joined { lobby_id: LobbyId },
    /// Reply to leave
    Left,
    /// Reply to ping
    Pong,
    /// Reply to list_lobbies
    LobbyList { lobbies: Vec<Lobby> },
    /// A request failed; the connection stays open
    Error { message: String },
    /// Full match state, broadcast to every participant after each change
    GameState {
        field: FieldSnapshot,
        /// External ids of the slots still alive, in slot order
        alive_players: Vec<PlayerId>,
        /// Identity of the slot whose turn it is
        current_player: Option<PlayerId>,
        turn: usize,
        move_history: Vec<Move>,
    },
}

/// Serialize a server event for network transmission
pub fn serialize_event(event: &ServerEvent) -> Result<String, serde_json::Error> {
    serde_json::to_string(event)
}

/// Deserialize a client command from a text frame
pub fn deserialize_command(data: &str) -> Result<ClientCommand, serde_json::Error> {
    serde_json::from_str(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use spread_protocol::{LobbyOptions, LobbyStatus};

    #[test]
    fn commands_are_tagged_snake_case() {
        let cmd = deserialize_command(r#"{"type":"join_lobby","lobby_id":"l7"}"#).unwrap();
        match cmd {
            ClientCommand::JoinLobby { lobby_id } => assert_eq!(lobby_id, "l7"),
            other => panic!("wrong command: {other:?}"),
        }

        assert!(matches!(
            deserialize_command(r#"{"type":"ping"}"#).unwrap(),
            ClientCommand::Ping
        ));
    }

    #[test]
    fn create_lobby_fills_in_defaults() {
        let cmd = deserialize_command(r#"{"type":"create_lobby","name":"room"}"#).unwrap();
        match cmd {
            ClientCommand::CreateLobby {
                name,
                max_players,
                board_size,
            } => {
                assert_eq!(name, "room");
                assert_eq!(max_players, 4);
                assert_eq!(board_size, [8, 8]);
            }
            other => panic!("wrong command: {other:?}"),
        }
    }

    #[test]
    fn unknown_command_type_fails_to_parse() {
        assert!(deserialize_command(r#"{"type":"teleport"}"#).is_err());
        assert!(deserialize_command("not json").is_err());
    }

    #[test]
    fn events_roundtrip() {
        let event = ServerEvent::LobbyCreated {
            lobby: Lobby {
                id: "l1".into(),
                host_player_id: "p1".into(),
                players: vec!["p1".into()],
                options: LobbyOptions {
                    name: "first".into(),
                    max_players: 4,
                    width: 8,
                    height: 8,
                },
                status: LobbyStatus::Open,
            },
        };
        let json = serialize_event(&event).unwrap();
        assert!(json.contains(r#""type":"lobby_created""#));

        let decoded: ServerEvent = serde_json::from_str(&json).unwrap();
        match decoded {
            ServerEvent::LobbyCreated { lobby } => assert_eq!(lobby.id, "l1"),
            other => panic!("wrong event: {other:?}"),
        }
    }

    #[test]
    fn game_state_event_carries_the_wire_records() {
        let event = ServerEvent::GameState {
            field: FieldSnapshot {
                width: 2,
                height: 2,
                cells: Vec::new(),
                scores: vec![0, 1, 0],
            },
            alive_players: vec!["p1".into(), "p2".into()],
            current_player: Some("p2".into()),
            turn: 3,
            move_history: vec![Move {
                player_index: 1,
                cell_id: 0,
            }],
        };
        let json = serialize_event(&event).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "game_state");
        assert_eq!(value["current_player"], "p2");
        assert_eq!(value["turn"], 3);
        assert_eq!(value["move_history"][0]["player_index"], 1);
        assert_eq!(value["field"]["scores"][1], 1);
    }
}
