use thiserror::Error;

use crate::{FieldSnapshot, Lobby, Move};

#[derive(Debug, Error)]
pub enum WireError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn serialize_field_json(field: &FieldSnapshot) -> Result<String, WireError> {
    Ok(serde_json::to_string(field)?)
}

pub fn deserialize_field_json(json: &str) -> Result<FieldSnapshot, WireError> {
    Ok(serde_json::from_str(json)?)
}

pub fn serialize_lobby_json(lobby: &Lobby) -> Result<String, WireError> {
    Ok(serde_json::to_string(lobby)?)
}

pub fn deserialize_lobby_json(json: &str) -> Result<Lobby, WireError> {
    Ok(serde_json::from_str(json)?)
}

pub fn serialize_moves_json(moves: &[Move]) -> Result<String, WireError> {
    Ok(serde_json::to_string(moves)?)
}

pub fn deserialize_moves_json(json: &str) -> Result<Vec<Move>, WireError> {
    Ok(serde_json::from_str(json)?)
}
