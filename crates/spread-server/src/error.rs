//! Error catalog for client-visible precondition failures.
//!
//! Every variant is a failed precondition of one requested operation, not a
//! corrupted-state signal: the boundary reports it to the originating
//! session as an `error{message}` event and the actor keeps processing its
//! queue.

use thiserror::Error;

use spread_core::GameError;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ServerError {
    #[error("Lobby not found")]
    LobbyNotFound,
    #[error("Player not found")]
    PlayerNotFound,
    #[error("Player is already in a lobby")]
    PlayerAlreadyInLobby,
    #[error("Player is not in a lobby")]
    PlayerNotInLobby,
    #[error("Player is not in a game")]
    PlayerNotInGame,
    #[error("Only the host can start the game")]
    NotLobbyHost,
    #[error("Not enough players to start the game")]
    NotEnoughPlayers,
    #[error("Lobby is full")]
    LobbyFull,
    #[error("Game has already started")]
    GameAlreadyStarted,
    #[error("Invalid move: out of bounds or not allowed")]
    InvalidMove,
    #[error("Invalid move: player is not alive")]
    PlayerNotAlive,
    #[error("Game is already over")]
    GameAlreadyOver,
}

impl From<GameError> for ServerError {
    fn from(err: GameError) -> Self {
        match err {
            GameError::InvalidMove => Self::InvalidMove,
            GameError::PlayerNotAlive => Self::PlayerNotAlive,
            GameError::GameAlreadyOver => Self::GameAlreadyOver,
        }
    }
}
