//! Per-match actor: owns one engine instance and serializes every mutation
//! against it.
//!
//! All mutating calls go through the mailbox one at a time. The actor never
//! calls back into the directory synchronously: end-of-match is posted as a
//! queued notification so neither mailbox can wait on the other.

use std::collections::HashMap;
use std::sync::Weak;

use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use spread_core::Game;
use spread_protocol::{Lobby, LobbyId, PlayerId};

use crate::error::ServerError;
use crate::lobby::LobbyHandle;
use crate::protocol::{serialize_event, ServerEvent};
use crate::session::Session;

const MAILBOX: usize = 64;

pub enum GameCommand {
    MakeMove {
        player_id: PlayerId,
        cell_id: usize,
        reply: oneshot::Sender<Result<(), ServerError>>,
    },
    /// Forced elimination on disconnect/leave. Best-effort: dropped when
    /// the match already ended.
    Eliminate { player_id: PlayerId },
    BroadcastState,
}

/// Cloneable mailbox handle for one running match.
#[derive(Clone)]
pub struct GameHandle {
    tx: mpsc::Sender<GameCommand>,
}

impl GameHandle {
    pub async fn make_move(&self, player_id: PlayerId, cell_id: usize) -> Result<(), ServerError> {
        let (reply, rx) = oneshot::channel();
        let command = GameCommand::MakeMove {
            player_id,
            cell_id,
            reply,
        };
        // A closed mailbox means the actor already tore itself down.
        if self.tx.send(command).await.is_err() {
            return Err(ServerError::GameAlreadyOver);
        }
        rx.await.unwrap_or(Err(ServerError::GameAlreadyOver))
    }

    /// Fire-and-forget; never blocks the caller's mailbox.
    pub fn eliminate(&self, player_id: PlayerId) {
        let _ = self.tx.try_send(GameCommand::Eliminate { player_id });
    }

    /// Fire-and-forget request for a full state broadcast.
    pub fn broadcast_state(&self) {
        let _ = self.tx.try_send(GameCommand::BroadcastState);
    }
}

/// The actor state behind a [`GameHandle`].
pub struct GameActor {
    rx: mpsc::Receiver<GameCommand>,
    lobby: LobbyHandle,
    /// Same id as the owning lobby.
    match_id: LobbyId,
    game: Game,
    /// External identity -> 1-based slot, snapshotted from the lobby's
    /// member list in join order.
    slots: HashMap<PlayerId, u8>,
    /// Slot - 1 -> external identity.
    players: Vec<PlayerId>,
    sessions: Vec<Weak<Session>>,
}

impl GameActor {
    /// Snapshot the lobby into a new match and spawn its actor task.
    pub fn spawn(lobby: LobbyHandle, record: &Lobby, sessions: Vec<Weak<Session>>) -> GameHandle {
        let (tx, rx) = mpsc::channel(MAILBOX);

        let mut slots = HashMap::new();
        for (index, player_id) in record.players.iter().enumerate() {
            slots.insert(player_id.clone(), index as u8 + 1);
        }

        let actor = Self {
            rx,
            lobby,
            match_id: record.id.clone(),
            game: Game::new(
                record.players.len(),
                record.options.width,
                record.options.height,
            ),
            slots,
            players: record.players.clone(),
            sessions,
        };
        tokio::spawn(actor.run());

        GameHandle { tx }
    }

    async fn run(mut self) {
        info!(
            "Match {} started with {} players",
            self.match_id,
            self.players.len()
        );
        while let Some(command) = self.rx.recv().await {
            let finished = match command {
                GameCommand::MakeMove {
                    player_id,
                    cell_id,
                    reply,
                } => {
                    let result = self.make_move(&player_id, cell_id);
                    let finished = result.is_ok() && self.game.is_over();
                    let _ = reply.send(result);
                    if finished {
                        self.end_match().await;
                    }
                    finished
                }
                GameCommand::Eliminate { player_id } => {
                    let finished = self.eliminate(&player_id);
                    if finished {
                        self.end_match().await;
                    }
                    finished
                }
                GameCommand::BroadcastState => {
                    self.broadcast_state();
                    false
                }
            };
            if finished {
                break;
            }
        }
    }

    fn make_move(&mut self, player_id: &str, cell_id: usize) -> Result<(), ServerError> {
        let Some(&slot) = self.slots.get(player_id) else {
            return Err(ServerError::PlayerNotInGame);
        };
        if !self.game.alive_players().contains(&slot) {
            return Err(ServerError::PlayerNotAlive);
        }
        if self.game.current_player() != Some(slot) {
            return Err(ServerError::InvalidMove);
        }

        self.game.make_move(cell_id)?;
        self.broadcast_state();
        Ok(())
    }

    /// Returns true when the elimination left the match decided.
    fn eliminate(&mut self, player_id: &str) -> bool {
        let Some(&slot) = self.slots.get(player_id) else {
            warn!(
                "Elimination for unknown player {} in match {}",
                player_id, self.match_id
            );
            return false;
        };
        self.game.eliminate_player(slot);
        self.broadcast_state();
        self.game.is_over()
    }

    async fn end_match(&mut self) {
        info!("Match {} finished", self.match_id);
        // Queued notification, never a nested request/response call: the
        // directory may be mid-operation on this very match.
        self.lobby.notify_game_ended(self.match_id.clone()).await;
        for session in self.sessions.iter().filter_map(Weak::upgrade) {
            session.detach_game();
        }
    }

    fn broadcast_state(&self) {
        let identity = |slot: u8| self.players[slot as usize - 1].clone();
        let event = ServerEvent::GameState {
            field: self.game.field().snapshot(),
            alive_players: self.game.alive_players().iter().copied().map(identity).collect(),
            current_player: self.game.current_player().map(identity),
            turn: self.game.turn(),
            move_history: self.game.move_history().to_vec(),
        };
        let Ok(payload) = serialize_event(&event) else {
            return;
        };
        for session in self.sessions.iter().filter_map(Weak::upgrade) {
            session.deliver(payload.clone());
        }
    }
}
