//! Directory actor: session registry, lobby catalog and match creation.
//!
//! One mailbox serializes every cross-connection mutation: connects,
//! disconnects, lobby CRUD and game start. Each live match gets its own
//! [`GameActor`]; the directory only ever posts fire-and-forget
//! notifications into it (and receives the same back), so the two mailboxes
//! cannot deadlock against each other.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use spread_protocol::{Lobby, LobbyId, LobbyOptions, LobbyStatus, PlayerId};

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::game::{GameActor, GameHandle};
use crate::protocol::{serialize_event, ServerEvent};
use crate::session::Session;

const MAILBOX: usize = 128;

pub enum LobbyCommand {
    Connect {
        session: Arc<Session>,
        reply: oneshot::Sender<PlayerId>,
    },
    Disconnect {
        player_id: PlayerId,
    },
    CreateLobby {
        player_id: PlayerId,
        options: LobbyOptions,
        reply: oneshot::Sender<Result<LobbyId, ServerError>>,
    },
    JoinLobby {
        lobby_id: LobbyId,
        player_id: PlayerId,
        reply: oneshot::Sender<Result<(), ServerError>>,
    },
    LeaveLobby {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<(), ServerError>>,
    },
    ListLobbies {
        reply: oneshot::Sender<Vec<Lobby>>,
    },
    StartGame {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<(), ServerError>>,
    },
    /// Posted by a GameActor when its match ends.
    EndGame {
        lobby_id: LobbyId,
    },
}

/// Cloneable mailbox handle for the directory actor.
#[derive(Clone)]
pub struct LobbyHandle {
    tx: mpsc::Sender<LobbyCommand>,
}

impl LobbyHandle {
    /// Spawn the directory actor and return its handle.
    pub fn spawn(config: ServerConfig) -> Self {
        let (tx, rx) = mpsc::channel(MAILBOX);
        let handle = Self { tx };
        tokio::spawn(LobbyActor::new(rx, handle.clone(), config).run());
        handle
    }

    pub async fn connect(&self, session: Arc<Session>) -> PlayerId {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(LobbyCommand::Connect { session, reply })
            .await
            .expect("lobby directory gone");
        rx.await.expect("lobby directory gone")
    }

    pub async fn disconnect(&self, player_id: PlayerId) {
        let _ = self.tx.send(LobbyCommand::Disconnect { player_id }).await;
    }

    pub async fn create_lobby(
        &self,
        player_id: PlayerId,
        options: LobbyOptions,
    ) -> Result<LobbyId, ServerError> {
        self.request(|reply| LobbyCommand::CreateLobby {
            player_id,
            options,
            reply,
        })
        .await
    }

    pub async fn join_lobby(
        &self,
        lobby_id: LobbyId,
        player_id: PlayerId,
    ) -> Result<(), ServerError> {
        self.request(|reply| LobbyCommand::JoinLobby {
            lobby_id,
            player_id,
            reply,
        })
        .await
    }

    pub async fn leave_lobby(&self, player_id: PlayerId) -> Result<(), ServerError> {
        self.request(|reply| LobbyCommand::LeaveLobby { player_id, reply })
            .await
    }

    pub async fn list_lobbies(&self) -> Vec<Lobby> {
        self.request(|reply| LobbyCommand::ListLobbies { reply })
            .await
    }

    pub async fn start_game(&self, player_id: PlayerId) -> Result<(), ServerError> {
        self.request(|reply| LobbyCommand::StartGame { player_id, reply })
            .await
    }

    /// Queued end-of-match notification from a GameActor; no reply is ever
    /// awaited on this path.
    pub async fn notify_game_ended(&self, lobby_id: LobbyId) {
        let _ = self.tx.send(LobbyCommand::EndGame { lobby_id }).await;
    }

    async fn request<R>(&self, build: impl FnOnce(oneshot::Sender<R>) -> LobbyCommand) -> R {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(build(reply))
            .await
            .expect("lobby directory gone");
        rx.await.expect("lobby directory gone")
    }
}

/// The actor state behind [`LobbyHandle`].
struct LobbyActor {
    rx: mpsc::Receiver<LobbyCommand>,
    /// Our own handle, passed to spawned GameActors for end-of-match
    /// notifications.
    handle: LobbyHandle,
    config: ServerConfig,
    /// player id -> session proxy; entries go stale when the transport
    /// disappears and are skipped on broadcast.
    sessions: HashMap<PlayerId, Weak<Session>>,
    lobbies: HashMap<LobbyId, Lobby>,
    /// player id -> lobby id; a player is in at most one lobby.
    membership: HashMap<PlayerId, LobbyId>,
    /// lobby id -> running match.
    games: HashMap<LobbyId, GameHandle>,
    lobby_counter: u64,
    player_counter: u64,
}

impl LobbyActor {
    fn new(rx: mpsc::Receiver<LobbyCommand>, handle: LobbyHandle, config: ServerConfig) -> Self {
        Self {
            rx,
            handle,
            config,
            sessions: HashMap::new(),
            lobbies: HashMap::new(),
            membership: HashMap::new(),
            games: HashMap::new(),
            lobby_counter: 1,
            player_counter: 1,
        }
    }

    async fn run(mut self) {
        while let Some(command) = self.rx.recv().await {
            self.handle_command(command);
        }
    }

    fn handle_command(&mut self, command: LobbyCommand) {
        match command {
            LobbyCommand::Connect { session, reply } => {
                let _ = reply.send(self.connect(session));
            }
            LobbyCommand::Disconnect { player_id } => self.disconnect(&player_id),
            LobbyCommand::CreateLobby {
                player_id,
                options,
                reply,
            } => {
                let _ = reply.send(self.create_lobby(player_id, options));
            }
            LobbyCommand::JoinLobby {
                lobby_id,
                player_id,
                reply,
            } => {
                let _ = reply.send(self.join_lobby(lobby_id, player_id));
            }
            LobbyCommand::LeaveLobby { player_id, reply } => {
                let _ = reply.send(self.leave_lobby(&player_id));
            }
            LobbyCommand::ListLobbies { reply } => {
                let _ = reply.send(self.lobbies.values().cloned().collect());
            }
            LobbyCommand::StartGame { player_id, reply } => {
                let _ = reply.send(self.start_game(&player_id));
            }
            LobbyCommand::EndGame { lobby_id } => self.end_game(&lobby_id),
        }
    }

    fn connect(&mut self, session: Arc<Session>) -> PlayerId {
        let player_id = format!("p{}", self.player_counter);
        self.player_counter += 1;
        session.assign_player_id(player_id.clone());
        self.sessions
            .insert(player_id.clone(), Arc::downgrade(&session));
        info!("Player {} connected", player_id);
        player_id
    }

    fn disconnect(&mut self, player_id: &str) {
        info!("Player {} disconnected", player_id);
        self.sessions.remove(player_id);
        match self.leave_lobby(player_id) {
            Ok(()) | Err(ServerError::PlayerNotInLobby) => {}
            Err(err) => warn!("Cleanup after {} failed: {}", player_id, err),
        }
    }

    fn create_lobby(
        &mut self,
        player_id: PlayerId,
        options: LobbyOptions,
    ) -> Result<LobbyId, ServerError> {
        if self.membership.contains_key(&player_id) {
            return Err(ServerError::PlayerAlreadyInLobby);
        }

        let options = self.config.clamp_options(options);
        let lobby_id = format!("l{}", self.lobby_counter);
        self.lobby_counter += 1;

        let lobby = Lobby {
            id: lobby_id.clone(),
            host_player_id: player_id.clone(),
            players: vec![player_id.clone()],
            options,
            status: LobbyStatus::Open,
        };
        info!("Player {} created lobby {}", player_id, lobby_id);
        self.membership.insert(player_id, lobby_id.clone());
        self.lobbies.insert(lobby_id.clone(), lobby.clone());
        self.send_to_all(&ServerEvent::LobbyCreated { lobby });
        Ok(lobby_id)
    }

    fn join_lobby(&mut self, lobby_id: LobbyId, player_id: PlayerId) -> Result<(), ServerError> {
        if !self.lobbies.contains_key(&lobby_id) {
            return Err(ServerError::LobbyNotFound);
        }
        if self.membership.contains_key(&player_id) {
            return Err(ServerError::PlayerAlreadyInLobby);
        }

        let snapshot = {
            let lobby = self.lobbies.get_mut(&lobby_id).ok_or(ServerError::LobbyNotFound)?;
            if lobby.status != LobbyStatus::Open {
                return Err(ServerError::GameAlreadyStarted);
            }
            if lobby.players.len() >= lobby.options.max_players as usize {
                return Err(ServerError::LobbyFull);
            }
            lobby.players.push(player_id.clone());
            lobby.clone()
        };
        info!("Player {} joined lobby {}", player_id, lobby_id);
        self.membership.insert(player_id, lobby_id);
        self.send_to_all(&ServerEvent::LobbyUpdate { lobby: snapshot });
        Ok(())
    }

    fn leave_lobby(&mut self, player_id: &str) -> Result<(), ServerError> {
        let lobby_id = self
            .membership
            .remove(player_id)
            .ok_or(ServerError::PlayerNotInLobby)?;
        let Some(lobby) = self.lobbies.get_mut(&lobby_id) else {
            return Err(ServerError::LobbyNotFound);
        };

        // Best-effort: skipped when the match already tore itself down.
        if lobby.status == LobbyStatus::InProgress {
            if let Some(game) = self.games.get(&lobby_id) {
                game.eliminate(player_id.to_string());
            }
        }

        lobby.players.retain(|p| p != player_id);
        info!("Player {} left lobby {}", player_id, lobby_id);

        if lobby.players.is_empty() {
            self.lobbies.remove(&lobby_id);
            self.send_to_all(&ServerEvent::LobbyGone { lobby_id });
            return Ok(());
        }

        if lobby.host_player_id == player_id {
            lobby.host_player_id = lobby.players[0].clone();
        }
        let snapshot = lobby.clone();
        self.send_to_all(&ServerEvent::LobbyUpdate { lobby: snapshot });
        Ok(())
    }

    fn start_game(&mut self, player_id: &str) -> Result<(), ServerError> {
        let lobby_id = self
            .membership
            .get(player_id)
            .cloned()
            .ok_or(ServerError::PlayerNotInLobby)?;
        let snapshot = {
            let lobby = self.lobbies.get_mut(&lobby_id).ok_or(ServerError::LobbyNotFound)?;
            if lobby.host_player_id != player_id {
                return Err(ServerError::NotLobbyHost);
            }
            if lobby.players.len() < 2 {
                return Err(ServerError::NotEnoughPlayers);
            }
            if lobby.status != LobbyStatus::Open {
                return Err(ServerError::GameAlreadyStarted);
            }
            lobby.status = LobbyStatus::InProgress;
            lobby.clone()
        };

        // Snapshot the member sessions in join order; a member whose
        // transport is already gone just yields a stale handle.
        let participants: Vec<Weak<Session>> = snapshot
            .players
            .iter()
            .map(|member| self.sessions.get(member).cloned().unwrap_or_else(Weak::new))
            .collect();

        let game = GameActor::spawn(self.handle.clone(), &snapshot, participants.clone());
        for session in participants.iter().filter_map(Weak::upgrade) {
            session.attach_game(game.clone());
        }
        self.games.insert(lobby_id.clone(), game.clone());

        info!(
            "Lobby {} started a match with {} players",
            lobby_id,
            snapshot.players.len()
        );
        self.send_to_all(&ServerEvent::LobbyUpdate { lobby: snapshot });
        game.broadcast_state();
        Ok(())
    }

    fn end_game(&mut self, lobby_id: &str) {
        self.games.remove(lobby_id);
        let Some(lobby) = self.lobbies.get_mut(lobby_id) else {
            // The lobby emptied out before the match wound down.
            return;
        };
        lobby.status = LobbyStatus::Finished;
        let snapshot = lobby.clone();
        info!("Lobby {} finished its match", lobby_id);
        self.send_to_all(&ServerEvent::LobbyUpdate { lobby: snapshot });
    }

    fn send_to_all(&self, event: &ServerEvent) {
        let Ok(payload) = serialize_event(event) else {
            return;
        };
        debug!("Broadcasting to {} sessions", self.sessions.len());
        for session in self.sessions.values().filter_map(Weak::upgrade) {
            session.deliver(payload.clone());
        }
    }
}
