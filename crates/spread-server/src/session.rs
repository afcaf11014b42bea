//! Session proxy: the capability actors hold for a connected client.
//!
//! The transport owns the socket and its reader/writer tasks; everything
//! else sees a [`Session`] through `Weak` references and can only deliver
//! opaque payloads to it. Delivery is best-effort: a full queue or a gone
//! writer drops the payload without failing the caller.

use std::sync::{Arc, Mutex, OnceLock};

use tokio::sync::mpsc;

use crate::game::GameHandle;

/// One connected client, shared between its connection tasks and the
/// actors that broadcast to it.
pub struct Session {
    player_id: OnceLock<String>,
    outbound: mpsc::Sender<String>,
    /// Handle of the match this player is currently in, attached by the
    /// directory on game start and detached when the match ends.
    game: Mutex<Option<GameHandle>>,
}

impl Session {
    pub fn new(outbound: mpsc::Sender<String>) -> Arc<Self> {
        Arc::new(Self {
            player_id: OnceLock::new(),
            outbound,
            game: Mutex::new(None),
        })
    }

    /// Record the identity assigned at connect. Later calls are ignored.
    pub fn assign_player_id(&self, player_id: String) {
        let _ = self.player_id.set(player_id);
    }

    pub fn player_id(&self) -> &str {
        self.player_id.get().map(String::as_str).unwrap_or("")
    }

    /// Queue a payload for the writer task. Fire-and-forget: a slow or
    /// vanished client simply misses the message.
    pub fn deliver(&self, payload: String) {
        let _ = self.outbound.try_send(payload);
    }

    pub fn attach_game(&self, handle: GameHandle) {
        if let Ok(mut slot) = self.game.lock() {
            *slot = Some(handle);
        }
    }

    pub fn detach_game(&self) {
        if let Ok(mut slot) = self.game.lock() {
            *slot = None;
        }
    }

    pub fn current_game(&self) -> Option<GameHandle> {
        self.game.lock().ok().and_then(|slot| slot.clone())
    }
}
