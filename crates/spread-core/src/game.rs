//! Turn cycling, elimination and full-move resolution on top of [`Field`].

use thiserror::Error;

use spread_protocol::Move;

use crate::field::Field;

/// Engine-level precondition failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("Invalid move: out of bounds or not allowed")]
    InvalidMove,
    #[error("Invalid move: player is not alive")]
    PlayerNotAlive,
    #[error("Game is already over")]
    GameAlreadyOver,
}

/// One running match: a field, the move log and the cyclic list of alive
/// player slots.
///
/// Slots are 1-based in original join order. The alive list is an ordered
/// array plus a current index with wraparound; removal keeps the index on
/// the same slot, or moves it to the next remaining one when the removed
/// slot was current.
#[derive(Clone, Debug)]
pub struct Game {
    field: Field,
    move_history: Vec<Move>,
    alive_players: Vec<u8>,
    current: usize,
    turn_count: usize,
    initial_players: usize,
}

impl Game {
    pub fn new(player_count: usize, width: u8, height: u8) -> Self {
        Self {
            field: Field::new(player_count, width, height),
            move_history: Vec::new(),
            alive_players: (1..=player_count as u8).collect(),
            current: 0,
            turn_count: 0,
            initial_players: player_count,
        }
    }

    /// The slot whose turn it is, while anyone is alive.
    pub fn current_player(&self) -> Option<u8> {
        self.alive_players.get(self.current).copied()
    }

    pub fn turn(&self) -> usize {
        self.turn_count
    }

    pub fn move_history(&self) -> &[Move] {
        &self.move_history
    }

    pub fn alive_players(&self) -> &[u8] {
        &self.alive_players
    }

    pub fn field(&self) -> &Field {
        &self.field
    }

    pub fn is_over(&self) -> bool {
        self.alive_players.len() <= 1
    }

    /// Apply one move for the current player: place the dot, resolve the
    /// entire chain reaction synchronously, recompute aliveness, advance
    /// the turn.
    pub fn make_move(&mut self, cell_id: usize) -> Result<(), GameError> {
        if self.is_over() {
            return Err(GameError::GameAlreadyOver);
        }

        let player = self.alive_players[self.current];
        if !self.field.place_dot(player, cell_id) {
            return Err(GameError::InvalidMove);
        }
        self.move_history.push(Move {
            player_index: player,
            cell_id,
        });

        // A fully-conquered board can cycle dots between cells forever, so
        // the drain stops once only one player holds any score; at that
        // point the outcome cannot change.
        while self.field.spread_step() != 0 {
            if self.single_owner() {
                break;
            }
        }

        self.update_aliveness();
        self.next_turn();
        Ok(())
    }

    /// Advance to the next alive slot, wrapping, and count the turn.
    pub fn next_turn(&mut self) {
        if self.alive_players.is_empty() {
            return;
        }
        self.current = (self.current + 1) % self.alive_players.len();
        self.turn_count += 1;
    }

    /// Forced elimination (disconnects): zero the slot's score and drop it
    /// from the alive list. No-op when the slot is not alive. Owned cells
    /// are left as they are.
    pub fn eliminate_player(&mut self, slot: u8) {
        let Some(position) = self.alive_players.iter().position(|&p| p == slot) else {
            return;
        };
        self.field.reset_score(slot);
        self.alive_players.remove(position);
        self.fix_current_after_removal(position);
    }

    /// Score-based elimination, applied only once every starting player has
    /// had at least one turn.
    fn update_aliveness(&mut self) {
        if self.turn_count < self.initial_players {
            return;
        }

        let mut index = 0;
        while index < self.alive_players.len() {
            let slot = self.alive_players[index];
            if self.field.scores()[slot as usize] == 0 {
                self.alive_players.remove(index);
                self.fix_current_after_removal(index);
            } else {
                index += 1;
            }
        }
    }

    fn fix_current_after_removal(&mut self, removed: usize) {
        if removed < self.current {
            self.current -= 1;
        } else if removed == self.current && self.current >= self.alive_players.len() {
            self.current = 0;
        }
    }

    fn single_owner(&self) -> bool {
        self.field
            .scores()
            .iter()
            .skip(1)
            .filter(|&&score| score > 0)
            .count()
            <= 1
    }
}
