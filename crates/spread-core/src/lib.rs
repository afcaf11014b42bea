//! Deterministic chain-reaction board simulation.
//!
//! Pure state machine, no I/O and no concurrency: the server actors in
//! `spread-server` own an instance each and serialize access to it. Given
//! the same board size and move sequence, the engine always produces the
//! same field.

pub mod field;
pub mod game;

pub use field::{sides, Field};
pub use game::{Game, GameError};
