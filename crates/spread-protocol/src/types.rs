use serde::{Deserialize, Serialize};

/// External player identity, assigned at connect (`p1`, `p2`, ...).
///
/// Distinct from the 1-based slot a player occupies inside a match; the
/// slot is what `Cell::owner_index` and `Move::player_index` refer to.
pub type PlayerId = String;

/// Lobby identity, assigned at creation (`l1`, `l2`, ...).
pub type LobbyId = String;

/// One board square.
///
/// `configuration` is the bitmask of in-bounds neighbor directions, fixed
/// at board construction; `capacity` is its popcount (2 for corners, 3 for
/// edges, 4 interior). `fullness` may transiently exceed `capacity` while a
/// chain reaction is being resolved. `owner_index` 0 means neutral.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub x: i8,
    pub y: i8,
    pub configuration: u8,
    pub capacity: u8,
    pub fullness: u8,
    pub owner_index: u8,
}

/// One applied move, in application order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    /// 1-based player slot.
    pub player_index: u8,
    /// Row-major cell index.
    pub cell_id: usize,
}

/// Full board state as broadcast to clients.
///
/// `scores[0]` is the neutral sentinel and stays zero; `scores[n]` is the
/// cumulative fullness owned by slot `n`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSnapshot {
    pub width: u8,
    pub height: u8,
    /// Row-major.
    pub cells: Vec<Cell>,
    pub scores: Vec<u32>,
}
