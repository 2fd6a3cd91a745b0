//! Payload types exchanged with the transport layer.
//!
//! The transport delivers already-parsed messages reliably and in order per
//! connection; this crate only fixes their shapes. Field names follow the
//! wire (camelCase), timestamps are authority-clock epoch milliseconds.

use saper_core::{Cell, CellCount, Coord, GameConfig, PlayerId, RoundStatus};
use serde::{Deserialize, Serialize};

/// Roster entry for one participant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfo {
    pub id: PlayerId,
    pub name: String,
}

/// One cell as carried by a full-board resync, with its coordinates
/// re-attached for the wire.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireCell {
    pub row: Coord,
    pub col: Coord,
    pub is_mine: bool,
    pub is_revealed: bool,
    pub is_flagged: bool,
    pub neighbor_mines: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flagged_by: Option<PlayerId>,
}

impl WireCell {
    pub fn from_cell(row: Coord, col: Coord, cell: &Cell) -> Self {
        Self {
            row,
            col,
            is_mine: cell.is_mine,
            is_revealed: cell.is_revealed,
            is_flagged: cell.is_flagged,
            neighbor_mines: cell.neighbor_mines,
            flagged_by: cell.flagged_by.clone(),
        }
    }

    pub fn into_cell(self) -> Cell {
        Cell {
            is_mine: self.is_mine,
            is_revealed: self.is_revealed,
            is_flagged: self.is_flagged,
            neighbor_mines: self.neighbor_mines,
            flagged_by: self.flagged_by,
        }
    }
}

/// Round-start announcement from the authority.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundStart {
    pub players: Vec<PlayerInfo>,
    pub current_turn: PlayerId,
    pub config: GameConfig,
    #[serde(default)]
    pub turn_start_time: Option<i64>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

/// Turn handover.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnChange {
    pub current_turn: PlayerId,
    #[serde(default)]
    pub turn_start_time: Option<i64>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

/// Full-board resync snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardSync {
    pub cells: Vec<Vec<WireCell>>,
    pub status: RoundStatus,
    /// Elapsed round seconds on the authority's count.
    pub time: u32,
    #[serde(default)]
    pub flagged_count: Option<CellCount>,
    #[serde(default)]
    pub current_turn: Option<PlayerId>,
    #[serde(default)]
    pub players: Option<Vec<PlayerInfo>>,
    #[serde(default)]
    pub turn_start_time: Option<i64>,
    #[serde(default)]
    pub game_mode: Option<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

/// One incremental cell change inside a [`CellUpdates`] batch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellPatch {
    pub row: Coord,
    pub col: Coord,
    pub is_revealed: bool,
    #[serde(default)]
    pub neighbor_mines: Option<u8>,
    #[serde(default)]
    pub is_mine: Option<bool>,
}

/// Incremental reveal batch, typically one flood fill's worth.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellUpdates {
    pub updates: Vec<CellPatch>,
    pub player_id: PlayerId,
}

/// Flag toggled by some participant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagUpdate {
    pub row: Coord,
    pub col: Coord,
    pub is_flagged: bool,
    pub player_id: PlayerId,
}

/// Authoritative status/time update without a board snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateUpdate {
    pub status: RoundStatus,
    pub time: u32,
    #[serde(default)]
    pub flagged_count: Option<CellCount>,
    #[serde(default)]
    pub player_id: Option<PlayerId>,
    #[serde(default)]
    pub player_name: Option<String>,
}

/// A participant left or dropped; carries the updated roster when known.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerLeft {
    #[serde(default)]
    pub player_id: Option<PlayerId>,
    #[serde(default)]
    pub player_name: Option<String>,
    #[serde(default)]
    pub players: Option<Vec<PlayerInfo>>,
}

/// Fire-and-forget intents emitted toward the authority, tagged with the
/// event names the wire uses.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientIntent {
    RevealCell { row: Coord, col: Coord },
    ToggleFlag { row: Coord, col: Coord },
    TurnTimeout,
    #[serde(rename = "timeout_game")]
    GameTimeout,
    #[serde(rename = "request_sync")]
    RequestResync,
    UpdateTime { time: u32 },
}

impl ClientIntent {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
