use serde::{Deserialize, Serialize};

use crate::PlayerId;

/// State of a single board cell.
///
/// `neighbor_mines` is only meaningful on non-mine cells after placement;
/// before placement every cell is mine-free with a zero count.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub is_mine: bool,
    pub is_revealed: bool,
    pub is_flagged: bool,
    pub neighbor_mines: u8,
    pub flagged_by: Option<PlayerId>,
}

impl Cell {
    /// Whether a direct reveal may act on this cell at all.
    pub fn is_actionable(&self) -> bool {
        !self.is_revealed && !self.is_flagged
    }

    pub(crate) fn reveal(&mut self) {
        self.is_revealed = true;
    }

    pub(crate) fn flag(&mut self, actor: Option<&str>) {
        self.is_flagged = true;
        self.flagged_by = actor.map(str::to_owned);
    }

    pub(crate) fn unflag(&mut self) {
        self.is_flagged = false;
        self.flagged_by = None;
    }
}
