use std::sync::Arc;

use hashbrown::HashMap;

use crate::*;

pub use lines::*;
pub use uniform::*;

mod lines;
mod uniform;

/// Strategy deciding which cells of an empty board become mines.
///
/// Implementations place exactly `request.mines` mines outside the safe
/// zone (clamped with a warning when the board cannot fit them) and leave
/// every non-mine cell's neighbor count recomputed from scratch.
pub trait MinePlacementPattern: Send + Sync {
    fn place_mines(&self, board: &Board, request: &PlacementRequest) -> Board;
}

/// Value object describing one placement run. Not stored anywhere.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PlacementRequest {
    pub mines: CellCount,
    /// First-clicked cell; it and its Moore neighborhood stay mine-free.
    pub exclude: Pos,
    pub seed: u64,
}

/// The excluded cell plus its Moore neighborhood.
///
/// Membership always wins over pattern placement: no code path, including
/// the fallback fill, may mine a safe-zone cell.
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) struct SafeZone {
    center: Pos,
}

impl SafeZone {
    pub(crate) fn new(center: Pos) -> Self {
        Self { center }
    }

    pub(crate) fn contains(&self, pos: Pos) -> bool {
        pos.0.abs_diff(self.center.0) <= 1 && pos.1.abs_diff(self.center.1) <= 1
    }
}

/// A cell a pattern may still mine: in bounds, not yet mined, outside the
/// safe zone.
pub(crate) fn placeable(board: &Board, safe: &SafeZone, pos: Pos) -> bool {
    board.contains(pos) && !board[pos].is_mine && !safe.contains(pos)
}

pub(crate) fn placeable_positions(board: &Board, safe: &SafeZone) -> Vec<Pos> {
    board
        .iter_cells()
        .filter(|&(pos, cell)| !cell.is_mine && !safe.contains(pos))
        .map(|(pos, _)| pos)
        .collect()
}

#[derive(Clone, Debug, PartialEq)]
pub struct PatternMeta {
    pub id: String,
    pub translation_key: String,
    pub order: u32,
}

struct PatternEntry {
    pattern: Arc<dyn MinePlacementPattern>,
    meta: PatternMeta,
}

/// Lookup table from pattern id to strategy and metadata.
///
/// Built once at startup and passed by reference to whatever composes a
/// round; registering twice under one id overwrites with a warning.
#[derive(Default)]
pub struct PatternRegistry {
    entries: HashMap<String, PatternEntry>,
}

impl PatternRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, pattern: Arc<dyn MinePlacementPattern>, meta: PatternMeta) {
        if self.entries.contains_key(&meta.id) {
            log::warn!("pattern id {:?} already registered, overwriting", meta.id);
        }
        self.entries
            .insert(meta.id.clone(), PatternEntry { pattern, meta });
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn MinePlacementPattern>> {
        self.entries.get(id).map(|entry| entry.pattern.clone())
    }

    pub fn metadata(&self, id: &str) -> Option<&PatternMeta> {
        self.entries.get(id).map(|entry| &entry.meta)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// All registered patterns, sorted by display order.
    pub fn all(&self) -> Vec<(Arc<dyn MinePlacementPattern>, &PatternMeta)> {
        let mut entries: Vec<_> = self
            .entries
            .values()
            .map(|entry| (entry.pattern.clone(), &entry.meta))
            .collect();
        entries.sort_by_key(|(_, meta)| meta.order);
        entries
    }

    pub fn ids(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }
}

/// The built-in pattern set: uniform scatter and geometric lines.
pub fn builtin_patterns() -> PatternRegistry {
    let mut registry = PatternRegistry::new();
    registry.register(
        Arc::new(UniformPattern),
        PatternMeta {
            id: "default".into(),
            translation_key: "modal.patterns.classic".into(),
            order: 1,
        },
    );
    registry.register(
        Arc::new(LinesPattern),
        PatternMeta {
            id: "lines".into(),
            translation_key: "modal.patterns.lines".into(),
            order: 2,
        },
    );
    registry
}
