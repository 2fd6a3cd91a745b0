use std::sync::Arc;

use hashbrown::HashMap;

use crate::*;

/// Optional behavioral hooks a game mode can attach to the base ruleset.
///
/// The reveal engine never consults modes directly; the composing session
/// invokes these around its lifecycle so new modes can be added without
/// touching the engine. All hooks default to no-ops.
pub trait ModeExtension: Send + Sync {
    /// Whether the mode needs per-turn handling beyond the base rules.
    fn requires_special_logic(&self) -> bool {
        false
    }

    fn on_round_start(&self, _config: &GameConfig) {}

    fn on_cell_revealed(&self, _pos: Pos, _cell: &Cell) {}

    fn on_flag_placed(&self, _pos: Pos, _cell: &Cell) {}

    /// `Some(verdict)` overrides the engine's win evaluation.
    fn check_win(&self, _board: &Board) -> Option<bool> {
        None
    }

    /// `Some(verdict)` overrides the engine's loss evaluation.
    fn check_loss(&self, _board: &Board, _hit_mine: bool) -> Option<bool> {
        None
    }

    fn on_round_end(&self) {}
}

/// Per-turn time limit. The countdown itself lives with the session; the
/// extension only marks the mode as needing it.
#[derive(Copy, Clone, Debug, Default)]
pub struct TimedExtension;

impl ModeExtension for TimedExtension {
    fn requires_special_logic(&self) -> bool {
        true
    }
}

/// A fully composed ruleset: placement pattern plus optional extension.
#[derive(Clone)]
pub struct GameMode {
    pattern: Arc<dyn MinePlacementPattern>,
    extension: Option<Arc<dyn ModeExtension>>,
}

impl GameMode {
    pub fn new(
        pattern: Arc<dyn MinePlacementPattern>,
        extension: Option<Arc<dyn ModeExtension>>,
    ) -> Self {
        Self { pattern, extension }
    }

    pub fn place_mines(&self, board: &Board, request: &PlacementRequest) -> Board {
        self.pattern.place_mines(board, request)
    }

    pub fn requires_special_logic(&self) -> bool {
        self.extension
            .as_deref()
            .is_some_and(ModeExtension::requires_special_logic)
    }

    pub fn extension(&self) -> Option<&dyn ModeExtension> {
        self.extension.as_deref()
    }
}

/// Static registry metadata for one mode. Immutable after registration.
#[derive(Clone, Debug, PartialEq)]
pub struct ModeMeta {
    pub id: String,
    pub translation_key: String,
    pub order: u32,
    pub singleplayer: bool,
    pub multiplayer: bool,
    pub requires_special_logic: bool,
}

struct ModeEntry {
    mode: GameMode,
    meta: ModeMeta,
}

/// Lookup table from mode id to composed ruleset and metadata; built once
/// at startup and passed by reference.
#[derive(Default)]
pub struct ModeRegistry {
    entries: HashMap<String, ModeEntry>,
}

impl ModeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, mode: GameMode, meta: ModeMeta) {
        if self.entries.contains_key(&meta.id) {
            log::warn!("mode id {:?} already registered, overwriting", meta.id);
        }
        self.entries.insert(meta.id.clone(), ModeEntry { mode, meta });
    }

    pub fn get(&self, id: &str) -> Option<&GameMode> {
        self.entries.get(id).map(|entry| &entry.mode)
    }

    pub fn metadata(&self, id: &str) -> Option<&ModeMeta> {
        self.entries.get(id).map(|entry| &entry.meta)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// All registered modes, sorted by display order.
    pub fn all(&self) -> Vec<(&GameMode, &ModeMeta)> {
        let mut entries: Vec<_> = self
            .entries
            .values()
            .map(|entry| (&entry.mode, &entry.meta))
            .collect();
        entries.sort_by_key(|(_, meta)| meta.order);
        entries
    }

    pub fn singleplayer_modes(&self) -> Vec<(&GameMode, &ModeMeta)> {
        self.all()
            .into_iter()
            .filter(|(_, meta)| meta.singleplayer)
            .collect()
    }

    pub fn multiplayer_modes(&self) -> Vec<(&GameMode, &ModeMeta)> {
        self.all()
            .into_iter()
            .filter(|(_, meta)| meta.multiplayer)
            .collect()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Resolves a playable ruleset: unknown mode ids fall back to classic,
    /// and an explicitly requested pattern overrides the mode's default.
    pub fn compose(
        &self,
        mode_id: &str,
        pattern_id: Option<&str>,
        patterns: &PatternRegistry,
    ) -> GameMode {
        let base = self
            .get(mode_id)
            .or_else(|| self.get("classic"))
            .expect("classic mode is always registered");

        if let Some(pattern) = pattern_id.and_then(|id| patterns.get(id)) {
            GameMode::new(pattern, base.extension.clone())
        } else {
            base.clone()
        }
    }
}

/// The built-in mode set: classic rules, with and without the turn timer.
pub fn builtin_modes(patterns: &PatternRegistry) -> ModeRegistry {
    let default_pattern = patterns
        .get("default")
        .expect("default pattern is always registered");

    let mut registry = ModeRegistry::new();
    registry.register(
        GameMode::new(default_pattern.clone(), None),
        ModeMeta {
            id: "classic".into(),
            translation_key: "modal.classic".into(),
            order: 1,
            singleplayer: true,
            multiplayer: true,
            requires_special_logic: false,
        },
    );
    registry.register(
        GameMode::new(default_pattern, Some(Arc::new(TimedExtension))),
        ModeMeta {
            id: "timed".into(),
            translation_key: "modal.timed".into(),
            order: 2,
            singleplayer: true,
            multiplayer: true,
            requires_special_logic: true,
        },
    );
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registries() -> (PatternRegistry, ModeRegistry) {
        let patterns = builtin_patterns();
        let modes = builtin_modes(&patterns);
        (patterns, modes)
    }

    #[test]
    fn timed_mode_requires_special_logic() {
        let (_, modes) = registries();
        assert!(modes.get("timed").unwrap().requires_special_logic());
        assert!(!modes.get("classic").unwrap().requires_special_logic());
        assert!(modes.metadata("timed").unwrap().requires_special_logic);
    }

    #[test]
    fn unknown_mode_falls_back_to_classic() {
        let (patterns, modes) = registries();
        let mode = modes.compose("no-such-mode", None, &patterns);
        assert!(!mode.requires_special_logic());
    }

    #[test]
    fn compose_keeps_extension_when_overriding_pattern() {
        let (patterns, modes) = registries();
        let mode = modes.compose("timed", Some("lines"), &patterns);
        assert!(mode.requires_special_logic());
    }

    #[test]
    fn composed_mode_places_through_its_pattern() {
        let (patterns, modes) = registries();
        let mode = modes.compose("classic", Some("lines"), &patterns);
        let board = mode.place_mines(
            &Board::empty(9, 9),
            &PlacementRequest {
                mines: 10,
                exclude: (4, 4),
                seed: 1,
            },
        );
        assert_eq!(board.mine_count(), 10);
        assert!(!board[(4, 4)].is_mine);
    }

    #[test]
    fn registry_filters_by_availability() {
        let (_, modes) = registries();
        assert_eq!(modes.singleplayer_modes().len(), 2);
        assert_eq!(modes.multiplayer_modes().len(), 2);
        let ordered: Vec<&str> = modes
            .all()
            .into_iter()
            .map(|(_, meta)| meta.id.as_str())
            .collect();
        assert_eq!(ordered, vec!["classic", "timed"]);
    }
}
