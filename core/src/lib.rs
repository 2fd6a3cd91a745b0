use serde::{Deserialize, Serialize};

pub use board::*;
pub use cell::*;
pub use engine::*;
pub use error::*;
pub use mode::*;
pub use pattern::*;
pub use types::*;

mod board;
mod cell;
mod engine;
mod error;
mod mode;
mod pattern;
mod types;

pub const MIN_ROWS: Coord = 5;
pub const MAX_ROWS: Coord = 16;
pub const MIN_COLS: Coord = 5;
pub const MAX_COLS: Coord = 16;

/// Upper mine bound for a board: 85% of its cells.
pub fn max_mines(rows: Coord, cols: Coord) -> CellCount {
    (f64::from(area(rows, cols)) * 0.85).floor() as CellCount
}

/// Round configuration as delivered by the settings layer.
///
/// Field names follow the wire (`gameMode`, `pattern`); board bounds are
/// enforced here, at the configuration boundary, so the placement and
/// reveal code below never sees an impossible request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameConfig {
    pub rows: Coord,
    pub cols: Coord,
    pub mines: CellCount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

impl GameConfig {
    /// Builds a config clamped into the supported ranges.
    pub fn new(rows: Coord, cols: Coord, mines: CellCount) -> Self {
        let rows = rows.clamp(MIN_ROWS, MAX_ROWS);
        let cols = cols.clamp(MIN_COLS, MAX_COLS);
        let mines = mines.clamp(1, max_mines(rows, cols));
        Self {
            rows,
            cols,
            mines,
            game_mode: None,
            pattern: None,
        }
    }

    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.game_mode = Some(mode.into());
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub const fn total_cells(&self) -> CellCount {
        area(self.rows, self.cols)
    }

    pub fn mode_id(&self) -> &str {
        self.game_mode.as_deref().unwrap_or("classic")
    }

    pub fn is_timed(&self) -> bool {
        self.mode_id() == "timed"
    }

    /// Checks an externally supplied config without clamping it.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_ROWS..=MAX_ROWS).contains(&self.rows) || !(MIN_COLS..=MAX_COLS).contains(&self.cols)
        {
            return Err(GameError::InvalidDimensions);
        }
        if self.mines == 0 || self.mines > max_mines(self.rows, self.cols) {
            return Err(GameError::InvalidMineCount);
        }
        Ok(())
    }
}

/// Round lifecycle as shared between participants.
///
/// Valid transitions: `Idle -> Playing`, `Playing -> Won | Lost | Timeout`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundStatus {
    Idle,
    Playing,
    Won,
    Lost,
    Timeout,
}

impl RoundStatus {
    /// The round has ended and no further moves or countdowns apply.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Won | Self::Lost | Self::Timeout)
    }
}

impl Default for RoundStatus {
    fn default() -> Self {
        Self::Idle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_clamps_to_supported_ranges() {
        let config = GameConfig::new(100, 2, 9999);
        assert_eq!(config.rows, MAX_ROWS);
        assert_eq!(config.cols, MIN_COLS);
        assert_eq!(config.mines, max_mines(MAX_ROWS, MIN_COLS));
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        let mut config = GameConfig::new(9, 9, 10);
        assert_eq!(config.validate(), Ok(()));

        config.mines = max_mines(9, 9) + 1;
        assert_eq!(config.validate(), Err(GameError::InvalidMineCount));

        config = GameConfig::new(9, 9, 10);
        config.rows = 2;
        assert_eq!(config.validate(), Err(GameError::InvalidDimensions));
    }

    #[test]
    fn max_mines_is_85_percent() {
        assert_eq!(max_mines(9, 9), 68);
        assert_eq!(max_mines(16, 16), 217);
    }

    #[test]
    fn mode_id_defaults_to_classic() {
        let config = GameConfig::new(9, 9, 10);
        assert_eq!(config.mode_id(), "classic");
        assert!(!config.is_timed());
        assert!(config.clone().with_mode("timed").is_timed());
    }

    #[test]
    fn config_round_trips_with_wire_names() {
        let config = GameConfig::new(9, 9, 10).with_mode("timed").with_pattern("lines");
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"gameMode\":\"timed\""));
        assert!(json.contains("\"pattern\":\"lines\""));
        let back: GameConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn terminal_statuses() {
        assert!(RoundStatus::Won.is_terminal());
        assert!(RoundStatus::Lost.is_terminal());
        assert!(RoundStatus::Timeout.is_terminal());
        assert!(!RoundStatus::Playing.is_terminal());
        assert!(!RoundStatus::Idle.is_terminal());
        assert_eq!(RoundStatus::default(), RoundStatus::Idle);
    }
}
