use chrono::{DateTime, Utc};
use saper_core::{
    reveal_cell, toggle_flag, Board, Cell, GameConfig, GameMode, ModeRegistry, PatternRegistry,
    PlacementRequest, PlayerId, Pos, RevealOutcome, RoundStatus,
};
use saper_protocol::{
    BoardSync, CellUpdates, ClientIntent, FlagUpdate, PlayerInfo, PlayerLeft, RoundStart,
    StateUpdate, TurnChange, WireCell,
};
use thiserror::Error;

use crate::clock::{TurnClock, TURN_DURATION_SECS};

/// Session-wide hard cap on total elapsed time (the 99:99 counter limit),
/// enforced by every client independently of per-turn timing.
pub const SESSION_TIME_CAP_SECS: u32 = 99 * 60 + 99;

/// Consecutive rejected resync grids after which the session stops
/// re-requesting and waits for the next unsolicited authoritative message.
pub const MAX_RESYNC_ATTEMPTS: u32 = 5;

#[derive(Error, Debug, PartialEq)]
pub enum SyncError {
    #[error("resync payload contains no cells")]
    EmptyGrid,
    #[error("resync grid is malformed: {0}")]
    BadGrid(#[from] saper_core::GameError),
}

/// One round of the game as seen by a single participant.
///
/// All inbound payloads are applied as atomic replace operations on local
/// state; every local decision (turn timeout, game timeout) is advisory
/// and superseded by the next authoritative status or turn message. Time
/// only enters through explicit `now` parameters.
pub struct RoundSession {
    config: GameConfig,
    mode: GameMode,
    local_player: PlayerId,
    multiplayer: bool,
    board: Option<Board>,
    status: RoundStatus,
    elapsed_secs: u32,
    players: Vec<PlayerInfo>,
    current_turn: Option<PlayerId>,
    clock: TurnClock,
    frozen_remaining: Option<i64>,
    first_click: bool,
    resync_attempts: u32,
    seed: u64,
}

impl RoundSession {
    /// A solo round: the board exists locally from the start and every
    /// decision is applied without an authority round-trip.
    pub fn singleplayer(
        config: GameConfig,
        modes: &ModeRegistry,
        patterns: &PatternRegistry,
        seed: u64,
    ) -> Self {
        let mode = modes.compose(config.mode_id(), config.pattern.as_deref(), patterns);
        let board = Some(Board::empty(config.rows, config.cols));
        Self {
            config,
            mode,
            local_player: PlayerId::new(),
            multiplayer: false,
            board,
            status: RoundStatus::Idle,
            elapsed_secs: 0,
            players: Vec::new(),
            current_turn: None,
            clock: TurnClock::new(),
            frozen_remaining: None,
            first_click: true,
            resync_attempts: 0,
            seed,
        }
    }

    /// A shared round: the board arrives via resync and local actions only
    /// produce outbound intents.
    pub fn multiplayer(
        config: GameConfig,
        modes: &ModeRegistry,
        patterns: &PatternRegistry,
        local_player: PlayerId,
        seed: u64,
    ) -> Self {
        let mut session = Self::singleplayer(config, modes, patterns, seed);
        session.multiplayer = true;
        session.local_player = local_player;
        session.board = None;
        session
    }

    pub fn board(&self) -> Option<&Board> {
        self.board.as_ref()
    }

    pub fn status(&self) -> RoundStatus {
        self.status
    }

    pub fn elapsed_secs(&self) -> u32 {
        self.elapsed_secs
    }

    pub fn players(&self) -> &[PlayerInfo] {
        &self.players
    }

    pub fn current_turn(&self) -> Option<&str> {
        self.current_turn.as_deref()
    }

    pub fn is_my_turn(&self) -> bool {
        self.current_turn.as_deref() == Some(self.local_player.as_str())
    }

    /// Seconds to display on the turn countdown, `None` outside timed mode.
    ///
    /// The value freezes at its last reading once the round reaches a
    /// terminal status instead of continuing to count down.
    pub fn turn_remaining(&self, now: DateTime<Utc>) -> Option<i64> {
        if !self.config.is_timed() {
            return None;
        }
        if self.status.is_terminal() {
            return Some(self.frozen_remaining.unwrap_or(0));
        }
        match self.status {
            RoundStatus::Idle => Some(TURN_DURATION_SECS),
            _ => Some(self.clock.remaining_secs(now)),
        }
    }

    /// Discards round progress and arms a fresh board (a rematch).
    pub fn reset(&mut self, seed: u64) {
        self.board = if self.multiplayer {
            None
        } else {
            Some(Board::empty(self.config.rows, self.config.cols))
        };
        self.status = RoundStatus::Idle;
        self.elapsed_secs = 0;
        self.first_click = true;
        self.frozen_remaining = None;
        self.resync_attempts = 0;
        self.clock.clear();
        self.seed = seed;
    }

    // ---- local player actions ------------------------------------------

    /// Reveal at `pos`. Multiplayer rounds emit the intent and wait for
    /// the authority's echo; solo rounds apply the whole move locally,
    /// placing mines around the first click.
    pub fn reveal(&mut self, pos: Pos, now: DateTime<Utc>) -> Option<ClientIntent> {
        if self.status.is_terminal() {
            return None;
        }

        if self.multiplayer {
            if !self.is_my_turn() {
                log::debug!("reveal at {:?} ignored, not our turn", pos);
                return None;
            }
            return Some(ClientIntent::RevealCell {
                row: pos.0,
                col: pos.1,
            });
        }

        let board = self.board.as_ref()?;
        if !board.contains(pos) || !board[pos].is_actionable() {
            return None;
        }

        if self.first_click {
            let placed = self.mode.place_mines(
                board,
                &PlacementRequest {
                    mines: self.config.mines,
                    exclude: pos,
                    seed: self.seed,
                },
            );
            self.board = Some(placed);
            self.first_click = false;
            self.status = RoundStatus::Playing;
            if let Some(ext) = self.mode.extension() {
                ext.on_round_start(&self.config);
            }
            if self.config.is_timed() {
                self.clock.restart(now);
            }
        } else if self.config.is_timed() {
            // per-move countdown reset in solo timed play
            self.clock.restart(now);
        }

        let (next, outcome) = reveal_cell(self.board.as_ref().unwrap(), pos);
        self.board = Some(next);
        self.finish_local_reveal(pos, outcome, now);
        None
    }

    fn finish_local_reveal(&mut self, pos: Pos, outcome: RevealOutcome, now: DateTime<Utc>) {
        let board = self.board.as_ref().unwrap();
        let hit_mine = outcome == RevealOutcome::HitMine;

        let lost = match self.mode.extension().and_then(|ext| ext.check_loss(board, hit_mine)) {
            Some(verdict) => verdict,
            None => hit_mine,
        };
        let won = !lost
            && match self.mode.extension().and_then(|ext| ext.check_win(board)) {
                Some(verdict) => verdict,
                None => outcome == RevealOutcome::Won,
            };

        if lost {
            self.status = RoundStatus::Lost;
        } else if won {
            self.status = RoundStatus::Won;
        }

        if self.status.is_terminal() {
            self.freeze_countdown(now);
            if let Some(ext) = self.mode.extension() {
                ext.on_round_end();
            }
        } else if outcome.has_update() {
            if let Some(ext) = self.mode.extension() {
                ext.on_cell_revealed(pos, &self.board.as_ref().unwrap()[pos]);
            }
        }
    }

    /// Toggle a flag at `pos`; revealed cells are a no-op.
    pub fn toggle_flag(&mut self, pos: Pos, _now: DateTime<Utc>) -> Option<ClientIntent> {
        if self.status.is_terminal() {
            return None;
        }

        if self.multiplayer {
            if !self.is_my_turn() {
                log::debug!("flag at {:?} ignored, not our turn", pos);
                return None;
            }
            return Some(ClientIntent::ToggleFlag {
                row: pos.0,
                col: pos.1,
            });
        }

        let board = self.board.as_ref()?;
        if !board.contains(pos) || board[pos].is_revealed {
            return None;
        }

        let actor = self.local_player.clone();
        let actor = (!actor.is_empty()).then_some(actor);
        let (next, outcome) = toggle_flag(board, pos, actor.as_deref());
        if outcome.has_update() && next[pos].is_flagged {
            if let Some(ext) = self.mode.extension() {
                ext.on_flag_placed(pos, &next[pos]);
            }
        }
        self.board = Some(next);
        None
    }

    // ---- inbound authoritative messages --------------------------------

    /// Authority announced a fresh round. Clears the stale board and asks
    /// for a full snapshot.
    pub fn apply_round_start(&mut self, start: &RoundStart, now: DateTime<Utc>) -> Option<ClientIntent> {
        self.board = None;
        self.status = RoundStatus::Playing;
        self.elapsed_secs = 0;
        self.first_click = true;
        self.frozen_remaining = None;
        self.resync_attempts = 0;
        self.players = start.players.clone();
        self.current_turn = Some(start.current_turn.clone());
        if start.config.game_mode.is_some() {
            self.config.game_mode = start.config.game_mode.clone();
        }

        if self.config.is_timed() {
            match start.turn_start_time {
                Some(turn_start) => self.clock.sync(turn_start, start.timestamp, now),
                None => self.clock.restart(now),
            }
        }

        Some(ClientIntent::RequestResync)
    }

    /// Turn passed to another participant.
    pub fn apply_turn_change(&mut self, change: &TurnChange, now: DateTime<Utc>) {
        self.current_turn = Some(change.current_turn.clone());
        if self.config.is_timed() {
            if let Some(turn_start) = change.turn_start_time {
                self.clock.sync(turn_start, change.timestamp, now);
            }
        }
    }

    /// Full-board snapshot. A payload with an empty or malformed grid is
    /// never adopted; the session re-requests a fresh snapshot instead,
    /// up to [`MAX_RESYNC_ATTEMPTS`] consecutive rejects.
    pub fn apply_board_sync(&mut self, sync: &BoardSync, now: DateTime<Utc>) -> Option<ClientIntent> {
        let board = match adopt_grid(&sync.cells) {
            Ok(board) => board,
            Err(err) => {
                self.resync_attempts += 1;
                if self.resync_attempts > MAX_RESYNC_ATTEMPTS {
                    log::error!(
                        "rejected {} resync payloads in a row ({}), giving up until the next unsolicited sync",
                        self.resync_attempts,
                        err
                    );
                    return None;
                }
                log::warn!("rejected resync payload ({}), requesting again", err);
                return Some(ClientIntent::RequestResync);
            }
        };

        self.resync_attempts = 0;
        self.board = Some(board);
        self.status = sync.status;
        self.elapsed_secs = sync.time;
        self.first_click = false;
        if let Some(mode) = &sync.game_mode {
            if self.config.game_mode.as_deref() != Some(mode) {
                self.config.game_mode = Some(mode.clone());
            }
        }
        if let Some(turn) = &sync.current_turn {
            self.current_turn = Some(turn.clone());
        }
        if let Some(players) = &sync.players {
            if !players.is_empty() {
                self.players = players.clone();
            }
        }

        match sync.turn_start_time {
            Some(turn_start) => self.clock.sync(turn_start, sync.timestamp, now),
            None => {
                if self.config.is_timed() && sync.current_turn.is_some() && !self.clock.is_anchored()
                {
                    self.clock.restart(now);
                }
            }
        }

        if self.status.is_terminal() {
            self.freeze_countdown(now);
        } else {
            self.frozen_remaining = None;
        }
        None
    }

    /// Incremental reveal batch. Ignored until a board snapshot exists.
    pub fn apply_cell_updates(&mut self, updates: &CellUpdates) {
        let Some(board) = self.board.as_ref() else {
            return;
        };

        let mut next = board.clone();
        for patch in &updates.updates {
            let pos = (patch.row, patch.col);
            if !next.contains(pos) {
                log::warn!("cell update at {:?} is out of bounds, skipping", pos);
                continue;
            }
            let cell = &mut next[pos];
            cell.is_revealed = patch.is_revealed;
            if let Some(count) = patch.neighbor_mines {
                cell.neighbor_mines = count;
            }
            if let Some(is_mine) = patch.is_mine {
                cell.is_mine = is_mine;
            }
        }
        self.board = Some(next);
    }

    /// Another participant toggled a flag.
    pub fn apply_flag_update(&mut self, update: &FlagUpdate) {
        let Some(board) = self.board.as_ref() else {
            return;
        };
        let pos = (update.row, update.col);
        if !board.contains(pos) {
            log::warn!("flag update at {:?} is out of bounds, skipping", pos);
            return;
        }

        let mut next = board.clone();
        let cell = &mut next[pos];
        cell.is_flagged = update.is_flagged;
        cell.flagged_by = update.is_flagged.then(|| update.player_id.clone());
        self.board = Some(next);
    }

    /// Authoritative status/time without a board; always wins over any
    /// local advisory decision.
    pub fn apply_state_update(&mut self, update: &StateUpdate, now: DateTime<Utc>) {
        self.status = update.status;
        self.elapsed_secs = update.time;
        if self.status.is_terminal() {
            self.freeze_countdown(now);
        }
    }

    /// Authority declared the whole game timed out.
    pub fn apply_game_timeout(&mut self, now: DateTime<Utc>) {
        self.status = RoundStatus::Timeout;
        self.freeze_countdown(now);
    }

    pub fn apply_player_left(&mut self, left: &PlayerLeft) {
        if let Some(players) = &left.players {
            if !players.is_empty() {
                self.players = players.clone();
            }
        }
    }

    // ---- periodic ticks ------------------------------------------------

    /// One-second elapsed tick. Multiplayer rounds report their count to
    /// the authority; hitting the 99:99 cap raises the game timeout.
    pub fn tick_second(&mut self, now: DateTime<Utc>) -> Option<ClientIntent> {
        if self.status != RoundStatus::Playing {
            return None;
        }

        let next = self.elapsed_secs + 1;
        if next >= SESSION_TIME_CAP_SECS {
            if self.multiplayer {
                return Some(ClientIntent::GameTimeout);
            }
            self.apply_local_timeout(now);
            return None;
        }

        self.elapsed_secs = next;
        self.multiplayer
            .then_some(ClientIntent::UpdateTime { time: next })
    }

    /// Fast countdown tick for timed mode. The client whose turn it is
    /// signals the turn timeout; solo rounds apply it immediately. Either
    /// way the decision stays advisory until the authority confirms it.
    pub fn tick_turn(&mut self, now: DateTime<Utc>) -> Option<ClientIntent> {
        if self.status != RoundStatus::Playing || !self.config.is_timed() {
            return None;
        }
        if !self.clock.expired(now) {
            return None;
        }

        if self.multiplayer {
            return self.is_my_turn().then_some(ClientIntent::TurnTimeout);
        }

        self.apply_local_timeout(now);
        None
    }

    fn apply_local_timeout(&mut self, now: DateTime<Utc>) {
        self.freeze_countdown(now);
        if let Some(board) = self.board.as_ref() {
            self.board = Some(board.with_mines_disclosed());
        }
        self.status = RoundStatus::Timeout;
        if let Some(ext) = self.mode.extension() {
            ext.on_round_end();
        }
    }

    fn freeze_countdown(&mut self, now: DateTime<Utc>) {
        if self.config.is_timed() && self.frozen_remaining.is_none() {
            self.frozen_remaining = Some(self.clock.remaining_secs(now));
        }
    }
}

fn adopt_grid(cells: &[Vec<WireCell>]) -> Result<Board, SyncError> {
    if cells.is_empty() || cells[0].is_empty() {
        return Err(SyncError::EmptyGrid);
    }
    for (row_index, row) in cells.iter().enumerate() {
        for (col_index, cell) in row.iter().enumerate() {
            if usize::from(cell.row) != row_index || usize::from(cell.col) != col_index {
                return Err(SyncError::BadGrid(saper_core::GameError::InvalidBoardShape));
            }
        }
    }

    let grid: Vec<Vec<Cell>> = cells
        .iter()
        .map(|row| row.iter().cloned().map(WireCell::into_cell).collect())
        .collect();
    Ok(Board::from_rows(grid)?)
}

/// Formats an elapsed-seconds counter as `MM:SS`.
pub fn format_counter(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
