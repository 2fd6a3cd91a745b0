use core::ops::BitOr;
use std::collections::VecDeque;

use hashbrown::HashSet;

use crate::*;

/// Outcome of a flag toggle.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum FlagOutcome {
    NoChange,
    Changed,
}

impl FlagOutcome {
    pub const fn has_update(self) -> bool {
        match self {
            Self::NoChange => false,
            Self::Changed => true,
        }
    }
}

/// Outcome of revealing a cell.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum RevealOutcome {
    NoChange,
    Revealed,
    HitMine,
    Won,
}

impl RevealOutcome {
    pub const fn has_update(self) -> bool {
        use RevealOutcome::*;
        match self {
            NoChange => false,
            Revealed => true,
            HitMine => true,
            Won => true,
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::HitMine | Self::Won)
    }
}

/// Merges outcomes when one action reveals several cells.
impl BitOr for RevealOutcome {
    type Output = RevealOutcome;

    fn bitor(self, rhs: Self) -> Self::Output {
        use RevealOutcome::*;
        match (self, rhs) {
            (HitMine, _) => HitMine,
            (_, HitMine) => HitMine,
            (Won, _) => Won,
            (_, Won) => Won,
            (Revealed, _) => Revealed,
            (_, Revealed) => Revealed,
            (NoChange, NoChange) => NoChange,
        }
    }
}

/// Expands revelation from `pos` and evaluates the terminal outcome.
///
/// Revealed or flagged targets are a no-op, not an error. The flood fill
/// only propagates through zero-count safe cells; flagged cells act as
/// barriers even when their own count would be zero. Hitting a mine
/// discloses the whole minefield as a terminal side effect.
pub fn reveal_cell(board: &Board, pos: Pos) -> (Board, RevealOutcome) {
    assert!(board.contains(pos), "reveal target out of bounds");

    let mut next = board.clone();
    if !next[pos].is_actionable() {
        return (next, RevealOutcome::NoChange);
    }

    if next[pos].is_mine {
        next.cell_mut(pos).reveal();
        next.disclose_mines();
        log::debug!("mine hit at {:?}", pos);
        return (next, RevealOutcome::HitMine);
    }

    next.cell_mut(pos).reveal();
    log::debug!(
        "revealed {:?}, neighbor mines: {}",
        pos,
        next[pos].neighbor_mines
    );

    if next[pos].neighbor_mines == 0 {
        flood_from(&mut next, pos);
    }

    if next.is_cleared() {
        next.finalize_win();
        (next, RevealOutcome::Won)
    } else {
        (next, RevealOutcome::Revealed)
    }
}

/// Breadth-first expansion across the zero-count region around `origin`.
///
/// The visited set guarantees each cell is processed at most once no matter
/// how the work queue gets ordered. Neighbors of a zero-count cell can
/// never be mines, so the fill cannot disclose one.
fn flood_from(board: &mut Board, origin: Pos) {
    let mut visited: HashSet<Pos> = HashSet::from([origin]);
    let mut to_visit: VecDeque<Pos> = board
        .iter_neighbors(origin)
        .filter(|&pos| board[pos].is_actionable())
        .collect();
    log::trace!("flood fill from {:?}, frontier: {:?}", origin, to_visit);

    while let Some(pos) = to_visit.pop_front() {
        if !visited.insert(pos) {
            continue;
        }

        if !board[pos].is_actionable() {
            log::trace!("skipping {:?}", pos);
            continue;
        }

        board.cell_mut(pos).reveal();
        log::trace!(
            "flood revealed {:?}, neighbor mines: {}",
            pos,
            board[pos].neighbor_mines
        );

        if board[pos].neighbor_mines == 0 {
            let frontier: Vec<Pos> = board
                .iter_neighbors(pos)
                .filter(|&neighbor| board[neighbor].is_actionable())
                .filter(|neighbor| !visited.contains(neighbor))
                .collect();
            to_visit.extend(frontier);
        }
    }
}

/// Toggles the flag on an unrevealed cell, recording who placed it.
/// No-op on revealed cells.
pub fn toggle_flag(board: &Board, pos: Pos, actor: Option<&str>) -> (Board, FlagOutcome) {
    assert!(board.contains(pos), "flag target out of bounds");

    let mut next = board.clone();
    let cell = next.cell_mut(pos);
    if cell.is_revealed {
        return (next, FlagOutcome::NoChange);
    }

    if cell.is_flagged {
        cell.unflag();
    } else {
        cell.flag(actor);
    }
    (next, FlagOutcome::Changed)
}

/// The round is won iff every non-mine cell is revealed.
pub fn check_win(board: &Board) -> bool {
    board.is_cleared()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board_with_mines(rows: Coord, cols: Coord, mines: &[Pos]) -> Board {
        let mut board = Board::empty(rows, cols);
        for &pos in mines {
            board.cell_mut(pos).is_mine = true;
        }
        board.recount_neighbors();
        board
    }

    #[test]
    fn reveal_mine_discloses_entire_minefield() {
        let board = board_with_mines(4, 4, &[(0, 0), (3, 3)]);

        let (after, outcome) = reveal_cell(&board, (0, 0));

        assert_eq!(outcome, RevealOutcome::HitMine);
        assert!(outcome.is_terminal());
        assert!(after[(0, 0)].is_revealed);
        assert!(after[(3, 3)].is_revealed);
        // the source board is untouched
        assert!(!board[(0, 0)].is_revealed);
    }

    #[test]
    fn zero_region_reveal_opens_all_safe_cells() {
        // 5x5, mines in opposite corners: revealing the center must open
        // all 23 safe cells in one call.
        let board = board_with_mines(5, 5, &[(0, 0), (4, 4)]);

        let (after, outcome) = reveal_cell(&board, (2, 2));

        assert_eq!(outcome, RevealOutcome::Won);
        assert!(check_win(&after));
        assert_eq!(after.revealed_safe_count(), 23);
        assert!(!after[(0, 0)].is_revealed);
        assert!(after[(0, 0)].is_flagged);
    }

    #[test]
    fn win_finalization_flags_remaining_mines() {
        let board = board_with_mines(2, 1, &[(0, 0)]);

        let (after, outcome) = reveal_cell(&board, (1, 0));

        assert_eq!(outcome, RevealOutcome::Won);
        assert!(after[(0, 0)].is_flagged);
        assert!(!after[(0, 0)].is_revealed);
    }

    #[test]
    fn flood_fill_never_crosses_flags() {
        let board = board_with_mines(5, 5, &[(0, 0)]);
        let (flagged, _) = toggle_flag(&board, (2, 2), Some("p1"));

        let (after, _) = reveal_cell(&flagged, (4, 4));

        assert!(!after[(2, 2)].is_revealed);
        assert!(after[(2, 2)].is_flagged);
    }

    #[test]
    fn reveal_is_idempotent() {
        let board = board_with_mines(3, 3, &[(0, 0)]);
        let (once, first) = reveal_cell(&board, (2, 2));
        let (twice, second) = reveal_cell(&once, (2, 2));

        assert!(first.has_update());
        assert_eq!(second, RevealOutcome::NoChange);
        assert_eq!(once, twice);
    }

    #[test]
    fn reveal_on_flagged_cell_is_noop() {
        let board = board_with_mines(3, 3, &[(0, 0)]);
        let (flagged, _) = toggle_flag(&board, (1, 1), None);

        let (after, outcome) = reveal_cell(&flagged, (1, 1));

        assert_eq!(outcome, RevealOutcome::NoChange);
        assert!(!after[(1, 1)].is_revealed);
    }

    #[test]
    fn flag_on_revealed_cell_is_noop() {
        let board = board_with_mines(3, 3, &[(0, 0)]);
        let (revealed, _) = reveal_cell(&board, (2, 2));

        let (after, outcome) = toggle_flag(&revealed, (2, 2), Some("p1"));

        assert_eq!(outcome, FlagOutcome::NoChange);
        assert!(!after[(2, 2)].is_flagged);
    }

    #[test]
    fn flag_records_and_clears_attribution() {
        let board = board_with_mines(3, 3, &[(0, 0)]);

        let (flagged, outcome) = toggle_flag(&board, (1, 1), Some("p7"));
        assert_eq!(outcome, FlagOutcome::Changed);
        assert_eq!(flagged[(1, 1)].flagged_by.as_deref(), Some("p7"));

        let (unflagged, outcome) = toggle_flag(&flagged, (1, 1), Some("p7"));
        assert_eq!(outcome, FlagOutcome::Changed);
        assert_eq!(unflagged[(1, 1)].flagged_by, None);
        assert!(!unflagged[(1, 1)].is_flagged);
    }

    #[test]
    fn outcome_merge_prioritizes_mine_hits() {
        use RevealOutcome::*;
        assert_eq!(Revealed | HitMine, HitMine);
        assert_eq!(Won | Revealed, Won);
        assert_eq!(NoChange | NoChange, NoChange);
        assert_eq!(NoChange | Revealed, Revealed);
    }

    #[test]
    fn numbered_cell_reveal_does_not_expand() {
        let board = board_with_mines(3, 3, &[(0, 0)]);

        let (after, outcome) = reveal_cell(&board, (1, 1));

        assert_eq!(outcome, RevealOutcome::Revealed);
        assert_eq!(after.revealed_count(), 1);
        assert_eq!(after[(1, 1)].neighbor_mines, 1);
    }
}
