use core::ops::{Index, IndexMut};

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::*;

/// Rectangular grid of [`Cell`]s, owned by the active round.
///
/// A board is never mutated in place by game operations: placement, reveal
/// and flagging all take `&Board` and hand back a new value, so a render
/// pass or in-flight message handler holding the previous value never
/// observes a half-applied transition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Board {
    cells: Array2<Cell>,
}

impl Board {
    /// Creates a board with every cell hidden, unflagged and mine-free.
    ///
    /// Dimensions are validated upstream at the configuration boundary;
    /// non-positive dimensions here are a programming error.
    pub fn empty(rows: Coord, cols: Coord) -> Self {
        assert!(rows > 0 && cols > 0, "board dimensions must be positive");
        Self {
            cells: Array2::default((rows as usize, cols as usize)),
        }
    }

    /// Rebuilds a board from a row-major grid, e.g. a full resync payload.
    pub fn from_rows(grid: Vec<Vec<Cell>>) -> Result<Self> {
        let rows = grid.len();
        let cols = grid.first().map_or(0, Vec::len);
        if rows == 0 || cols == 0 {
            return Err(GameError::EmptyGrid);
        }
        if rows > Coord::MAX as usize || cols > Coord::MAX as usize {
            return Err(GameError::InvalidBoardShape);
        }
        if grid.iter().any(|row| row.len() != cols) {
            return Err(GameError::InvalidBoardShape);
        }

        let flat: Vec<Cell> = grid.into_iter().flatten().collect();
        let cells =
            Array2::from_shape_vec((rows, cols), flat).map_err(|_| GameError::InvalidBoardShape)?;
        Ok(Self { cells })
    }

    pub fn size(&self) -> Pos {
        let dim = self.cells.dim();
        (dim.0.try_into().unwrap(), dim.1.try_into().unwrap())
    }

    pub fn rows(&self) -> Coord {
        self.size().0
    }

    pub fn cols(&self) -> Coord {
        self.size().1
    }

    pub fn total_cells(&self) -> CellCount {
        self.cells.len().try_into().unwrap()
    }

    pub fn contains(&self, pos: Pos) -> bool {
        let (rows, cols) = self.size();
        pos.0 < rows && pos.1 < cols
    }

    pub fn cell(&self, pos: Pos) -> &Cell {
        &self.cells[pos.to_index()]
    }

    pub(crate) fn cell_mut(&mut self, pos: Pos) -> &mut Cell {
        &mut self.cells[pos.to_index()]
    }

    /// Iterates all cells with their positions, row-major.
    pub fn iter_cells(&self) -> impl Iterator<Item = (Pos, &Cell)> {
        self.cells.indexed_iter().map(|((row, col), cell)| {
            ((row.try_into().unwrap(), col.try_into().unwrap()), cell)
        })
    }

    pub fn iter_neighbors(&self, pos: Pos) -> NeighborIter {
        self.cells.iter_neighbors(pos)
    }

    pub fn mine_count(&self) -> CellCount {
        self.count(|cell| cell.is_mine)
    }

    pub fn flagged_count(&self) -> CellCount {
        self.count(|cell| cell.is_flagged)
    }

    pub fn revealed_count(&self) -> CellCount {
        self.count(|cell| cell.is_revealed)
    }

    pub fn revealed_safe_count(&self) -> CellCount {
        self.count(|cell| cell.is_revealed && !cell.is_mine)
    }

    fn count(&self, pred: impl Fn(&Cell) -> bool) -> CellCount {
        self.cells
            .iter()
            .filter(|cell| pred(cell))
            .count()
            .try_into()
            .unwrap()
    }

    pub fn adjacent_mine_count(&self, pos: Pos) -> u8 {
        self.iter_neighbors(pos)
            .filter(|&neighbor| self[neighbor].is_mine)
            .count()
            .try_into()
            .unwrap()
    }

    /// Every non-mine cell is revealed: the round is won.
    pub fn is_cleared(&self) -> bool {
        self.revealed_safe_count() == self.total_cells() - self.mine_count()
    }

    /// How many mines have not been flagged yet; negative when overflagged.
    pub fn mines_left(&self) -> isize {
        self.mine_count() as isize - self.flagged_count() as isize
    }

    /// Recomputes every non-mine cell's neighbor count from scratch.
    ///
    /// Always a full pass, never incremental: partial updates drift once a
    /// fallback fill turns an already-counted cell into a mine.
    pub(crate) fn recount_neighbors(&mut self) {
        let (rows, cols) = self.size();
        for row in 0..rows {
            for col in 0..cols {
                let pos = (row, col);
                let count = if self[pos].is_mine {
                    0
                } else {
                    self.adjacent_mine_count(pos)
                };
                self.cell_mut(pos).neighbor_mines = count;
            }
        }
    }

    /// Copy-on-write full disclosure, used when a timeout ends the round:
    /// returns a board with every mine revealed.
    pub fn with_mines_disclosed(&self) -> Board {
        let mut next = self.clone();
        next.disclose_mines();
        next
    }

    /// Terminal loss pass: every mine is disclosed.
    pub(crate) fn disclose_mines(&mut self) {
        for cell in self.cells.iter_mut() {
            if cell.is_mine {
                cell.reveal();
            }
        }
    }

    /// Terminal win pass: remaining mines flagged, remaining safe cells
    /// revealed, purely for display.
    pub(crate) fn finalize_win(&mut self) {
        for cell in self.cells.iter_mut() {
            if cell.is_mine {
                if !cell.is_flagged {
                    cell.flag(None);
                }
            } else if !cell.is_revealed {
                cell.reveal();
            }
        }
    }
}

impl Index<Pos> for Board {
    type Output = Cell;

    fn index(&self, pos: Pos) -> &Self::Output {
        &self.cells[pos.to_index()]
    }
}

impl IndexMut<Pos> for Board {
    fn index_mut(&mut self, pos: Pos) -> &mut Self::Output {
        &mut self.cells[pos.to_index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_board_starts_blank() {
        let board = Board::empty(9, 9);
        assert_eq!(board.size(), (9, 9));
        assert_eq!(board.total_cells(), 81);
        assert_eq!(board.mine_count(), 0);
        assert!(board.iter_cells().all(|(_, cell)| {
            !cell.is_mine && !cell.is_revealed && !cell.is_flagged && cell.neighbor_mines == 0
        }));
    }

    #[test]
    fn from_rows_rejects_empty_grid() {
        assert_eq!(Board::from_rows(vec![]), Err(GameError::EmptyGrid));
        assert_eq!(Board::from_rows(vec![vec![]]), Err(GameError::EmptyGrid));
    }

    #[test]
    fn from_rows_rejects_ragged_grid() {
        let grid = vec![vec![Cell::default(); 3], vec![Cell::default(); 2]];
        assert_eq!(Board::from_rows(grid), Err(GameError::InvalidBoardShape));
    }

    #[test]
    fn from_rows_keeps_cell_order() {
        let mut grid = vec![vec![Cell::default(); 2]; 2];
        grid[1][0].is_mine = true;
        let board = Board::from_rows(grid).unwrap();
        assert!(board[(1, 0)].is_mine);
        assert!(!board[(0, 1)].is_mine);
        assert_eq!(board.mine_count(), 1);
    }

    #[test]
    fn mines_left_tracks_flags() {
        let mut board = Board::empty(3, 3);
        board.cell_mut((0, 0)).is_mine = true;
        board.cell_mut((0, 1)).is_mine = true;
        assert_eq!(board.mines_left(), 2);
        board.cell_mut((2, 2)).flag(Some("p1"));
        board.cell_mut((2, 1)).flag(None);
        board.cell_mut((2, 0)).flag(None);
        assert_eq!(board.mines_left(), -1);
    }

    #[test]
    fn recount_skips_mines_and_counts_safe_cells() {
        let mut board = Board::empty(3, 3);
        board.cell_mut((0, 0)).is_mine = true;
        board.cell_mut((2, 2)).is_mine = true;
        board.recount_neighbors();
        assert_eq!(board[(1, 1)].neighbor_mines, 2);
        assert_eq!(board[(0, 1)].neighbor_mines, 1);
        assert_eq!(board[(2, 0)].neighbor_mines, 1);
        assert_eq!(board[(0, 0)].neighbor_mines, 0);
    }
}
