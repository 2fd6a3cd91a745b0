use core::f64::consts::TAU;

use hashbrown::HashSet;
use rand::prelude::*;

use super::*;

/// Geometric placement: mines cluster along lines and bursts instead of
/// uniform scatter.
///
/// Shape priority per run: a rare corner-to-corner stroke, a rarer radial
/// star-burst, then repeated full-board lines until the quota is met or
/// line generation dries up, then a shuffled fallback fill. The fallback
/// guarantees termination and an exact mine count regardless of geometric
/// bad luck.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct LinesPattern;

const CORNER_STROKE_CHANCE: f64 = 0.12;
const STAR_BURST_CHANCE: f64 = 0.25;
const MAX_LINE_ATTEMPTS: u32 = 300;

/// Structural identity of a generated line, so the same line is never
/// drawn twice.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
enum LineKey {
    Vertical(Coord),
    Horizontal(Coord),
    DiagonalFromTop(Coord),
    DiagonalFromBottom(Coord),
    DiagonalFromLeft(Coord),
    DiagonalFromRight(Coord),
    Segment(Pos, Pos),
}

impl MinePlacementPattern for LinesPattern {
    fn place_mines(&self, board: &Board, request: &PlacementRequest) -> Board {
        let mut next = board.clone();
        let (rows, cols) = next.size();
        let safe = SafeZone::new(request.exclude);
        let mut rng = SmallRng::seed_from_u64(request.seed);

        let quota = request.mines;
        let mut placed: CellCount = 0;

        let special = rng.random::<f64>();
        if special < CORNER_STROKE_CHANCE {
            if let Some(stroke) = corner_stroke(&mut rng, rows, cols) {
                placed += stamp(&mut next, &safe, &stroke, quota - placed);
            }
        } else if special < STAR_BURST_CHANCE {
            let burst = star_burst(&mut rng, rows, cols);
            placed += stamp(&mut next, &safe, &burst, quota - placed);
        }

        let mut used: HashSet<LineKey> = HashSet::new();
        let mut attempts: u32 = 0;
        while placed < quota && attempts < MAX_LINE_ATTEMPTS {
            let (line, key) = roll_line(&mut rng, rows, cols);
            if line.is_empty() || !used.insert(key) {
                attempts += 1;
                continue;
            }

            let stamped = stamp(&mut next, &safe, &line, quota - placed);
            placed += stamped;
            if stamped > 0 {
                attempts = 0;
            } else {
                attempts += 1;
            }
        }

        if placed < quota {
            let mut remaining = placeable_positions(&next, &safe);
            remaining.shuffle(&mut rng);
            for pos in remaining {
                if placed >= quota {
                    break;
                }
                next.cell_mut(pos).is_mine = true;
                placed += 1;
            }
            if placed < quota {
                log::warn!(
                    "requested {} mines but only {} fit outside the safe zone",
                    quota,
                    placed
                );
            }
        }

        next.recount_neighbors();
        next
    }
}

/// Mines the line cells in order, honoring the safe zone and the remaining
/// budget. Returns how many mines were placed.
fn stamp(board: &mut Board, safe: &SafeZone, line: &[Pos], budget: CellCount) -> CellCount {
    let mut stamped = 0;
    for &pos in line {
        if stamped >= budget {
            break;
        }
        if placeable(board, safe, pos) {
            board.cell_mut(pos).is_mine = true;
            stamped += 1;
        }
    }
    stamped
}

fn in_bounds(row: i32, col: i32, rows: Coord, cols: Coord) -> Option<Pos> {
    if row >= 0 && row < i32::from(rows) && col >= 0 && col < i32::from(cols) {
        Some((row as Coord, col as Coord))
    } else {
        None
    }
}

/// Bresenham walk from `from` to `to`, collecting the in-bounds cells.
/// Endpoints may lie outside the board (star-burst rays aim past the
/// edge); those cells are simply skipped.
fn bresenham(from: (i32, i32), to: (i32, i32), rows: Coord, cols: Coord) -> Vec<Pos> {
    let (mut row, mut col) = from;
    let (end_row, end_col) = to;
    let d_row = (end_row - row).abs();
    let d_col = (end_col - col).abs();
    let step_row = if row < end_row { 1 } else { -1 };
    let step_col = if col < end_col { 1 } else { -1 };
    let mut err = d_col - d_row;

    let mut line = Vec::new();
    loop {
        if let Some(pos) = in_bounds(row, col, rows, cols) {
            line.push(pos);
        }
        if row == end_row && col == end_col {
            break;
        }
        let e2 = 2 * err;
        if e2 > -d_row {
            err -= d_row;
            col += step_col;
        }
        if e2 < d_col {
            err += d_col;
            row += step_row;
        }
    }
    line
}

/// Straight walk from `start` along `dir` until the board edge.
fn ray(start: (i32, i32), dir: (i32, i32), rows: Coord, cols: Coord) -> Vec<Pos> {
    let (mut row, mut col) = start;
    let mut line = Vec::new();
    while let Some(pos) = in_bounds(row, col, rows, cols) {
        line.push(pos);
        row += dir.0;
        col += dir.1;
    }
    line
}

/// One straight line between two distinct board corners, or `None` when
/// the same corner comes up twice.
fn corner_stroke(rng: &mut SmallRng, rows: Coord, cols: Coord) -> Option<Vec<Pos>> {
    let corners: [Pos; 4] = [
        (0, 0),
        (0, cols - 1),
        (rows - 1, 0),
        (rows - 1, cols - 1),
    ];
    let start = corners[rng.random_range(0..corners.len())];
    let end = corners[rng.random_range(0..corners.len())];
    if start == end {
        return None;
    }
    Some(bresenham(
        (start.0.into(), start.1.into()),
        (end.0.into(), end.1.into()),
        rows,
        cols,
    ))
}

/// 6 to 11 rays out of the board center, each traced with the line walk,
/// length ~0.8 of the short board dimension.
fn star_burst(rng: &mut SmallRng, rows: Coord, cols: Coord) -> Vec<Pos> {
    let center = (i32::from(rows) / 2, i32::from(cols) / 2);
    let num_rays = rng.random_range(6..12u32);
    let length = f64::from(rows.min(cols)) * 0.8;

    let mut points = Vec::new();
    for i in 0..num_rays {
        let angle = f64::from(i) / f64::from(num_rays) * TAU;
        let end_row = (f64::from(center.0) + angle.sin() * length).round() as i32;
        let end_col = (f64::from(center.1) + angle.cos() * length).round() as i32;
        points.extend(bresenham(center, (end_row, end_col), rows, cols));
    }
    points
}

/// Rolls one line out of the repertoire: full-board verticals and
/// horizontals, quadrant diagonals off a random edge, or an edge-to-edge
/// Bresenham segment.
fn roll_line(rng: &mut SmallRng, rows: Coord, cols: Coord) -> (Vec<Pos>, LineKey) {
    let style = rng.random::<f64>();

    if style < 0.3 {
        let col = rng.random_range(0..cols);
        let start = if rng.random_bool(0.5) {
            ((0, col.into()), (1, 0))
        } else {
            ((i32::from(rows) - 1, col.into()), (-1, 0))
        };
        (ray(start.0, start.1, rows, cols), LineKey::Vertical(col))
    } else if style < 0.6 {
        let row = rng.random_range(0..rows);
        let start = if rng.random_bool(0.5) {
            ((row.into(), 0), (0, 1))
        } else {
            ((row.into(), i32::from(cols) - 1), (0, -1))
        };
        (ray(start.0, start.1, rows, cols), LineKey::Horizontal(row))
    } else if style < 0.8 {
        let slant = if rng.random_bool(0.5) { 1 } else { -1 };
        match rng.random_range(0..4u8) {
            0 => {
                let col = rng.random_range(0..cols);
                (
                    ray((0, col.into()), (1, slant), rows, cols),
                    LineKey::DiagonalFromTop(col),
                )
            }
            1 => {
                let col = rng.random_range(0..cols);
                (
                    ray((i32::from(rows) - 1, col.into()), (-1, slant), rows, cols),
                    LineKey::DiagonalFromBottom(col),
                )
            }
            2 => {
                let row = rng.random_range(0..rows);
                (
                    ray((row.into(), 0), (slant, 1), rows, cols),
                    LineKey::DiagonalFromLeft(row),
                )
            }
            _ => {
                let row = rng.random_range(0..rows);
                (
                    ray((row.into(), i32::from(cols) - 1), (slant, -1), rows, cols),
                    LineKey::DiagonalFromRight(row),
                )
            }
        }
    } else {
        let edge_points: [Pos; 4] = [
            (0, rng.random_range(0..cols)),
            (rows - 1, rng.random_range(0..cols)),
            (rng.random_range(0..rows), 0),
            (rng.random_range(0..rows), cols - 1),
        ];
        let start = edge_points[rng.random_range(0..edge_points.len())];
        let end = edge_points[rng.random_range(0..edge_points.len())];
        (
            bresenham(
                (start.0.into(), start.1.into()),
                (end.0.into(), end.1.into()),
                rows,
                cols,
            ),
            LineKey::Segment(start, end),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(rows: Coord, cols: Coord, mines: CellCount, exclude: Pos, seed: u64) -> Board {
        let board = Board::empty(rows, cols);
        LinesPattern.place_mines(
            &board,
            &PlacementRequest {
                mines,
                exclude,
                seed,
            },
        )
    }

    fn brute_force_neighbor_count(board: &Board, pos: Pos) -> u8 {
        let (rows, cols) = board.size();
        let mut count = 0;
        for row in pos.0.saturating_sub(1)..=(pos.0 + 1).min(rows - 1) {
            for col in pos.1.saturating_sub(1)..=(pos.1 + 1).min(cols - 1) {
                if (row, col) != pos && board[(row, col)].is_mine {
                    count += 1;
                }
            }
        }
        count
    }

    #[test]
    fn exact_count_and_safe_zone_across_seeds() {
        for seed in 0..16 {
            let board = place(12, 12, 20, (6, 6), seed);
            assert_eq!(board.mine_count(), 20, "seed {}", seed);
            for row in 5..=7 {
                for col in 5..=7 {
                    assert!(!board[(row, col)].is_mine, "seed {}", seed);
                }
            }
        }
    }

    #[test]
    fn neighbor_counts_match_brute_force() {
        let board = place(12, 12, 20, (6, 6), 11);
        for (pos, cell) in board.iter_cells() {
            if !cell.is_mine {
                assert_eq!(
                    cell.neighbor_mines,
                    brute_force_neighbor_count(&board, pos),
                    "at {:?}",
                    pos
                );
            }
        }
    }

    #[test]
    fn fallback_fill_reaches_high_density() {
        // 85% of a 16x16 board leaves no room for geometry alone
        let board = place(16, 16, 217, (8, 8), 3);
        assert_eq!(board.mine_count(), 217);
        for row in 7..=9 {
            for col in 7..=9 {
                assert!(!board[(row, col)].is_mine);
            }
        }
    }

    #[test]
    fn small_board_stays_exact() {
        for seed in 0..8 {
            let board = place(5, 5, 5, (2, 2), seed);
            assert_eq!(board.mine_count(), 5, "seed {}", seed);
        }
    }

    #[test]
    fn same_seed_is_deterministic() {
        assert_eq!(place(12, 12, 20, (6, 6), 9), place(12, 12, 20, (6, 6), 9));
    }

    #[test]
    fn bresenham_connects_corners() {
        let line = bresenham((0, 0), (4, 4), 5, 5);
        assert_eq!(line.first(), Some(&(0, 0)));
        assert_eq!(line.last(), Some(&(4, 4)));
        assert_eq!(line.len(), 5);
    }

    #[test]
    fn bresenham_skips_out_of_bounds_cells() {
        // aim past the edge, keep only in-board cells
        let line = bresenham((2, 2), (2, 10), 5, 5);
        assert!(line.iter().all(|&(_, col)| col < 5));
        assert_eq!(line.len(), 3);
    }

    #[test]
    fn ray_stops_at_board_edge() {
        let line = ray((0, 0), (1, 1), 5, 5);
        assert_eq!(line, vec![(0, 0), (1, 1), (2, 2), (3, 3), (4, 4)]);
    }
}
