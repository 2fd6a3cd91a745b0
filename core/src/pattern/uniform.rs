use rand::prelude::*;

use super::*;

/// Uniform scatter: rejection-samples positions outside the safe zone
/// until the quota is met.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct UniformPattern;

impl MinePlacementPattern for UniformPattern {
    fn place_mines(&self, board: &Board, request: &PlacementRequest) -> Board {
        let mut next = board.clone();
        let (rows, cols) = next.size();
        let safe = SafeZone::new(request.exclude);

        // Mine bounds are the configuration layer's contract; clamp anyway
        // so a violating request degrades instead of spinning forever.
        let capacity: CellCount = placeable_positions(&next, &safe)
            .len()
            .try_into()
            .unwrap();
        let quota = if request.mines > capacity {
            log::warn!(
                "requested {} mines but only {} cells are placeable, clamping",
                request.mines,
                capacity
            );
            capacity
        } else {
            request.mines
        };

        let mut rng = SmallRng::seed_from_u64(request.seed);
        let mut placed: CellCount = 0;
        while placed < quota {
            let pos = (rng.random_range(0..rows), rng.random_range(0..cols));
            if !next[pos].is_mine && !safe.contains(pos) {
                next.cell_mut(pos).is_mine = true;
                placed += 1;
            }
        }

        next.recount_neighbors();
        next
    }
}
