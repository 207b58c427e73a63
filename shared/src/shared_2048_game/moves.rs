use super::grid::{Grid, GRID_SIZE};
use super::Direction;

/// Result of applying one direction to a whole grid. The input grid is left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOutcome {
    pub grid: Grid,
    pub moved: bool,
    pub score_delta: u32,
    pub merge_occurred: bool,
}

/// Slides a single line towards index 0: compact, merge equal neighbours once, compact
/// again and pad with zeros. Returns the new line along with the score gained from merges.
pub fn slide(line: [u32; GRID_SIZE]) -> ([u32; GRID_SIZE], u32) {
    let mut compacted: Vec<u32> = line.iter().copied().filter(|&v| v != 0).collect();
    let mut score_delta = 0;

    for i in 0..compacted.len().saturating_sub(1) {
        if compacted[i] != 0 && compacted[i] == compacted[i + 1] {
            compacted[i] *= 2;
            compacted[i + 1] = 0;
            score_delta += compacted[i];
        }
    }

    let mut result = [0; GRID_SIZE];
    for (slot, value) in result.iter_mut().zip(compacted.into_iter().filter(|&v| v != 0)) {
        *slot = value;
    }
    (result, score_delta)
}

/// Applies a move to every row (left/right) or column (up/down) of `grid`.
pub fn apply_move(grid: &Grid, direction: Direction) -> MoveOutcome {
    let mut next = *grid;
    let mut moved = false;
    let mut merge_occurred = false;
    let mut score_delta = 0;

    for index in 0..GRID_SIZE {
        let original = grid.line(direction, index);
        let (line, gained) = slide(original);
        score_delta += gained;

        if line != original {
            moved = true;
            // A cell that grew counts, including a tile sliding into an empty slot.
            if line.iter().zip(original.iter()).any(|(after, before)| after > before) {
                merge_occurred = true;
            }
        }
        next.set_line(direction, index, line);
    }

    MoveOutcome {
        grid: next,
        moved,
        score_delta,
        merge_occurred,
    }
}

/// Whether `direction` would change the grid.
#[cfg(test)]
pub(crate) fn can_move(grid: &Grid, direction: Direction) -> bool {
    apply_move(grid, direction).moved
}
