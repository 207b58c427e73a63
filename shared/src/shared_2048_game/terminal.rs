use super::grid::{Grid, GRID_SIZE};

/// Returns true when no move can change the board: every cell is filled and no two
/// orthogonal neighbours share a value.
pub fn is_terminal(grid: &Grid) -> bool {
    if grid.empty_cells().next().is_some() {
        return false;
    }

    let rows = grid.rows();
    for x in 0..GRID_SIZE {
        for y in 0..GRID_SIZE {
            let value = rows[x][y];
            // Right
            if y + 1 < GRID_SIZE && rows[x][y + 1] == value {
                return false;
            }
            // Down
            if x + 1 < GRID_SIZE && rows[x + 1][y] == value {
                return false;
            }
        }
    }
    true
}
