use serde::{Serialize, Deserialize};

use super::Direction;

/// Width and height of the board. Fixed for the lifetime of a session.
pub const GRID_SIZE: usize = 4;

/// A cell coordinate. `x` is the row, `y` the column.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

/// A cell whose value differs between two grids.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct CellChange {
    pub position: Position,
    pub before: u32,
    pub after: u32,
}

/// The 4x4 board. Each cell is 0 (empty) or a power of two >= 2.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct Grid {
    cells: [[u32; GRID_SIZE]; GRID_SIZE],
}

impl Grid {
    /// Creates a grid with every cell empty.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: [[u32; GRID_SIZE]; GRID_SIZE]) -> Self {
        Self { cells: rows }
    }

    pub fn rows(&self) -> &[[u32; GRID_SIZE]; GRID_SIZE] {
        &self.cells
    }

    pub fn get(&self, pos: Position) -> u32 {
        self.cells[pos.x][pos.y]
    }

    pub fn set(&mut self, pos: Position, value: u32) {
        self.cells[pos.x][pos.y] = value;
    }

    pub fn is_empty_cell(&self, x: usize, y: usize) -> bool {
        self.cells[x][y] == 0
    }

    /// Lazily yields every empty cell in row-major order.
    pub fn empty_cells(&self) -> impl Iterator<Item = Position> + '_ {
        self.cells().filter(|&(_, value)| value == 0).map(|(pos, _)| pos)
    }

    /// Yields every cell with its value in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (Position, u32)> + '_ {
        self.cells.iter().enumerate().flat_map(|(x, row)| {
            row.iter().enumerate().map(move |(y, &value)| (Position::new(x, y), value))
        })
    }

    pub fn tile_count(&self) -> usize {
        self.cells().filter(|&(_, value)| value != 0).count()
    }

    pub fn tile_sum(&self) -> u32 {
        self.cells().map(|(_, value)| value).sum()
    }

    pub fn max_tile(&self) -> u32 {
        self.cells().map(|(_, value)| value).max().unwrap_or(0)
    }

    /// Positions of one row or column, ordered in the direction of travel so that
    /// index 0 is the cell tiles slide towards.
    pub fn line_positions(direction: Direction, index: usize) -> [Position; GRID_SIZE] {
        let last = GRID_SIZE - 1;
        std::array::from_fn(|i| match direction {
            Direction::Left => Position::new(index, i),
            Direction::Right => Position::new(index, last - i),
            Direction::Up => Position::new(i, index),
            Direction::Down => Position::new(last - i, index),
        })
    }

    /// Reads a line oriented in the direction of travel.
    pub fn line(&self, direction: Direction, index: usize) -> [u32; GRID_SIZE] {
        Self::line_positions(direction, index).map(|pos| self.get(pos))
    }

    /// Writes back a line produced by [`Grid::line`] for the same direction.
    pub fn set_line(&mut self, direction: Direction, index: usize, line: [u32; GRID_SIZE]) {
        for (pos, value) in Self::line_positions(direction, index).into_iter().zip(line) {
            self.set(pos, value);
        }
    }

    /// Cells that differ from `previous`, in row-major order. Presentation layers use
    /// this to decide which tiles to rebuild or animate.
    pub fn changed_cells(&self, previous: &Grid) -> Vec<CellChange> {
        self.cells()
            .zip(previous.cells())
            .filter(|((_, after), (_, before))| after != before)
            .map(|((position, after), (_, before))| CellChange { position, before, after })
            .collect()
    }

    /// Board as nested rows with `None` for empty cells, the shape clients render.
    pub fn to_board(&self) -> Vec<Vec<Option<u32>>> {
        self.cells
            .iter()
            .map(|row| row.iter().map(|&v| if v == 0 { None } else { Some(v) }).collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_grid_is_empty() {
        let grid = Grid::new();
        assert_eq!(grid.tile_count(), 0);
        assert_eq!(grid.empty_cells().count(), 16);
        assert!(grid.is_empty_cell(3, 3));
    }

    #[test]
    fn test_empty_cells_row_major() {
        let grid = Grid::from_rows([
            [2, 0, 2, 2],
            [2, 2, 2, 2],
            [2, 2, 2, 0],
            [0, 2, 2, 2],
        ]);
        let empties: Vec<Position> = grid.empty_cells().collect();
        assert_eq!(empties, vec![Position::new(0, 1), Position::new(2, 3), Position::new(3, 0)]);
    }

    #[test]
    fn test_line_orientation() {
        let grid = Grid::from_rows([
            [1, 2, 3, 4],
            [5, 6, 7, 8],
            [9, 10, 11, 12],
            [13, 14, 15, 16],
        ]);
        assert_eq!(grid.line(Direction::Left, 1), [5, 6, 7, 8]);
        assert_eq!(grid.line(Direction::Right, 1), [8, 7, 6, 5]);
        assert_eq!(grid.line(Direction::Up, 2), [3, 7, 11, 15]);
        assert_eq!(grid.line(Direction::Down, 2), [15, 11, 7, 3]);
    }

    #[test]
    fn test_set_line_restores_orientation() {
        let mut grid = Grid::new();
        grid.set_line(Direction::Down, 0, [2, 4, 0, 0]);
        assert_eq!(grid.get(Position::new(3, 0)), 2);
        assert_eq!(grid.get(Position::new(2, 0)), 4);
        assert_eq!(grid.tile_count(), 2);
    }

    #[test]
    fn test_changed_cells() {
        let before = Grid::from_rows([[2, 2, 0, 0], [0; 4], [0; 4], [0; 4]]);
        let after = Grid::from_rows([[4, 0, 0, 0], [0; 4], [0; 4], [0; 4]]);
        let changes = after.changed_cells(&before);
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0], CellChange { position: Position::new(0, 0), before: 2, after: 4 });
        assert_eq!(changes[1], CellChange { position: Position::new(0, 1), before: 2, after: 0 });
    }

    #[test]
    fn test_to_board() {
        let grid = Grid::from_rows([[2, 0, 0, 0], [0; 4], [0; 4], [0, 0, 0, 8]]);
        let board = grid.to_board();
        assert_eq!(board[0], vec![Some(2), None, None, None]);
        assert_eq!(board[3][3], Some(8));
        assert_eq!(grid.max_tile(), 8);
    }
}
