//! Rules of 2048: the board, sliding and merging, game-over detection, undo history and
//! the turn-by-turn session that ties them together.

use serde::{Serialize, Deserialize};

pub mod grid;
pub mod history;
pub mod moves;
pub mod preferences;
pub mod session;
pub mod terminal;

pub use grid::{CellChange, Grid, Position, GRID_SIZE};
pub use history::{History, Snapshot, MAX_UNDO_STEPS};
pub use moves::{apply_move, slide, MoveOutcome};
pub use preferences::{MemoryPreferenceStore, PreferenceStore, Preferences};
pub use session::{Cue, Game2048, MoveReport, Phase, PublicGame2048, TurnReport};
pub use terminal::is_terminal;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Down, Direction::Left, Direction::Right];

    /// Maps a direction name or arrow key name to a direction. Anything else is `None`,
    /// which callers treat as a no-op.
    pub fn from_key(key: &str) -> Option<Self> {
        match key.trim().to_ascii_lowercase().as_str() {
            "up" | "arrowup" => Some(Direction::Up),
            "down" | "arrowdown" => Some(Direction::Down),
            "left" | "arrowleft" => Some(Direction::Left),
            "right" | "arrowright" => Some(Direction::Right),
            _ => None,
        }
    }
}
