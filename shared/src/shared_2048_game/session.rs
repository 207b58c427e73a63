use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Serialize, Deserialize};
use std::time::{SystemTime, UNIX_EPOCH};

use super::grid::{Grid, Position};
use super::history::History;
use super::moves::apply_move;
use super::terminal::is_terminal;
use super::Direction;

/// Chance that a spawned tile is a 2 rather than a 4.
pub const TWO_TILE_PROBABILITY: f64 = 0.9;
pub const STARTING_TILES: usize = 2;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    /// A move has been committed and its random tile has not been spawned yet.
    MoveInFlight,
    GameOver,
}

/// Which sound a presentation layer should play for a transition.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    Move,
    Merge,
    GameOver,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct MoveReport {
    pub moved: bool,
    pub merge_occurred: bool,
    pub score_delta: u32,
    pub cue: Cue,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct TurnReport {
    pub spawned: Option<(Position, u32)>,
    pub game_over: bool,
    pub cue: Option<Cue>,
}

/// Game state handed to clients.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PublicGame2048 {
    pub board: Vec<Vec<Option<u32>>>,
    pub score: u32,
    pub high_score: u32,
    pub move_count: u32,
    pub game_over: bool,
    pub in_flight: bool,
    pub can_undo: bool,
    pub max_tile: u32,
    /// Unix seconds when the current game was dealt.
    pub started_at: u64,
}

/// One play session. Owns the board, score and undo history; everything else only
/// sees copies.
#[derive(Clone)]
pub struct Game2048<R = StdRng> {
    grid: Grid,
    score: u32,
    high_score: u32,
    move_count: u32,
    started_at: u64,
    phase: Phase,
    history: History,
    rng: R,
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

impl Game2048<StdRng> {
    /// Starts a new game with two random tiles, seeded from the OS.
    pub fn new(high_score: u32) -> Self {
        Self::with_rng(StdRng::from_entropy(), high_score)
    }
}

impl<R: Rng> Game2048<R> {
    pub fn with_rng(rng: R, high_score: u32) -> Self {
        let mut game = Self::from_grid(Grid::new(), rng, high_score);
        game.reset();
        game
    }

    /// Builds a session around an existing board without spawning anything.
    pub fn from_grid(grid: Grid, rng: R, high_score: u32) -> Self {
        let phase = if is_terminal(&grid) { Phase::GameOver } else { Phase::Idle };
        Self {
            grid,
            score: 0,
            high_score,
            move_count: 0,
            started_at: unix_now(),
            phase,
            history: History::new(),
            rng,
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn high_score(&self) -> u32 {
        self.high_score
    }

    pub fn move_count(&self) -> u32 {
        self.move_count
    }

    /// Seconds since the current game was dealt.
    pub fn elapsed_secs(&self) -> u64 {
        unix_now().saturating_sub(self.started_at)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_game_over(&self) -> bool {
        self.phase == Phase::GameOver
    }

    pub fn is_in_flight(&self) -> bool {
        self.phase == Phase::MoveInFlight
    }

    pub fn can_undo(&self) -> bool {
        !self.is_in_flight() && !self.history.is_empty()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// First half of a turn: slides the board. Returns `None` and leaves the state alone
    /// when the move is rejected (turn in flight, game over) or changes nothing.
    /// On success the session stays locked until [`Game2048::resolve_turn`] runs.
    pub fn commit_move(&mut self, direction: Direction) -> Option<MoveReport> {
        if self.phase != Phase::Idle {
            return None;
        }

        let outcome = apply_move(&self.grid, direction);
        if !outcome.moved {
            return None;
        }

        self.history.snapshot(&self.grid, self.score);
        self.move_count += 1;
        self.score += outcome.score_delta;
        self.high_score = self.high_score.max(self.score);
        self.grid = outcome.grid;
        self.phase = Phase::MoveInFlight;

        debug!(
            "committed {:?}: +{} (score {}, move {})",
            direction, outcome.score_delta, self.score, self.move_count
        );

        Some(MoveReport {
            moved: true,
            merge_occurred: outcome.merge_occurred,
            score_delta: outcome.score_delta,
            cue: if outcome.merge_occurred { Cue::Merge } else { Cue::Move },
        })
    }

    /// Second half of a turn: spawns the random tile and checks for game over.
    /// Returns `None` if no move is waiting to be resolved.
    pub fn resolve_turn(&mut self) -> Option<TurnReport> {
        if self.phase != Phase::MoveInFlight {
            return None;
        }

        let spawned = self.add_random_tile();
        let game_over = is_terminal(&self.grid);
        self.phase = if game_over { Phase::GameOver } else { Phase::Idle };

        if game_over {
            debug!("game over with score {} after {} moves", self.score, self.move_count);
        }

        Some(TurnReport {
            spawned,
            game_over,
            cue: game_over.then_some(Cue::GameOver),
        })
    }

    /// Commits and resolves a move in one go, for callers with no animation delay.
    pub fn apply_move(&mut self, direction: Direction) -> Option<(MoveReport, TurnReport)> {
        let report = self.commit_move(direction)?;
        let turn = self.resolve_turn()?;
        Some((report, turn))
    }

    /// Restores the board and score from before the last committed move. Allowed after
    /// game over, which it leaves. Returns false while a move is in flight or when there
    /// is no history.
    pub fn undo(&mut self) -> bool {
        if self.phase == Phase::MoveInFlight {
            return false;
        }
        let Some(snapshot) = self.history.undo() else {
            return false;
        };

        self.grid = snapshot.grid;
        self.score = snapshot.score;
        self.phase = Phase::Idle;
        debug!("undo to score {} ({} steps left)", self.score, self.history.len());
        true
    }

    /// Clears the board, score, move count and history and deals two fresh tiles.
    /// Always legal, including mid-turn.
    pub fn reset(&mut self) {
        self.grid = Grid::new();
        self.score = 0;
        self.move_count = 0;
        self.started_at = unix_now();
        self.history.clear();
        self.phase = Phase::Idle;
        for _ in 0..STARTING_TILES {
            self.add_random_tile();
        }
        debug!("new game");
    }

    /// Places a 2 (90%) or a 4 (10%) on a uniformly chosen empty cell. Does nothing on a
    /// full board.
    pub fn add_random_tile(&mut self) -> Option<(Position, u32)> {
        let empties: Vec<Position> = self.grid.empty_cells().collect();
        let &pos = empties.choose(&mut self.rng)?;
        let value = if self.rng.gen_bool(TWO_TILE_PROBABILITY) { 2 } else { 4 };
        self.grid.set(pos, value);
        Some((pos, value))
    }

    /// Returns a public representation of the game state for frontend consumption.
    pub fn to_public(&self) -> PublicGame2048 {
        PublicGame2048 {
            board: self.grid.to_board(),
            score: self.score,
            high_score: self.high_score,
            move_count: self.move_count,
            game_over: self.is_game_over(),
            in_flight: self.is_in_flight(),
            can_undo: self.can_undo(),
            max_tile: self.grid.max_tile(),
            started_at: self.started_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(2048)
    }

    fn game_from(rows: [[u32; 4]; 4]) -> Game2048 {
        Game2048::from_grid(Grid::from_rows(rows), rng(), 0)
    }

    /// Board one left move away from a dead end: the spawned tile fills (3, 3) next to a
    /// 16 and a 128, so neither a 2 nor a 4 can pair up.
    fn almost_over() -> Game2048 {
        game_from([
            [2, 4, 8, 16],
            [4, 8, 16, 32],
            [2, 4, 8, 16],
            [0, 32, 64, 128],
        ])
    }

    fn commit_any(game: &mut Game2048) -> Option<MoveReport> {
        Direction::ALL.iter().find_map(|&d| game.commit_move(d))
    }

    #[test]
    fn test_new_game_has_two_tiles() {
        let game = Game2048::with_rng(rng(), 0);
        let tiles: Vec<u32> = game.grid().cells().map(|(_, v)| v).filter(|&v| v != 0).collect();
        assert_eq!(tiles.len(), 2);
        assert!(tiles.iter().all(|&v| v == 2 || v == 4));
        assert_eq!(game.phase(), Phase::Idle);
        assert_eq!(game.score(), 0);
    }

    #[test]
    fn test_add_random_tile_twice_on_empty_grid() {
        let mut game = Game2048::from_grid(Grid::new(), rng(), 0);
        let first = game.add_random_tile().unwrap();
        let second = game.add_random_tile().unwrap();
        assert_ne!(first.0, second.0);
        assert_eq!(game.grid().tile_count(), 2);
        assert!(game.grid().cells().all(|(_, v)| v == 0 || v == 2 || v == 4));
    }

    #[test]
    fn test_add_random_tile_on_full_board_is_noop() {
        let rows = [[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]];
        let mut game = game_from(rows);
        assert_eq!(game.add_random_tile(), None);
        assert_eq!(game.grid(), &Grid::from_rows(rows));
    }

    #[test]
    fn test_spawn_distribution_mostly_twos() {
        let mut game = Game2048::from_grid(Grid::new(), rng(), 0);
        let mut twos = 0;
        for _ in 0..1000 {
            let (pos, value) = game.add_random_tile().unwrap();
            if value == 2 {
                twos += 1;
            }
            game.grid.set(pos, 0);
        }
        assert!((850..=950).contains(&twos), "got {} twos", twos);
    }

    #[test]
    fn test_two_phase_turn() {
        let mut game = game_from([[2, 2, 0, 0], [0; 4], [0; 4], [0; 4]]);
        let report = game.commit_move(Direction::Left).unwrap();
        assert!(report.moved);
        assert_eq!(report.score_delta, 4);
        assert_eq!(report.cue, Cue::Merge);

        // Committed, tile not yet spawned.
        assert_eq!(game.phase(), Phase::MoveInFlight);
        assert_eq!(game.grid().tile_count(), 1);
        assert_eq!(game.score(), 4);
        assert_eq!(game.move_count(), 1);

        let turn = game.resolve_turn().unwrap();
        assert!(turn.spawned.is_some());
        assert!(!turn.game_over);
        assert_eq!(turn.cue, None);
        assert_eq!(game.phase(), Phase::Idle);
        assert_eq!(game.grid().tile_count(), 2);

        assert_eq!(game.resolve_turn(), None);
    }

    #[test]
    fn test_moves_rejected_while_in_flight() {
        let mut game = game_from([[2, 2, 0, 0], [0; 4], [0; 4], [0; 4]]);
        game.commit_move(Direction::Left).unwrap();
        let grid = *game.grid();

        assert_eq!(game.commit_move(Direction::Right), None);
        assert!(!game.undo());
        assert_eq!(game.grid(), &grid);
        assert_eq!(game.move_count(), 1);
    }

    #[test]
    fn test_no_op_move_changes_nothing() {
        let mut game = game_from([[2, 4, 0, 0], [0; 4], [0; 4], [0; 4]]);
        assert_eq!(game.commit_move(Direction::Left), None);
        assert_eq!(game.phase(), Phase::Idle);
        assert_eq!(game.move_count(), 0);
        assert_eq!(game.history_len(), 0);
        assert_eq!(game.grid().tile_count(), 2);
    }

    #[test]
    fn test_game_over_checked_after_spawn() {
        let mut game = almost_over();
        let (report, turn) = game.apply_move(Direction::Left).unwrap();
        assert!(report.moved);
        assert_eq!(turn.spawned.map(|(pos, _)| pos), Some(Position::new(3, 3)));
        assert!(turn.game_over);
        assert_eq!(turn.cue, Some(Cue::GameOver));
        assert!(game.is_game_over());

        assert_eq!(game.commit_move(Direction::Right), None);
        assert_eq!(game.commit_move(Direction::Up), None);
    }

    #[test]
    fn test_undo_leaves_game_over() {
        let mut game = almost_over();
        let before = *game.grid();
        game.apply_move(Direction::Left).unwrap();
        assert!(game.is_game_over());

        assert!(game.undo());
        assert_eq!(game.phase(), Phase::Idle);
        assert_eq!(game.grid(), &before);
        assert_eq!(game.score(), 0);
        assert!(game.commit_move(Direction::Left).is_some());
    }

    #[test]
    fn test_undo_restores_resolved_turns() {
        let mut game = Game2048::with_rng(rng(), 0);
        let mut saved = Vec::new();
        for _ in 0..5 {
            let state = (*game.grid(), game.score());
            if commit_any(&mut game).is_none() {
                break;
            }
            saved.push(state);
            game.resolve_turn().unwrap();
        }
        assert!(!saved.is_empty());
        let moves = game.move_count();

        while let Some((grid, score)) = saved.pop() {
            assert!(game.undo());
            assert_eq!(game.grid(), &grid);
            assert_eq!(game.score(), score);
        }
        assert!(!game.undo());
        assert_eq!(game.move_count(), moves);
    }

    #[test]
    fn test_undo_bounded_to_ten_steps() {
        let mut game = Game2048::with_rng(rng(), 0);
        let mut committed = 0;
        while committed < 14 {
            if game.is_game_over() {
                game.reset();
                committed = 0;
            }
            if commit_any(&mut game).is_some() {
                committed += 1;
                game.resolve_turn().unwrap();
            }
        }

        let mut undone = 0;
        while game.undo() {
            undone += 1;
        }
        assert_eq!(undone, 10);
    }

    #[test]
    fn test_undo_with_empty_history() {
        let mut game = Game2048::with_rng(rng(), 0);
        let grid = *game.grid();
        assert!(!game.undo());
        assert_eq!(game.grid(), &grid);
    }

    #[test]
    fn test_high_score_tracks_best_score() {
        let mut game = Game2048::from_grid(
            Grid::from_rows([[8, 8, 0, 0], [0; 4], [0; 4], [0; 4]]),
            rng(),
            10,
        );
        game.apply_move(Direction::Left).unwrap();
        assert_eq!(game.score(), 16);
        assert_eq!(game.high_score(), 16);

        assert!(game.undo());
        assert_eq!(game.score(), 0);
        assert_eq!(game.high_score(), 16);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut game = game_from([[2, 2, 0, 0], [0; 4], [0; 4], [0; 4]]);
        game.commit_move(Direction::Left).unwrap();
        game.reset();

        assert_eq!(game.phase(), Phase::Idle);
        assert_eq!(game.score(), 0);
        assert_eq!(game.move_count(), 0);
        assert_eq!(game.history_len(), 0);
        assert_eq!(game.grid().tile_count(), 2);
        assert_eq!(game.resolve_turn(), None);
    }

    #[test]
    fn test_reset_restarts_play_clock() {
        let mut game = game_from([[2, 2, 0, 0], [0; 4], [0; 4], [0; 4]]);
        game.started_at -= 90;
        assert!(game.elapsed_secs() >= 90);
        assert_eq!(game.to_public().started_at, game.started_at);

        let before = game.started_at;
        game.reset();
        assert!(game.started_at >= before + 90);
        assert!(game.elapsed_secs() < 90);
        assert_eq!(game.to_public().started_at, game.started_at);
    }

    #[test]
    fn test_to_public() {
        let mut game = game_from([[2, 2, 0, 0], [0; 4], [0; 4], [0; 4]]);
        game.commit_move(Direction::Left).unwrap();
        let public = game.to_public();
        assert_eq!(public.board[0], vec![Some(4), None, None, None]);
        assert_eq!(public.score, 4);
        assert_eq!(public.move_count, 1);
        assert!(public.in_flight);
        assert!(!public.can_undo);
        assert!(!public.game_over);
        assert_eq!(public.max_tile, 4);
    }
}
