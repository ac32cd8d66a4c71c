use std::fmt;
use std::str::FromStr;

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::EngineError;
use crate::record::GameState;
use crate::store::Store;

/// A direction to move/merge tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Move {
    Up,
    Down,
    Left,
    Right,
}

impl Move {
    pub const ALL: [Move; 4] = [Move::Up, Move::Down, Move::Left, Move::Right];

    /// Unit step `(dx, dy)` towards the wall tiles slide against.
    #[inline]
    fn delta(self) -> (i32, i32) {
        match self {
            Move::Up => (0, -1),
            Move::Down => (0, 1),
            Move::Left => (-1, 0),
            Move::Right => (1, 0),
        }
    }

    /// True when the target wall sits at low indices, so traversal runs 0..16.
    #[inline]
    fn towards_origin(self) -> bool {
        matches!(self, Move::Up | Move::Left)
    }
}

impl FromStr for Move {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "u" | "up" => Ok(Move::Up),
            "d" | "down" => Ok(Move::Down),
            "l" | "left" => Ok(Move::Left),
            "r" | "right" => Ok(Move::Right),
            _ => Err(EngineError::InvalidMove(s.to_string())),
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Move::Up => "up",
            Move::Down => "down",
            Move::Left => "left",
            Move::Right => "right",
        };
        f.write_str(name)
    }
}

/// Outcome of a processed move. Win and loss are values, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveResult {
    Continue,
    Win,
    Lose,
}

/// Displayed tile values indexed `[row][col]`; 0 is an empty cell.
pub type Snapshot = [[u32; 4]; 4];

type BoardRaw = u64;
type Exponent = u8;

const EIGHT: Exponent = 3;
const WINNING_TILE: Exponent = 11;
/// Largest exponent a 4-bit cell can hold (32768).
pub const MAX_EXPONENT: Exponent = 15;

/// Packed 4x4 board as 16 4-bit exponents in a `u64`, row-major from the high nibble.
///
/// A nibble `e` displays as `2^e`, and 0 marks an empty cell.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Board(BoardRaw);

/// Result of sliding and merging a board in one direction, before any spawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub board: Board,
    /// Sum of the values created by merges.
    pub score: u32,
    pub changed: bool,
    pub reached_eight: bool,
    pub reached_2048: bool,
}

impl Board {
    /// A constant empty board (all zeros).
    pub const EMPTY: Board = Board(0);

    /// Construct a `Board` from its raw packed representation.
    #[inline]
    pub fn from_raw(raw: BoardRaw) -> Self { Board(raw) }

    /// Borrow the raw packed `u64` for this `Board`.
    #[inline]
    pub fn raw(&self) -> BoardRaw { self.0 }

    /// Build a board from 16 row-major exponents.
    ///
    /// Fails with the index of the first exponent above [`MAX_EXPONENT`].
    pub fn from_exponents(exponents: [Exponent; 16]) -> Result<Board, usize> {
        let mut board = Board::EMPTY;
        for (idx, &e) in exponents.iter().enumerate() {
            if e > MAX_EXPONENT {
                return Err(idx);
            }
            board.set_exponent(idx, e);
        }
        Ok(board)
    }

    /// The 16 cell exponents in row-major order.
    pub fn exponents(self) -> [Exponent; 16] {
        let mut out = [0; 16];
        for (idx, e) in out.iter_mut().enumerate() {
            *e = self.exponent(idx);
        }
        out
    }

    /// Build a board from displayed values.
    ///
    /// # Panics
    /// If any value is neither 0 nor a power of two in `2..=32768`.
    pub fn from_values(values: Snapshot) -> Board {
        let mut board = Board::EMPTY;
        for (row, line) in values.iter().enumerate() {
            for (col, &value) in line.iter().enumerate() {
                board.set_value(row * 4 + col, value);
            }
        }
        board
    }

    /// Set the displayed value at `idx` (0 clears the cell).
    ///
    /// # Panics
    /// If `value` is neither 0 nor a power of two in `2..=32768`.
    pub fn set_value(&mut self, idx: usize, value: u32) {
        self.set_exponent(idx, exponent_of(value));
    }

    /// Get the actual value at index (2^exponent stored at nibble, 0 if empty).
    ///
    /// Index runs 0..16 row-major.
    #[inline]
    pub fn tile_value(self, idx: usize) -> u32 { value_of(self.exponent(idx)) }

    #[inline]
    pub fn exponent(self, idx: usize) -> Exponent {
        ((self.0 >> (60 - 4 * idx)) & 0xf) as Exponent
    }

    #[inline]
    fn set_exponent(&mut self, idx: usize, e: Exponent) {
        debug_assert!(e <= MAX_EXPONENT);
        let shift = 60 - 4 * idx;
        self.0 = (self.0 & !(0xf_u64 << shift)) | ((e as BoardRaw) << shift);
    }

    /// Count the number of empty cells on the board.
    #[inline]
    pub fn count_empty(self) -> u32 { 16 - count_non_empty(self) }

    /// Return the highest tile value present on the board (0 if empty).
    pub fn highest_tile(self) -> u32 {
        (0..16).map(|idx| self.tile_value(idx)).max().unwrap_or(0)
    }

    /// Copy of the displayed values, `[row][col]`.
    pub fn snapshot(self) -> Snapshot {
        let mut out = [[0; 4]; 4];
        for (row, line) in out.iter_mut().enumerate() {
            for (col, cell) in line.iter_mut().enumerate() {
                *cell = self.tile_value(row * 4 + col);
            }
        }
        out
    }

    /// True if a cell is empty or two orthogonally adjacent cells hold equal values
    /// that can still merge (a pair of 32768s cannot).
    pub fn has_moves(self) -> bool {
        if self.count_empty() > 0 {
            return true;
        }
        for row in 0..4 {
            for col in 0..4 {
                let e = self.exponent(row * 4 + col);
                if e == MAX_EXPONENT {
                    continue;
                }
                if col < 3 && e == self.exponent(row * 4 + col + 1) {
                    return true;
                }
                if row < 3 && e == self.exponent((row + 1) * 4 + col) {
                    return true;
                }
            }
        }
        false
    }

    /// Slide and merge every tile in `dir`. No randomness.
    ///
    /// Cells are visited starting from the row or column nearest the target wall, so a
    /// tile always slides against neighbours that have already settled. A tile created
    /// by a merge is marked and cannot merge again during the same pass.
    ///
    /// ```
    /// use game_2048::{Board, Move};
    /// let b = Board::from_values([[2, 2, 2, 2], [0; 4], [0; 4], [0; 4]]);
    /// let r = b.resolve(Move::Left);
    /// assert_eq!(r.board.snapshot()[0], [4, 4, 0, 0]);
    /// assert_eq!(r.score, 8);
    /// ```
    pub fn resolve(self, dir: Move) -> Resolution {
        let (dx, dy) = dir.delta();
        let mut board = self;
        let mut merged: u16 = 0;
        let mut out = Resolution {
            board: self,
            score: 0,
            changed: false,
            reached_eight: false,
            reached_2048: false,
        };

        for step in 0..16 {
            let idx = if dir.towards_origin() { step } else { 15 - step };
            let e = board.exponent(idx);
            if e == 0 {
                continue;
            }
            let (x, y) = ((idx % 4) as i32, (idx / 4) as i32);
            let (mut nx, mut ny) = (x + dx, y + dy);
            while in_bounds(nx, ny) && board.exponent(cell_index(nx, ny)) == 0 {
                nx += dx;
                ny += dy;
            }

            if in_bounds(nx, ny) {
                let target = cell_index(nx, ny);
                if board.exponent(target) == e && merged & (1 << target) == 0 && e < MAX_EXPONENT {
                    let grown = e + 1;
                    board.set_exponent(target, grown);
                    board.set_exponent(idx, 0);
                    merged |= 1 << target;
                    out.score += value_of(grown);
                    out.changed = true;
                    out.reached_eight |= grown == EIGHT;
                    out.reached_2048 |= grown == WINNING_TILE;
                    continue;
                }
            }

            let (sx, sy) = (nx - dx, ny - dy);
            if (sx, sy) != (x, y) {
                board.set_exponent(cell_index(sx, sy), e);
                board.set_exponent(idx, 0);
                out.changed = true;
            }
        }

        out.board = board;
        out
    }

    /// Place one tile in a uniformly chosen empty cell; a full board is returned as is.
    ///
    /// The tile is always a 2 until `reached_eight`, after which it is a 4 one time in ten.
    pub fn with_random_tile<R: Rng + ?Sized>(self, rng: &mut R, reached_eight: bool) -> Self {
        if self.count_empty() == 0 {
            return self;
        }
        let e = if reached_eight && rng.gen_range(0..100) >= 90 { 2 } else { 1 };
        loop {
            let x = rng.gen_range(0..4);
            let y = rng.gen_range(0..4);
            let idx = cell_index(x, y);
            if self.exponent(idx) == 0 {
                let mut board = self;
                board.set_exponent(idx, e);
                return board;
            }
        }
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Board({:#018x})", self.0)
    }
}

#[inline]
fn in_bounds(x: i32, y: i32) -> bool {
    (0..4).contains(&x) && (0..4).contains(&y)
}

#[inline]
fn cell_index(x: i32, y: i32) -> usize {
    (y * 4 + x) as usize
}

#[inline]
fn value_of(e: Exponent) -> u32 {
    if e == 0 { 0 } else { 1 << e }
}

fn exponent_of(value: u32) -> Exponent {
    if value == 0 {
        return 0;
    }
    assert!(value >= 2, "tile value must be at least 2, got {value}");
    assert!(value.is_power_of_two(), "tile value must be a power of two, got {value}");
    let e = value.trailing_zeros() as Exponent;
    assert!(e <= MAX_EXPONENT, "tile value {value} does not fit in a cell");
    e
}

fn count_non_empty(board: Board) -> u32 {
    let mut board_copy = board.0;
    board_copy |= board_copy >> 1;
    board_copy |= board_copy >> 2;
    board_copy &= 0x1111111111111111;
    board_copy.count_ones()
}

/// Game session: board, scores and the spawn-odds flag, plus where they persist.
///
/// Front ends own the engine and pull copies of its state; nothing hands out a
/// reference into the live board.
pub struct Engine<R = StdRng> {
    board: Board,
    score: u32,
    high_score: u32,
    reached_eight: bool,
    store: Store,
    rng: R,
}

impl Engine<StdRng> {
    /// Engine with an entropy-seeded RNG. Loads the stored high score.
    pub fn new(store: Store) -> Self {
        Self::with_rng(store, StdRng::from_entropy())
    }
}

impl<R: Rng> Engine<R> {
    /// Engine drawing spawns from `rng`. Loads the stored high score; an absent or
    /// unreadable record counts as no high score yet.
    pub fn with_rng(store: Store, rng: R) -> Self {
        let high_score = match store.load_high_score() {
            Ok(score) => score,
            Err(e) if e.is_missing() => {
                debug!("no high score at {}", store.high_score_path().display());
                0
            }
            Err(e) => {
                warn!("ignoring high score at {}: {e}", store.high_score_path().display());
                0
            }
        };
        Engine {
            board: Board::EMPTY,
            score: 0,
            high_score,
            reached_eight: false,
            store,
            rng,
        }
    }

    /// Reset board, score and `reached_eight`, then spawn one tile. The high score is kept.
    pub fn start(&mut self) {
        self.board = Board::EMPTY;
        self.score = 0;
        self.reached_eight = false;
        self.board = self.board.with_random_tile(&mut self.rng, self.reached_eight);
        debug!("new game started: {:?}", self.board);
    }

    /// Slide/merge in `dir`, update scores, then spawn and evaluate the board.
    ///
    /// Creating a 2048 tile returns [`MoveResult::Win`] straight away, without a spawn.
    /// A move that changes nothing still evaluates the board and spawns nothing.
    pub fn process_move(&mut self, dir: Move) -> MoveResult {
        let resolution = self.board.resolve(dir);
        self.board = resolution.board;
        self.reached_eight |= resolution.reached_eight;
        self.score = self.score.saturating_add(resolution.score);
        debug!("move {dir}: +{} (changed: {})", resolution.score, resolution.changed);
        self.record_high_score();

        if resolution.reached_2048 {
            info!("2048 reached with score {}", self.score);
            return MoveResult::Win;
        }
        if resolution.changed {
            self.board = self.board.with_random_tile(&mut self.rng, self.reached_eight);
            debug!("spawned tile: {:?}", self.board);
        }
        if self.board.has_moves() {
            MoveResult::Continue
        } else {
            MoveResult::Lose
        }
    }

    /// Parse a direction token and process it. An unknown token leaves the engine untouched.
    pub fn process_token(&mut self, token: &str) -> Result<MoveResult, EngineError> {
        let dir: Move = token.parse()?;
        Ok(self.process_move(dir))
    }

    /// Copy of the displayed values, `[row][col]`.
    pub fn board_snapshot(&self) -> Snapshot {
        self.board.snapshot()
    }

    /// Copy of the packed board.
    pub fn board(&self) -> Board {
        self.board
    }

    /// Current score. Persists it first if it beats the high score.
    pub fn score(&mut self) -> u32 {
        self.record_high_score();
        self.score
    }

    /// Best score seen so far, across sessions.
    pub fn high_score(&self) -> u32 {
        self.high_score
    }

    pub fn reached_eight(&self) -> bool {
        self.reached_eight
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Write board, score and `reached_eight` to the game-state record.
    pub fn save(&self) -> Result<(), EngineError> {
        let state = GameState {
            board: self.board,
            score: self.score,
            reached_eight: self.reached_eight,
        };
        self.store.save_game(&state)?;
        info!("game saved to {}", self.store.game_state_path().display());
        Ok(())
    }

    /// Replace board, score and `reached_eight` from the game-state record.
    ///
    /// The record is fully validated before anything changes, so a failed load leaves
    /// the session as it was.
    pub fn load(&mut self) -> Result<(), EngineError> {
        let state = self.store.load_game()?;
        self.board = state.board;
        self.score = state.score;
        self.reached_eight = state.reached_eight;
        info!("game loaded from {}", self.store.game_state_path().display());
        Ok(())
    }

    fn record_high_score(&mut self) {
        if self.score <= self.high_score {
            return;
        }
        self.high_score = self.score;
        match self.store.save_high_score(self.score) {
            Ok(()) => info!("new high score {}", self.score),
            Err(e) => warn!("could not persist high score {}: {e}", self.score),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::tempdir;

    fn engine_in(dir: &Path) -> Engine<StdRng> {
        Engine::with_rng(Store::new(dir), StdRng::seed_from_u64(7))
    }

    fn non_empty(snapshot: &Snapshot) -> usize {
        snapshot.iter().flatten().filter(|&&v| v != 0).count()
    }

    fn shift(board: Board, dir: Move) -> Board {
        board.resolve(dir).board
    }

    #[test]
    fn it_count_empty() {
        let game = Board::from_raw(0x1111000011110000);
        assert_eq!(game.count_empty(), 8);
        let game = Board::from_raw(0x1100000000000000);
        assert_eq!(game.count_empty(), 14);
        assert_eq!(Board::EMPTY.count_empty(), 16);
    }

    #[test]
    fn it_get_tile_val() {
        let game = Board::from_raw(0x0123456789abcdef);
        assert_eq!(game.tile_value(0), 0);
        assert_eq!(game.tile_value(3), 8);
        assert_eq!(game.tile_value(10), 1024);
        assert_eq!(game.tile_value(15), 32768);
        assert_eq!(game.highest_tile(), 32768);
    }

    #[test]
    fn values_and_exponents_agree() {
        let b = Board::from_values([[2, 0, 0, 8], [0, 4, 0, 0], [0, 0, 2048, 0], [0, 0, 0, 16]]);
        assert_eq!(b.raw(), 0x1003_0200_00b0_0004);
        assert_eq!(Board::from_exponents(b.exponents()), Ok(b));
        assert_eq!(b.snapshot()[2][2], 2048);
        let mut too_big = [0; 16];
        too_big[5] = 16;
        assert_eq!(Board::from_exponents(too_big), Err(5));
    }

    #[test]
    #[should_panic(expected = "power of two")]
    fn rejects_non_power_of_two() {
        let mut b = Board::EMPTY;
        b.set_value(0, 6);
    }

    #[test]
    #[should_panic(expected = "at least 2")]
    fn rejects_one() {
        let mut b = Board::EMPTY;
        b.set_value(0, 1);
    }

    #[test]
    fn test_move_left() {
        let game = Board::from_raw(0x1234133220021002);
        assert_eq!(shift(game, Move::Left), Board::from_raw(0x1234142030001200));
    }

    #[test]
    fn test_move_up() {
        let game = Board::from_raw(0x1121230033004222);
        assert_eq!(shift(game, Move::Up), Board::from_raw(0x1131240232004000));
    }

    #[test]
    fn test_move_right() {
        let game = Board::from_raw(0x1234133220021002);
        assert_eq!(shift(game, Move::Right), Board::from_raw(0x1234014200030012));
    }

    #[test]
    fn test_move_down() {
        let game = Board::from_raw(0x1121230033004222);
        assert_eq!(shift(game, Move::Down), Board::from_raw(0x1000210034014232));
    }

    #[test]
    fn tile_merges_once_per_move() {
        let b = Board::from_values([[2, 2, 4, 0], [0; 4], [0; 4], [0; 4]]);
        let r = b.resolve(Move::Left);
        assert_eq!(r.board.snapshot()[0], [4, 4, 0, 0]);
        assert_eq!(r.score, 4);

        let b = Board::from_values([[4, 4, 8, 0], [0; 4], [0; 4], [0; 4]]);
        let r = b.resolve(Move::Right);
        assert_eq!(r.board.snapshot()[0], [0, 0, 8, 8]);
        assert_eq!(r.score, 8);
        assert!(r.reached_eight);
    }

    #[test]
    fn column_merges_towards_target_wall() {
        let b = Board::from_values([[2, 0, 0, 0], [2, 0, 0, 0], [2, 0, 0, 0], [0; 4]]);
        let up = b.resolve(Move::Up).board.snapshot();
        assert_eq!([up[0][0], up[1][0], up[2][0]], [4, 2, 0]);
        let down = b.resolve(Move::Down).board.snapshot();
        assert_eq!([down[1][0], down[2][0], down[3][0]], [0, 2, 4]);
    }

    #[test]
    fn largest_tiles_do_not_merge() {
        let b = Board::from_values([[32768, 32768, 0, 0], [0; 4], [0; 4], [0; 4]]);
        let r = b.resolve(Move::Left);
        assert!(!r.changed);
        assert_eq!(r.board, b);
    }

    #[test]
    fn has_moves_detects_blocked_board() {
        let blocked = Board::from_values([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]]);
        assert!(!blocked.has_moves());
        let open = Board::from_values([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 4]]);
        assert!(open.has_moves());
        let vertical = Board::from_values([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 8], [4, 2, 4, 8]]);
        assert!(vertical.has_moves());
    }

    #[test]
    fn capped_pair_is_not_a_move() {
        let b = Board::from_values([[32768, 32768, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]]);
        assert!(!b.has_moves());
        let vertical = Board::from_values([[32768, 2, 4, 2], [32768, 4, 2, 4], [2, 2, 4, 2], [4, 8, 2, 4]]);
        assert!(vertical.has_moves());
    }

    #[test]
    fn capped_pair_board_loses() {
        let dir = tempdir().unwrap();
        let mut engine = engine_in(dir.path());
        engine.board = Board::from_values([[32768, 32768, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]]);
        for dir in Move::ALL {
            assert_eq!(engine.process_move(dir), MoveResult::Lose);
        }
    }

    #[test]
    fn random_tile_fills_board() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut game = Board::EMPTY;
        for _ in 0..16 {
            game = game.with_random_tile(&mut rng, false);
        }
        assert_eq!(game.count_empty(), 0);
        assert_eq!(game.with_random_tile(&mut rng, true), game);
        assert!(game.snapshot().iter().flatten().all(|&v| v == 2));
    }

    #[test]
    fn fours_appear_only_after_eight() {
        let mut rng = StdRng::seed_from_u64(99);
        let early: Vec<u32> = (0..500)
            .map(|_| Board::EMPTY.with_random_tile(&mut rng, false).highest_tile())
            .collect();
        assert!(early.iter().all(|&v| v == 2));

        let late: Vec<u32> = (0..500)
            .map(|_| Board::EMPTY.with_random_tile(&mut rng, true).highest_tile())
            .collect();
        let fours = late.iter().filter(|&&v| v == 4).count();
        assert!(late.iter().all(|&v| v == 2 || v == 4));
        assert!(fours > 10 && fours < 120, "fours: {fours}");
    }

    #[test]
    fn start_spawns_single_two() {
        let dir = tempdir().unwrap();
        let mut engine = engine_in(dir.path());
        engine.start();
        let snap = engine.board_snapshot();
        assert_eq!(non_empty(&snap), 1);
        assert_eq!(snap.iter().flatten().copied().max(), Some(2));
        assert_eq!(engine.score(), 0);
    }

    #[test]
    fn merge_scenario_left() {
        let dir = tempdir().unwrap();
        let mut engine = engine_in(dir.path());
        engine.board = Board::from_values([[2, 2, 0, 0], [0; 4], [0; 4], [0; 4]]);
        assert_eq!(engine.process_move(Move::Left), MoveResult::Continue);
        let snap = engine.board_snapshot();
        assert_eq!(snap[0][0], 4);
        assert_eq!(non_empty(&snap), 2);
        assert_eq!(engine.score(), 4);
    }

    #[test]
    fn changed_move_spawns_exactly_one_tile() {
        let dir = tempdir().unwrap();
        let mut engine = engine_in(dir.path());
        engine.board = Board::from_values([[2, 0, 0, 0], [0, 0, 0, 4], [0; 4], [0; 4]]);
        engine.process_move(Move::Down);
        assert_eq!(non_empty(&engine.board_snapshot()), 3);
    }

    #[test]
    fn wall_moves_are_idempotent() {
        let dir = tempdir().unwrap();
        let mut engine = engine_in(dir.path());
        engine.board = Board::from_values([[2, 4, 0, 0], [8, 0, 0, 0], [0; 4], [0; 4]]);
        let before = engine.board_snapshot();
        for _ in 0..3 {
            assert_eq!(engine.process_move(Move::Up), MoveResult::Continue);
            assert_eq!(engine.process_move(Move::Left), MoveResult::Continue);
        }
        assert_eq!(engine.board_snapshot(), before);
        assert_eq!(engine.score(), 0);
    }

    #[test]
    fn wall_moves_are_idempotent_down_right() {
        let dir = tempdir().unwrap();
        let mut engine = engine_in(dir.path());
        engine.board = Board::from_values([[0; 4], [0; 4], [0, 0, 0, 8], [0, 0, 4, 2]]);
        let before = engine.board_snapshot();
        for _ in 0..3 {
            assert_eq!(engine.process_move(Move::Down), MoveResult::Continue);
            assert_eq!(engine.process_move(Move::Right), MoveResult::Continue);
        }
        assert_eq!(engine.board_snapshot(), before);
        assert_eq!(engine.score(), 0);
    }

    #[test]
    fn win_skips_spawn() {
        let dir = tempdir().unwrap();
        let mut engine = engine_in(dir.path());
        engine.board = Board::from_values([[1024, 1024, 0, 0], [0, 2, 0, 0], [0; 4], [0; 4]]);
        assert_eq!(engine.process_move(Move::Left), MoveResult::Win);
        let snap = engine.board_snapshot();
        assert_eq!(snap[0], [2048, 0, 0, 0]);
        assert_eq!(snap[1], [2, 0, 0, 0]);
        assert_eq!(non_empty(&snap), 2);
        assert_eq!(engine.score(), 2048);
    }

    #[test]
    fn blocked_board_loses() {
        let dir = tempdir().unwrap();
        let mut engine = engine_in(dir.path());
        engine.board = Board::from_values([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]]);
        for dir in Move::ALL {
            assert_eq!(engine.process_move(dir), MoveResult::Lose);
        }
    }

    #[test]
    fn reached_eight_is_sticky_until_start() {
        let dir = tempdir().unwrap();
        let mut engine = engine_in(dir.path());
        engine.board = Board::from_values([[4, 4, 0, 0], [0; 4], [0; 4], [0; 4]]);
        engine.process_move(Move::Left);
        assert!(engine.reached_eight());
        engine.board = Board::from_values([[2, 0, 0, 0], [0; 4], [0; 4], [0; 4]]);
        engine.process_move(Move::Right);
        assert!(engine.reached_eight());
        engine.start();
        assert!(!engine.reached_eight());
    }

    #[test]
    fn invalid_token_leaves_state_untouched() {
        let dir = tempdir().unwrap();
        let mut engine = engine_in(dir.path());
        engine.start();
        let before = engine.board();
        let err = engine.process_token("x").unwrap_err();
        assert!(matches!(err, EngineError::InvalidMove(ref t) if t == "x"));
        assert_eq!(engine.board(), before);
        assert!(engine.process_token("L").is_ok());
    }

    #[test]
    fn parses_direction_tokens() {
        assert_eq!("u".parse::<Move>().unwrap(), Move::Up);
        assert_eq!("Down".parse::<Move>().unwrap(), Move::Down);
        assert_eq!(" left ".parse::<Move>().unwrap(), Move::Left);
        assert_eq!("R".parse::<Move>().unwrap(), Move::Right);
        assert!("".parse::<Move>().is_err());
        assert!("upward".parse::<Move>().is_err());
    }

    #[test]
    fn score_past_high_score_is_persisted() {
        let dir = tempdir().unwrap();
        Store::new(dir.path()).save_high_score(100).unwrap();
        let mut engine = engine_in(dir.path());
        assert_eq!(engine.high_score(), 100);

        engine.score = 150;
        assert_eq!(engine.score(), 150);
        assert_eq!(engine.high_score(), 150);
        assert_eq!(Store::new(dir.path()).load_high_score().unwrap(), 150);
    }

    #[test]
    fn merge_past_high_score_is_persisted() {
        let dir = tempdir().unwrap();
        Store::new(dir.path()).save_high_score(2).unwrap();
        let mut engine = engine_in(dir.path());
        engine.board = Board::from_values([[2, 2, 0, 0], [0; 4], [0; 4], [0; 4]]);
        engine.process_move(Move::Left);
        assert_eq!(engine.high_score(), 4);
        assert_eq!(engine_in(dir.path()).high_score(), 4);
    }

    #[test]
    fn start_keeps_high_score() {
        let dir = tempdir().unwrap();
        let mut engine = engine_in(dir.path());
        engine.score = 40;
        engine.score();
        engine.start();
        assert_eq!(engine.score(), 0);
        assert_eq!(engine.high_score(), 40);
    }

    #[test]
    fn corrupt_high_score_counts_as_zero() {
        let dir = tempdir().unwrap();
        let store = Store::new(dir.path());
        std::fs::write(store.high_score_path(), b"garbage").unwrap();
        assert_eq!(engine_in(dir.path()).high_score(), 0);
    }

    #[test]
    fn save_then_load_restores_state() {
        let dir = tempdir().unwrap();
        let mut engine = engine_in(dir.path());
        engine.board = Board::from_values([[2, 8, 0, 0], [0, 4, 0, 0], [0; 4], [0, 0, 0, 16]]);
        engine.score = 36;
        engine.reached_eight = true;
        engine.save().unwrap();

        let mut other = engine_in(dir.path());
        other.start();
        other.load().unwrap();
        assert_eq!(other.board_snapshot(), engine.board_snapshot());
        assert_eq!(other.score(), 36);
        assert!(other.reached_eight());
    }

    #[test]
    fn failed_load_keeps_state() {
        let dir = tempdir().unwrap();
        let mut engine = engine_in(dir.path());
        engine.start();
        engine.score = 12;
        let before = engine.board();

        assert!(matches!(engine.load(), Err(EngineError::Persistence(_))));
        std::fs::write(engine.store().game_state_path(), [0u8; 30]).unwrap();
        assert!(matches!(engine.load(), Err(EngineError::Persistence(_))));
        assert_eq!(engine.board(), before);
        assert_eq!(engine.score(), 12);
    }

    #[test]
    fn save_into_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let engine = engine_in(&dir.path().join("absent"));
        assert!(matches!(engine.save(), Err(EngineError::Persistence(_))));
    }
}
