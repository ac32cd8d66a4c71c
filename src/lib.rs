//! game-2048: a 2048 game engine with persistent scores and saves
//!
//! This crate provides:
//! - A compact `Board` type (`resolve`, `with_random_tile`, `has_moves`, `snapshot`, ...)
//! - An `Engine` that owns one game: moves, scoring, high score, save/load
//! - Versioned, checksummed binary records for the high score and saved games (`record`, `store`)
//! - A text front end that drives an engine over any reader/writer pair (`console`)
//!
//! Quick start:
//! ```
//! use game_2048::{Engine, Move, MoveResult, Store};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let mut engine = Engine::with_rng(Store::new(dir.path()), StdRng::seed_from_u64(42));
//! engine.start();
//!
//! let result = engine.process_move(Move::Left);
//! assert_eq!(result, MoveResult::Continue);
//! let snapshot = engine.board_snapshot();
//! assert!(snapshot.iter().flatten().any(|&v| v == 2));
//!
//! engine.save().unwrap();
//! engine.load().unwrap();
//! assert_eq!(engine.board_snapshot(), snapshot);
//! ```
//!
pub mod console;
pub mod engine;
pub mod error;
pub mod record;
pub mod store;

pub use engine::{Board, Engine, Move, MoveResult, Resolution, Snapshot};
pub use error::EngineError;
pub use record::{GameState, RecordError};
pub use store::Store;
