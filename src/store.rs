use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::record::{self, GameState, RecordError};

pub const HIGH_SCORE_FILE: &str = "highscore.bin";
pub const GAME_STATE_FILE: &str = "game_state.bin";

/// Fixed locations of the high-score and game-state records.
///
/// Reads and writes are blocking and happen inline, with no retry. Each write
/// truncates the file and replaces the whole record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Store {
    high_score_path: PathBuf,
    game_state_path: PathBuf,
}

impl Store {
    /// Records live directly under `dir`, which must already exist for writes to succeed.
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref();
        Store {
            high_score_path: dir.join(HIGH_SCORE_FILE),
            game_state_path: dir.join(GAME_STATE_FILE),
        }
    }

    pub fn high_score_path(&self) -> &Path {
        &self.high_score_path
    }

    pub fn game_state_path(&self) -> &Path {
        &self.game_state_path
    }

    pub fn load_high_score(&self) -> Result<u32, RecordError> {
        let data = fs::read(&self.high_score_path)?;
        record::parse_high_score(&data)
    }

    pub fn save_high_score(&self, score: u32) -> Result<(), RecordError> {
        write_record(&self.high_score_path, &record::encode_high_score(score))
    }

    pub fn load_game(&self) -> Result<GameState, RecordError> {
        let data = fs::read(&self.game_state_path)?;
        record::parse_game_state(&data)
    }

    pub fn save_game(&self, state: &GameState) -> Result<(), RecordError> {
        write_record(&self.game_state_path, &record::encode_game_state(state))
    }
}

impl Default for Store {
    /// Records in the current working directory.
    fn default() -> Self {
        Store::new(".")
    }
}

fn write_record(path: &Path, data: &[u8]) -> Result<(), RecordError> {
    let mut f = fs::File::create(path)?;
    f.write_all(data)?;
    Ok(())
}
