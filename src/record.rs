//! Binary layouts for the two persisted records.
//!
//! Both are fixed-length, little-endian, and end in a CRC32C of every preceding byte.
//!
//! High score (13 bytes):
//! `magic "2HS1" | version u8 | high score u32 | crc32c u32`
//!
//! Game state (30 bytes):
//! `magic "2GS1" | version u8 | flags u8 | 16 exponents u8 (row-major) | score u32 | crc32c u32`
//!
//! Flag bit 0 carries `reached_eight`; the other bits must be clear.

use std::io;

use crate::engine::{Board, MAX_EXPONENT};

const HIGH_SCORE_MAGIC: &[u8; 4] = b"2HS1";
const GAME_STATE_MAGIC: &[u8; 4] = b"2GS1";
const VERSION: u8 = 1;
const FLAG_REACHED_EIGHT: u8 = 0b0000_0001;

/// Bytes before the version-specific body: magic + version.
const HEADER_LEN: usize = 4 + 1;
const CRC_LEN: usize = 4;

pub const HIGH_SCORE_LEN: usize = HEADER_LEN + 4 + CRC_LEN;
pub const GAME_STATE_LEN: usize = HEADER_LEN + 1 + 16 + 4 + CRC_LEN;

/// Everything `save`/`load` carry for one game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameState {
    pub board: Board,
    pub score: u32,
    pub reached_eight: bool,
}

#[derive(thiserror::Error, Debug)]
pub enum RecordError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("expected {expected} bytes, found {found}")]
    Length { expected: usize, found: usize },
    #[error("checksum mismatch")]
    Checksum,
    #[error("invalid magic")]
    Magic,
    #[error("unsupported version {0}")]
    Version(u8),
    #[error("unknown flag bits {0:#04x}")]
    Flags(u8),
    #[error("cell {index} holds exponent {exponent}, above 15")]
    Exponent { index: usize, exponent: u8 },
}

impl RecordError {
    /// True when the record file does not exist.
    pub fn is_missing(&self) -> bool {
        matches!(self, RecordError::Io(e) if e.kind() == io::ErrorKind::NotFound)
    }
}

#[inline]
fn read_u32_le(bytes: &[u8]) -> Option<u32> {
    if bytes.len() < 4 { return None; }
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn seal(mut buf: Vec<u8>) -> Vec<u8> {
    let checksum = crc32c::crc32c(&buf);
    buf.extend_from_slice(&checksum.to_le_bytes());
    buf
}

/// Check length, checksum, magic and version; return the body between header and trailer.
fn open<'a>(bytes: &'a [u8], expected: usize, magic: &[u8; 4]) -> Result<&'a [u8], RecordError> {
    if bytes.len() != expected {
        return Err(RecordError::Length { expected, found: bytes.len() });
    }
    let (content, trailer) = bytes.split_at(bytes.len() - CRC_LEN);
    let file_crc = read_u32_le(trailer).ok_or(RecordError::Checksum)?;
    if file_crc != crc32c::crc32c(content) {
        return Err(RecordError::Checksum);
    }
    if &content[..4] != magic {
        return Err(RecordError::Magic);
    }
    if content[4] != VERSION {
        return Err(RecordError::Version(content[4]));
    }
    Ok(&content[HEADER_LEN..])
}

pub fn encode_high_score(score: u32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HIGH_SCORE_LEN);
    buf.extend_from_slice(HIGH_SCORE_MAGIC);
    buf.push(VERSION);
    buf.extend_from_slice(&score.to_le_bytes());
    seal(buf)
}

pub fn parse_high_score(bytes: &[u8]) -> Result<u32, RecordError> {
    let body = open(bytes, HIGH_SCORE_LEN, HIGH_SCORE_MAGIC)?;
    read_u32_le(body).ok_or(RecordError::Length { expected: HIGH_SCORE_LEN, found: bytes.len() })
}

pub fn encode_game_state(state: &GameState) -> Vec<u8> {
    let mut buf = Vec::with_capacity(GAME_STATE_LEN);
    buf.extend_from_slice(GAME_STATE_MAGIC);
    buf.push(VERSION);
    buf.push(if state.reached_eight { FLAG_REACHED_EIGHT } else { 0 });
    buf.extend_from_slice(&state.board.exponents());
    buf.extend_from_slice(&state.score.to_le_bytes());
    seal(buf)
}

/// Decode a game-state record. Nothing is returned unless every field checks out.
pub fn parse_game_state(bytes: &[u8]) -> Result<GameState, RecordError> {
    let body = open(bytes, GAME_STATE_LEN, GAME_STATE_MAGIC)?;

    let flags = body[0];
    if flags & !FLAG_REACHED_EIGHT != 0 {
        return Err(RecordError::Flags(flags));
    }

    let mut exponents = [0u8; 16];
    exponents.copy_from_slice(&body[1..17]);
    let board = Board::from_exponents(exponents)
        .map_err(|index| RecordError::Exponent { index, exponent: exponents[index] })?;

    let score = read_u32_le(&body[17..]).ok_or(RecordError::Length { expected: GAME_STATE_LEN, found: bytes.len() })?;

    Ok(GameState { board, score, reached_eight: flags & FLAG_REACHED_EIGHT != 0 })
}
