use crate::record::RecordError;

#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    /// A direction token that is not one of u/d/l/r. The engine is left untouched.
    #[error("invalid move {0:?}, expected u/d/l/r")]
    InvalidMove(String),
    /// Reading or writing a record failed.
    #[error("persistence error: {0}")]
    Persistence(#[from] RecordError),
}
