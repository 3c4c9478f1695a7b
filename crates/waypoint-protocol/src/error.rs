use thiserror::Error;

/// Failure to decode a card record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Card record too short: {len} chars, need at least {min}")]
    TooShort { len: usize, min: usize },

    #[error("Card record too long: {len} chars, a card holds at most {max}")]
    TooLong { len: usize, max: usize },

    #[error("Card record is not ASCII")]
    NotAscii,

    #[error("Invalid stage digit: {0:?}")]
    InvalidStage(char),

    #[error("Invalid player ID: {0:?}")]
    InvalidPlayerId(String),
}

/// Failure to parse a station message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MessageError {
    #[error("Empty station message")]
    Empty,

    #[error("Invalid station registration: {0:?}")]
    InvalidRegistration(String),

    #[error("Invalid score report: {0:?}")]
    InvalidScore(String),

    #[error("Invalid player record: {0}")]
    Record(#[from] DecodeError),
}

pub type Result<T> = std::result::Result<T, DecodeError>;
