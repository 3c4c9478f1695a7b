use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid stage: {0}")]
    InvalidStage(String),

    #[error("Invalid player ID: {0}")]
    InvalidPlayerId(String),

    #[error("Player ID counter exhausted at {0}")]
    CounterExhausted(u32),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
