use thiserror::Error;

use crate::Instrument;

#[derive(Debug, Error)]
pub enum Error {
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Advisor error: {0}")]
    Advisor(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Seed for {instrument} has {got} points, expected exactly {expected}")]
    SeedLength {
        instrument: Instrument,
        expected: usize,
        got: usize,
    },

    #[error("No history seeded for {0}")]
    NotSeeded(Instrument),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
