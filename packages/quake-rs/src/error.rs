use thiserror::Error;

#[derive(Error, Debug)]
pub enum QuakeError {
    #[error("Failed to open sample source: {0}")]
    SourceOpen(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Stream ended before calibration: {accepted} of {required} samples received")]
    CalibrationIncomplete { accepted: u64, required: u64 },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Channel closed")]
    ChannelClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for QuakeError {
    fn from(err: reqwest::Error) -> Self {
        QuakeError::Network(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, QuakeError>;
