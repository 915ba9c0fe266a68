use thiserror::Error;

/// Top-level error type used across the entire application.
#[derive(Debug, Error)]
pub enum BattError {
    #[error("config error: {0}")]
    Config(String),

    #[error("report command error: {0}")]
    Command(String),

    #[error("power monitor error: {0}")]
    Monitor(String),

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

pub type Result<T, E = BattError> = std::result::Result<T, E>;
