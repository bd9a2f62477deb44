use thiserror::Error;

/// Input rejected before any dispatch starts
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0}")]
    MissingFields(&'static str),

    #[error("Invalid phone number format")]
    InvalidRecipientFormat,
}

/// A single delivery attempt failed
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("osascript exited with status {status}: {stderr}")]
    Script { status: i32, stderr: String },

    #[error("Failed to run osascript: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Gateway returned HTTP {0}")]
    Status(u16),

    #[error("{0}")]
    Other(String),
}

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Shutdown in progress")]
    ShutdownInProgress,

    #[error("Configuration error: {0}")]
    Config(String),
}
