use thiserror::Error;

#[derive(Error, Debug)]
pub enum GovernorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid option: {0}")]
    InvalidOption(String),

    #[error("Subsystem '{subsystem}' failed to initialize: {reason}")]
    SubsystemInit { subsystem: String, reason: String },
}

pub type Result<T> = std::result::Result<T, GovernorError>;
