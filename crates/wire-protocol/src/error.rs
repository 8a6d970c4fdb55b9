use thiserror::Error;

#[derive(Error, Debug)]
pub enum WireError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unexpected payload for {method}: {reason}")]
    UnexpectedPayload { method: String, reason: String },
}

pub type Result<T> = std::result::Result<T, WireError>;
