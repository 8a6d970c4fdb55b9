use crate::transport::TransportError;

#[derive(thiserror::Error, Debug)]
pub enum ServiceError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("Server exception: {0}")]
    Server(String),
    #[error("Wire protocol error: {0}")]
    Wire(#[from] objsync_wire_protocol::WireError),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Not signed in")]
    NotSignedIn,
    #[error("Server response did not contain {0}")]
    MissingResult(&'static str),
    #[error("Owner of {0} is no longer alive")]
    OwnerDropped(String),
    #[error("Build error: {0}")]
    Build(String),
    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ServiceError>;

impl ServiceError {
    /// Text suitable for showing to a user in a notification
    pub fn notification_message(&self) -> String {
        match self {
            ServiceError::Server(message) => message.clone(),
            other => other.to_string(),
        }
    }
}
