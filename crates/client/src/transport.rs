//! The opaque request/response channel to the backend.
//!
//! HTTP, WebSocket or in-process implementations live in the host; the core only
//! needs something that posts a JSON body to a named endpoint and hands back the
//! JSON response.

use async_trait::async_trait;
use objsync_wire_protocol::RpcMethod;

#[cfg(any(feature = "mock", test))]
use mockall::automock;

#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    #[error("Unexpected status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Request timed out")]
    Timeout,
    #[error("Transport failure: {0}")]
    Other(String),
}

/// Trait abstraction over the network so the core can be driven by any channel
#[cfg_attr(any(feature = "mock", test), automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Post `body` to `method` and return the decoded JSON response
    async fn post(
        &self,
        method: RpcMethod,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, TransportError>;
}
