use serde::{Deserialize, Serialize};

use crate::error::{Result, ServiceError};

/// Static settings of a client session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Reported to the server with every request
    pub client_version: String,
    /// Host environment name (`Web`, `Desktop`, ...)
    pub environment: String,
    pub environment_version: String,
    /// Page size for queries that declare none
    pub default_page_size: u32,
    /// User name to use when signing in with only a token
    pub default_user_name: Option<String>,
    /// Whether a plain `Query::search` keeps the current explicit selection
    pub keep_selection_on_search: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            client_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "Rust".to_string(),
            environment_version: "1".to_string(),
            default_page_size: 50,
            default_user_name: None,
            keep_selection_on_search: false,
        }
    }
}

impl ServiceConfig {
    /// Load a config document, missing keys keep their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ServiceError::Config(e.to_string()))
    }
}
