use serde::{Deserialize, Serialize};

use crate::action::ActionDefinitionDto;

/// Session level metadata returned when signing in
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationDto {
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub friendly_user_name: String,
    #[serde(default)]
    pub label: String,
    /// Every action definition known to the application
    #[serde(default)]
    pub actions: Vec<ActionDefinitionDto>,
    /// Page size used by queries that do not declare their own
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_page_size: Option<u32>,
}
