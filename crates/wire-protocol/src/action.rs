use serde::{Deserialize, Serialize};

use crate::persistent_object::PersistentObjectDto;

/// Static description of an action, shared by every object or query exposing it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionDefinitionDto {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub is_pinned: bool,
    /// Message to confirm before executing, none when no confirmation is needed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmation: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    /// Expression over the number of selected items, e.g. `>0` or `=1`
    #[serde(default)]
    pub selection_rule: String,
    #[serde(default)]
    pub refresh_query_on_completed: bool,
    #[serde(default)]
    pub keep_selection_on_refresh: bool,
    #[serde(default)]
    pub offset: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_action: Option<String>,
}

/// Question the server asks before it can complete an action
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryActionDto {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_option: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel_option: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistent_object: Option<Box<PersistentObjectDto>>,
}
