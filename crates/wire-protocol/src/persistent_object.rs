use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::query::QueryDto;

/// Severity of a notification attached to an object or query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationType {
    Error,
    #[default]
    Notice,
    #[serde(rename = "OK")]
    Ok,
    Warning,
}

/// Wire representation of a persistent object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistentObjectDto {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub type_name: String,
    #[serde(default)]
    pub full_type_name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breadcrumb: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification: Option<String>,
    #[serde(default)]
    pub notification_type: NotificationType,
    /// Milliseconds after which a toast notification may be hidden
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_duration: Option<u32>,
    #[serde(default)]
    pub is_new: bool,
    #[serde(default)]
    pub is_read_only: bool,
    #[serde(default)]
    pub is_hidden: bool,
    #[serde(default)]
    pub is_bulk_edit: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bulk_object_ids: Vec<String>,
    /// Comma separated flags such as `OpenInEdit, StayInEdit`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub state_behavior: String,
    #[serde(default)]
    pub attributes: Vec<AttributeDto>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tabs: BTreeMap<String, TabDto>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub queries: Vec<QueryDto>,
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Box<PersistentObjectDto>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialog_save_action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_token: Option<String>,
}

/// Wire representation of a single attribute
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeDto {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub type_name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub is_read_only: bool,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default)]
    pub is_value_changed: bool,
    /// Comma separated visibility flags (`Always`, `Read`, `New`, `Query`, `Never`)
    #[serde(default)]
    pub visibility: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub type_hints: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_error: Option<String>,
    #[serde(default)]
    pub triggers_refresh: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tab: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default)]
    pub offset: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_tip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_span: Option<u32>,
    #[serde(default)]
    pub is_sensitive: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<String>,

    // Reference attributes only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lookup: Option<Box<QueryDto>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_attribute: Option<String>,
    #[serde(default)]
    pub can_add_new_reference: bool,
    #[serde(default)]
    pub select_in_place: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabDto {
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_count: Option<u32>,
}
