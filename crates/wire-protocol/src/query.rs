use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::persistent_object::{NotificationType, PersistentObjectDto};

/// Wire representation of a query definition, optionally with a first result page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryDto {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub label: String,
    /// Template object describing the type of the rows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistent_object: Option<Box<PersistentObjectDto>>,
    #[serde(default)]
    pub columns: Vec<QueryColumnDto>,
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default)]
    pub allow_text_search: bool,
    #[serde(default)]
    pub auto_query: bool,
    #[serde(default)]
    pub can_read: bool,
    #[serde(default)]
    pub is_system: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top: Option<u64>,
    /// `Column ASC; Other DESC`
    #[serde(default)]
    pub sort_options: String,
    #[serde(default)]
    pub text_search: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continuation: Option<String>,
    #[serde(default)]
    pub all_selected: bool,
    #[serde(default)]
    pub all_selected_inversed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_selected_items: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<QueryResultDto>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryColumnDto {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type", default)]
    pub type_name: String,
    #[serde(default)]
    pub offset: i32,
    #[serde(default)]
    pub is_hidden: bool,
    #[serde(default)]
    pub can_sort: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub type_hints: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResultDto {
    #[serde(default)]
    pub items: Vec<QueryResultItemDto>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<QueryColumnDto>,
    /// Absent when the server only knows whether more rows follow
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_items: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continuation: Option<String>,
    #[serde(default)]
    pub sort_options: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grouping_info: Option<GroupingInfoDto>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification: Option<String>,
    #[serde(default)]
    pub notification_type: NotificationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_duration: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResultItemDto {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breadcrumb: Option<String>,
    #[serde(default)]
    pub values: Vec<QueryResultItemValueDto>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub type_hints: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResultItemValueDto {
    pub key: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub type_hints: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupingInfoDto {
    pub group_by: String,
    #[serde(default)]
    pub groups: Vec<QueryResultGroupDto>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResultGroupDto {
    pub name: String,
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_query_result_with_grouping() {
        let dto: QueryResultDto = serde_json::from_value(json!({
            "items": [
                { "id": "1", "values": [{ "key": "Name", "value": "Ada" }] },
                { "id": "2", "values": [{ "key": "Name", "value": null }] }
            ],
            "totalItems": 120,
            "pageSize": 50,
            "sortOptions": "Name ASC",
            "groupingInfo": {
                "groupBy": "Country",
                "groups": [{ "name": "BE", "count": 70 }, { "name": "NL", "count": 50 }]
            }
        }))
        .unwrap();

        assert_eq!(dto.items.len(), 2);
        assert_eq!(dto.items[1].values[0].value, None);
        assert_eq!(dto.total_items, Some(120));
        assert_eq!(dto.continuation, None);
        let grouping = dto.grouping_info.unwrap();
        assert_eq!(grouping.group_by, "Country");
        assert_eq!(grouping.groups[1].count, 50);
    }
}
