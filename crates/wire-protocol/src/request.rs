use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::Result;
use crate::persistent_object::PersistentObjectDto;
use crate::query::{QueryDto, QueryResultItemDto};

/// Remote endpoints exposed by the persistent object service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RpcMethod {
    GetApplication,
    GetPersistentObject,
    GetQuery,
    ExecuteAction,
    ExecuteQuery,
}

impl RpcMethod {
    pub const fn as_str(&self) -> &'static str {
        match self {
            RpcMethod::GetApplication => "GetApplication",
            RpcMethod::GetPersistentObject => "GetPersistentObject",
            RpcMethod::GetQuery => "GetQuery",
            RpcMethod::ExecuteAction => "ExecuteAction",
            RpcMethod::ExecuteQuery => "ExecuteQuery",
        }
    }
}

impl fmt::Display for RpcMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session fields sent along with every request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestHeader {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    /// Only present on the initial credential sign in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default)]
    pub client_version: String,
    #[serde(default)]
    pub environment: String,
    #[serde(default)]
    pub environment_version: String,
}

/// A request body together with its session header
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request<T> {
    #[serde(flatten)]
    pub header: RequestHeader,
    #[serde(flatten)]
    pub body: T,
}

impl<T: Serialize> Request<T> {
    pub fn new(header: RequestHeader, body: T) -> Self {
        Self { header, body }
    }

    pub fn to_value(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetApplicationRequest {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetPersistentObjectRequest {
    pub persistent_object_type_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(default)]
    pub is_new: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<PersistentObjectDto>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetQueryRequest {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_search: Option<String>,
}

impl GetQueryRequest {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text_search: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteActionRequest {
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<PersistentObjectDto>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<QueryDto>,
    #[serde(default)]
    pub selected_items: Vec<QueryResultItemDto>,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteQueryRequest {
    pub query: QueryDto,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<PersistentObjectDto>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_header_is_flattened_into_body() {
        let header = RequestHeader {
            user_name: Some("alice".to_string()),
            auth_token: Some("tok".to_string()),
            client_version: "2.1".to_string(),
            environment: "Desktop".to_string(),
            environment_version: "1".to_string(),
            ..Default::default()
        };
        let request = Request::new(
            header,
            ExecuteActionRequest {
                action: "PersistentObject.Save".to_string(),
                ..Default::default()
            },
        );

        let value = request.to_value().unwrap();
        assert_eq!(value["action"], "PersistentObject.Save");
        assert_eq!(value["userName"], "alice");
        assert_eq!(value["authToken"], "tok");
        assert_eq!(value["clientVersion"], "2.1");
        assert_eq!(value["environment"], "Desktop");
        assert!(value.get("password").is_none());
        assert!(value.get("parent").is_none());
    }

    #[test]
    fn test_rpc_method_names() {
        assert_eq!(RpcMethod::ExecuteQuery.to_string(), "ExecuteQuery");
        assert_eq!(
            serde_json::to_value(RpcMethod::GetPersistentObject).unwrap(),
            "GetPersistentObject"
        );
    }
}
