use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::action::RetryActionDto;
use crate::application::ApplicationDto;
use crate::error::Result;
use crate::persistent_object::PersistentObjectDto;
use crate::query::{QueryDto, QueryResultDto};

/// Fields every response may carry regardless of the endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseHeader {
    /// Server side failure description; the body should be ignored when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<String>,
    /// Renewed session token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response<T> {
    #[serde(flatten)]
    pub header: ResponseHeader,
    #[serde(flatten)]
    pub body: T,
}

impl<T: DeserializeOwned> Response<T> {
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetApplicationResponse {
    #[serde(default)]
    pub application: Option<ApplicationDto>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetPersistentObjectResponse {
    #[serde(default)]
    pub result: Option<PersistentObjectDto>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetQueryResponse {
    #[serde(default)]
    pub query: Option<QueryDto>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteActionResponse {
    #[serde(default)]
    pub result: Option<PersistentObjectDto>,
    /// The server needs the user to pick an option before it can continue
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryActionDto>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteQueryResponse {
    #[serde(default)]
    pub result: Option<QueryResultDto>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_exception_and_token_are_split_from_body() {
        let response = Response::<ExecuteActionResponse>::from_value(json!({
            "exception": "Concurrency violation",
            "authToken": "renewed",
            "result": null
        }))
        .unwrap();

        assert_eq!(
            response.header.exception.as_deref(),
            Some("Concurrency violation")
        );
        assert_eq!(response.header.auth_token.as_deref(), Some("renewed"));
        assert!(response.body.result.is_none());
        assert!(response.body.retry.is_none());
    }

    #[test]
    fn test_missing_fields_default() {
        let response = Response::<ExecuteQueryResponse>::from_value(json!({})).unwrap();
        assert!(response.header.exception.is_none());
        assert!(response.body.result.is_none());
    }
}
