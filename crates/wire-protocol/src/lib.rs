//! # Objsync Wire Protocol
//!
//! Data transfer objects exchanged between the synchronization client and the
//! persistent object service. The crate is transport agnostic: every request is
//! a JSON document consisting of a [`RequestHeader`] flattened together with a
//! typed body, posted to one of the [`RpcMethod`] endpoints. Responses share a
//! [`ResponseHeader`] carrying an optional server exception and a renewed
//! authentication token.
//!
//! ## Endpoints
//!
//! | Method                | Request                        | Response                        |
//! |-----------------------|--------------------------------|---------------------------------|
//! | `GetApplication`      | [`GetApplicationRequest`]      | [`GetApplicationResponse`]      |
//! | `GetPersistentObject` | [`GetPersistentObjectRequest`] | [`GetPersistentObjectResponse`] |
//! | `GetQuery`            | [`GetQueryRequest`]            | [`GetQueryResponse`]            |
//! | `ExecuteAction`       | [`ExecuteActionRequest`]       | [`ExecuteActionResponse`]       |
//! | `ExecuteQuery`        | [`ExecuteQueryRequest`]        | [`ExecuteQueryResponse`]        |
//!
//! ## Example
//!
//! ```rust
//! use objsync_wire_protocol::{GetQueryRequest, Request, RequestHeader};
//!
//! let header = RequestHeader {
//!     user_name: Some("admin".to_string()),
//!     auth_token: Some("token".to_string()),
//!     client_version: "1.0".to_string(),
//!     environment: "Web".to_string(),
//!     environment_version: "3".to_string(),
//!     ..Default::default()
//! };
//! let request = Request::new(header, GetQueryRequest::new("Customers"));
//! let body = request.to_value().unwrap();
//! assert_eq!(body["id"], "Customers");
//! assert_eq!(body["userName"], "admin");
//! ```

pub mod action;
pub mod application;
pub mod error;
pub mod persistent_object;
pub mod query;
pub mod request;
pub mod response;
pub mod well_known;

pub use action::{ActionDefinitionDto, RetryActionDto};
pub use application::ApplicationDto;
pub use error::{Result, WireError};
pub use persistent_object::{AttributeDto, NotificationType, PersistentObjectDto, TabDto};
pub use query::{
    GroupingInfoDto, QueryColumnDto, QueryDto, QueryResultDto, QueryResultGroupDto,
    QueryResultItemDto, QueryResultItemValueDto,
};
pub use request::{
    ExecuteActionRequest, ExecuteQueryRequest, GetApplicationRequest, GetPersistentObjectRequest,
    GetQueryRequest, Request, RequestHeader, RpcMethod,
};
pub use response::{
    ExecuteActionResponse, ExecuteQueryResponse, GetApplicationResponse,
    GetPersistentObjectResponse, GetQueryResponse, Response, ResponseHeader,
};
