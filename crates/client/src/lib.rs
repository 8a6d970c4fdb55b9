//! # Objsync Client
//!
//! Client-side synchronization engine for a metadata driven persistent object
//! service. The crate mirrors remote records ([`PersistentObject`]), their fields
//! ([`PersistentObjectAttribute`]), remote operations ([`Action`]) and paged
//! collections ([`Query`]) locally, lets a UI edit them optimistically and
//! reconciles those edits with asynchronous server responses.
//!
//! ## Ordering guarantees
//!
//! - Every round trip for a persistent object (attribute refresh, action, save)
//!   runs on the object's FIFO [`WorkQueue`]; at most one is in flight.
//! - An attribute edited while a refresh is in flight keeps the local value when
//!   the refresh response arrives, every untouched attribute takes the server's
//!   recalculation.
//! - Query pages are fetched at most once at a time; disjoint pages may load
//!   concurrently.
//!
//! ## Example
//!
//! ```rust,no_run
//! # use std::sync::Arc;
//! # use objsync_client::{Service, Transport, Value};
//! # async fn example(transport: Arc<dyn Transport>) -> objsync_client::Result<()> {
//! let mut builder = Service::builder();
//! builder.transport(transport);
//! let service = builder.build()?;
//! service.sign_in_with_credentials("admin", "secret").await?;
//!
//! let person = service.get_persistent_object(None, "Person", Some("42"), false).await?;
//! person.begin_edit();
//! if let Some(first_name) = person.attribute("FirstName") {
//!     first_name.set_value("Ada", true).await?;
//! }
//! person.save().await?;
//! # Ok(())
//! # }
//! ```

pub mod action;
pub mod attribute;
pub mod config;
pub mod data_type;
pub mod error;
pub mod hooks;
pub mod notification;
pub mod persistent_object;
pub mod query;
pub mod service;
pub mod transport;
pub mod type_hints;
pub mod work_queue;

#[cfg(test)]
mod test_support;

pub use action::{
    Action, ActionBehavior, ActionDefinition, ActionExecutionHandler, ActionGroup, ActionOwner,
    ActionRegistry, ExecuteOptions, HandlerFlow, OwnerEditState, SelectionRule,
};
pub use attribute::{PersistentObjectAttribute, RefreshDecision, RefreshState, Visibility};
pub use config::ServiceConfig;
pub use data_type::{DataKind, DataType, DataTypeError, Value};
pub use error::{Result, ServiceError};
pub use hooks::{RefreshPolicy, RefreshTiming, ServiceHooks};
pub use notification::{Notification, NotificationType};
pub use persistent_object::{PersistentObject, SaveOptions};
pub use query::{
    Query, QueryColumn, QueryGroup, QueryResultItem, QueryRow, SearchOptions, SelectAll,
    SortDirection, SortOption,
};
pub use service::{Service, ServiceBuilder};
pub use transport::{Transport, TransportError};
pub use type_hints::{CharacterCasing, TypeHint, TypeHints};
pub use work_queue::WorkQueue;

#[cfg(any(feature = "mock", test))]
pub use transport::MockTransport;
