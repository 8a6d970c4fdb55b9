//! Host integration points.
//!
//! Everything the core cannot decide on its own (asking the user, navigating,
//! downloading, formatting) is delegated to one small trait per capability.
//! [`ServiceHooks`] bundles them; [`DefaultHooks`] answers every question
//! without user interaction so the core runs headless.

use async_trait::async_trait;
use objsync_wire_protocol::{PersistentObjectDto, RetryActionDto};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use crate::attribute::PersistentObjectAttribute;
use crate::data_type::{DataType, Value};
use crate::notification::NotificationType;
use crate::persistent_object::PersistentObject;
use crate::query::{Query, QueryResultItem};
use crate::type_hints::TypeHints;

#[cfg(any(feature = "mock", test))]
use mockall::automock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationRequest {
    pub action: String,
    pub display_name: String,
    pub message: String,
    /// Label of the menu option being executed, if any
    pub option: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDialog {
    pub title: String,
    pub message: String,
    pub kind: NotificationType,
}

/// A server registered download or upload stream
#[derive(Debug, Clone, PartialEq)]
pub struct StreamTarget {
    pub token: String,
    pub label: String,
    pub object: PersistentObjectDto,
}

#[cfg_attr(any(feature = "mock", test), automock)]
#[async_trait]
pub trait ConfirmationHook: Send + Sync {
    /// Return `false` to abort the action
    async fn confirm(&self, request: ConfirmationRequest) -> bool;
}

#[cfg_attr(any(feature = "mock", test), automock)]
#[async_trait]
pub trait MessageDialogHook: Send + Sync {
    async fn show_message_dialog(&self, dialog: MessageDialog);
}

#[async_trait]
pub trait ReferencePickerHook: Send + Sync {
    /// Let the user pick rows from `lookup`; an empty selection cancels
    async fn select_references(&self, lookup: Arc<Query>) -> Vec<Arc<QueryResultItem>>;
}

#[async_trait]
pub trait OpenHook: Send + Sync {
    /// Navigate to an object returned by an action
    async fn open(&self, object: Arc<PersistentObject>);
}

#[cfg_attr(any(feature = "mock", test), automock)]
#[async_trait]
pub trait StreamHook: Send + Sync {
    async fn handle_stream(&self, stream: StreamTarget);
}

#[cfg_attr(any(feature = "mock", test), automock)]
#[async_trait]
pub trait RetryHook: Send + Sync {
    /// Index of the chosen option, `None` when the user dismissed the question
    async fn choose_retry_option(&self, retry: RetryActionDto) -> Option<usize>;
}

#[async_trait]
pub trait UserSettingsHook: Send + Sync {
    async fn read_setting(&self, key: &str) -> Option<String>;
    async fn write_setting(&self, key: &str, value: Option<String>);
}

pub trait ValueFormatter: Send + Sync {
    fn display_value(&self, value: &Value, data_type: DataType, hints: &TypeHints) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTiming {
    /// Refresh as soon as the value changes
    Immediate,
    /// Remember the refresh and run it when the edit is committed
    Deferred,
}

/// Decides when a refresh-triggering attribute actually refreshes
pub trait RefreshPolicy: Send + Sync {
    fn timing(&self, attribute: &PersistentObjectAttribute) -> RefreshTiming;
}

/// Answers every hook without user interaction
#[derive(Debug, Default)]
pub struct DefaultHooks {
    settings: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl ConfirmationHook for DefaultHooks {
    async fn confirm(&self, request: ConfirmationRequest) -> bool {
        debug!(action = %request.action, "Auto confirming action");
        true
    }
}

#[async_trait]
impl MessageDialogHook for DefaultHooks {
    async fn show_message_dialog(&self, dialog: MessageDialog) {
        info!(title = %dialog.title, kind = ?dialog.kind, "{}", dialog.message);
    }
}

#[async_trait]
impl ReferencePickerHook for DefaultHooks {
    async fn select_references(&self, lookup: Arc<Query>) -> Vec<Arc<QueryResultItem>> {
        debug!(query = %lookup.name(), "No reference picker registered, cancelling");
        Vec::new()
    }
}

#[async_trait]
impl OpenHook for DefaultHooks {
    async fn open(&self, object: Arc<PersistentObject>) {
        debug!(id = %object.id(), object_id = ?object.object_id(), "Open requested");
    }
}

#[async_trait]
impl StreamHook for DefaultHooks {
    async fn handle_stream(&self, stream: StreamTarget) {
        debug!(token = %stream.token, "Ignoring registered stream");
    }
}

#[async_trait]
impl RetryHook for DefaultHooks {
    async fn choose_retry_option(&self, retry: RetryActionDto) -> Option<usize> {
        retry.default_option
    }
}

#[async_trait]
impl UserSettingsHook for DefaultHooks {
    async fn read_setting(&self, key: &str) -> Option<String> {
        self.settings.lock().ok()?.get(key).cloned()
    }

    async fn write_setting(&self, key: &str, value: Option<String>) {
        let Ok(mut settings) = self.settings.lock() else {
            return;
        };
        match value {
            Some(value) => settings.insert(key.to_string(), value),
            None => settings.remove(key),
        };
    }
}

impl ValueFormatter for DefaultHooks {
    fn display_value(&self, value: &Value, _data_type: DataType, hints: &TypeHints) -> String {
        use crate::type_hints::TypeHint;

        match value {
            Value::Boolean(true) => hints.get(&TypeHint::TrueKey).unwrap_or("Yes").to_string(),
            Value::Boolean(false) => hints.get(&TypeHint::FalseKey).unwrap_or("No").to_string(),
            other => other.to_string(),
        }
    }
}

impl RefreshPolicy for DefaultHooks {
    fn timing(&self, _attribute: &PersistentObjectAttribute) -> RefreshTiming {
        RefreshTiming::Immediate
    }
}

/// The capabilities a host plugs into a [`crate::Service`]
#[derive(Clone)]
pub struct ServiceHooks {
    pub confirmation: Arc<dyn ConfirmationHook>,
    pub message_dialog: Arc<dyn MessageDialogHook>,
    pub reference_picker: Arc<dyn ReferencePickerHook>,
    pub open: Arc<dyn OpenHook>,
    pub stream: Arc<dyn StreamHook>,
    pub retry: Arc<dyn RetryHook>,
    pub user_settings: Arc<dyn UserSettingsHook>,
    pub formatter: Arc<dyn ValueFormatter>,
    pub refresh_policy: Arc<dyn RefreshPolicy>,
}

impl Default for ServiceHooks {
    fn default() -> Self {
        let defaults = Arc::new(DefaultHooks::default());
        Self {
            confirmation: defaults.clone(),
            message_dialog: defaults.clone(),
            reference_picker: defaults.clone(),
            open: defaults.clone(),
            stream: defaults.clone(),
            retry: defaults.clone(),
            user_settings: defaults.clone(),
            formatter: defaults.clone(),
            refresh_policy: defaults,
        }
    }
}

impl std::fmt::Debug for ServiceHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceHooks").finish_non_exhaustive()
    }
}
