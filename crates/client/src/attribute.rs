use eyeball::{SharedObservable, Subscriber};
use objsync_wire_protocol::AttributeDto;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::{debug, trace, warn};

use crate::data_type::{DataKind, DataType, Value};
use crate::error::{Result, ServiceError};
use crate::hooks::RefreshTiming;
use crate::persistent_object::PersistentObject;
use crate::query::Query;
use crate::service::Service;
use crate::type_hints::TypeHints;

mod reference;
mod refresh;
mod visibility;

pub use refresh::{RefreshDecision, RefreshState};
pub use visibility::Visibility;

/// The part of an attribute an edit can touch, and that cancelling restores
#[derive(Debug, Clone, PartialEq)]
struct EditableFields {
    value: Option<String>,
    object_id: Option<String>,
    options: Vec<String>,
    is_read_only: bool,
    is_required: bool,
    is_value_changed: bool,
    visibility: Visibility,
    validation_error: Option<String>,
    type_hints: TypeHints,
}

impl EditableFields {
    fn from_dto(dto: &AttributeDto) -> Self {
        Self {
            value: dto.value.clone(),
            object_id: dto.object_id.clone(),
            options: dto.options.clone(),
            is_read_only: dto.is_read_only,
            is_required: dto.is_required,
            is_value_changed: dto.is_value_changed,
            visibility: Visibility::parse(&dto.visibility),
            validation_error: dto.validation_error.clone(),
            type_hints: TypeHints::from_map(&dto.type_hints),
        }
    }
}

#[derive(Debug)]
struct AttributeState {
    fields: EditableFields,
    committed: EditableFields,
    label: String,
    tool_tip: Option<String>,
    rules: Option<String>,
    triggers_refresh: bool,
    tab: Option<String>,
    group: Option<String>,
    offset: i32,
    column_span: Option<u32>,
    is_sensitive: bool,
    actions: Vec<String>,
    display_attribute: Option<String>,
    can_add_new_reference: bool,
    select_in_place: bool,
    /// Parsed value together with the service value it was parsed from
    cached: Option<(Option<String>, Value)>,
    refresh: RefreshState,
    /// A refresh was deferred and still has to run
    should_refresh: bool,
}

enum LocalChange {
    Rejected,
    Unchanged,
    FlushDeferred,
    Changed { triggers_refresh: bool },
}

/// One field of a [`PersistentObject`].
///
/// The authoritative state is the wire string (`service_value`); the typed
/// [`Value`] is derived from it lazily and cached until the string changes.
#[derive(Debug)]
pub struct PersistentObjectAttribute {
    id: String,
    name: String,
    type_name: String,
    data_type: DataType,
    parent: Weak<PersistentObject>,
    lookup: Option<Arc<Query>>,
    state: Mutex<AttributeState>,
    service_value: SharedObservable<Option<String>>,
    validation_error: SharedObservable<Option<String>>,
    is_visible: SharedObservable<bool>,
}

impl PersistentObjectAttribute {
    pub(crate) fn from_dto(
        service: &Service,
        dto: AttributeDto,
        parent: Weak<PersistentObject>,
        parent_is_new: bool,
    ) -> Arc<Self> {
        let fields = EditableFields::from_dto(&dto);
        let is_visible = fields.visibility.is_visible_on_object(parent_is_new);
        let lookup = dto
            .lookup
            .map(|lookup| Query::from_dto(service.clone(), *lookup, Some(parent.clone())));

        Arc::new(Self {
            data_type: DataType::from_type_name(&dto.type_name),
            service_value: SharedObservable::new(fields.value.clone()),
            validation_error: SharedObservable::new(fields.validation_error.clone()),
            is_visible: SharedObservable::new(is_visible),
            state: Mutex::new(AttributeState {
                committed: fields.clone(),
                fields,
                label: dto.label,
                tool_tip: dto.tool_tip,
                rules: dto.rules,
                triggers_refresh: dto.triggers_refresh,
                tab: dto.tab,
                group: dto.group,
                offset: dto.offset,
                column_span: dto.column_span,
                is_sensitive: dto.is_sensitive,
                actions: dto.actions,
                display_attribute: dto.display_attribute,
                can_add_new_reference: dto.can_add_new_reference,
                select_in_place: dto.select_in_place,
                cached: None,
                refresh: RefreshState::default(),
                should_refresh: false,
            }),
            id: dto.id,
            name: dto.name,
            type_name: dto.type_name,
            parent,
            lookup,
        })
    }

    fn state(&self) -> MutexGuard<'_, AttributeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn parent(&self) -> Option<Arc<PersistentObject>> {
        self.parent.upgrade()
    }

    pub fn label(&self) -> String {
        self.state().label.clone()
    }

    pub fn service_value(&self) -> Option<String> {
        self.state().fields.value.clone()
    }

    pub fn subscribe_service_value(&self) -> Subscriber<Option<String>> {
        self.service_value.subscribe()
    }

    pub fn is_read_only(&self) -> bool {
        self.state().fields.is_read_only
    }

    pub fn is_required(&self) -> bool {
        self.state().fields.is_required
    }

    pub fn is_value_changed(&self) -> bool {
        self.state().fields.is_value_changed
    }

    pub fn visibility(&self) -> Visibility {
        self.state().fields.visibility
    }

    pub fn is_visible(&self) -> bool {
        self.is_visible.get()
    }

    pub fn subscribe_visible(&self) -> Subscriber<bool> {
        self.is_visible.subscribe()
    }

    pub fn options(&self) -> Vec<String> {
        self.state().fields.options.clone()
    }

    pub fn type_hints(&self) -> TypeHints {
        self.state().fields.type_hints.clone()
    }

    pub fn validation_error(&self) -> Option<String> {
        self.validation_error.get()
    }

    pub fn subscribe_validation_error(&self) -> Subscriber<Option<String>> {
        self.validation_error.subscribe()
    }

    pub fn tool_tip(&self) -> Option<String> {
        self.state().tool_tip.clone()
    }

    pub fn rules(&self) -> Option<String> {
        self.state().rules.clone()
    }

    pub fn triggers_refresh(&self) -> bool {
        self.state().triggers_refresh
    }

    pub fn tab(&self) -> Option<String> {
        self.state().tab.clone()
    }

    pub fn group(&self) -> Option<String> {
        self.state().group.clone()
    }

    pub fn offset(&self) -> i32 {
        self.state().offset
    }

    pub fn column_span(&self) -> Option<u32> {
        self.state().column_span
    }

    pub fn is_sensitive(&self) -> bool {
        self.state().is_sensitive
    }

    /// Names of the actions attached to this attribute
    pub fn actions(&self) -> Vec<String> {
        self.state().actions.clone()
    }

    pub fn refresh_state(&self) -> RefreshState {
        self.state().refresh.clone()
    }

    /// Whether a refresh was deferred and has not run yet
    pub fn has_pending_refresh(&self) -> bool {
        self.state().should_refresh
    }

    /// The typed value. Parse failures are logged and read as `Null`.
    pub fn value(&self) -> Value {
        let bulk_edit = self.parent().is_some_and(|parent| parent.is_bulk_edit());
        let mut state = self.state();
        if let Some((source, value)) = &state.cached {
            if *source == state.fields.value {
                return value.clone();
            }
        }

        let value = self
            .data_type
            .from_service_string(state.fields.value.as_deref(), bulk_edit)
            .unwrap_or_else(|error| {
                warn!(attribute = %self.name, %error, "Unparsable service value");
                Value::Null
            });
        trace!(attribute = %self.name, ?value, "Parsed service value");
        state.cached = Some((state.fields.value.clone(), value.clone()));
        value
    }

    /// The value formatted by the host's [`crate::hooks::ValueFormatter`]
    pub fn display_value(&self) -> String {
        if self.data_type.kind == DataKind::Reference {
            return self.service_value().unwrap_or_default();
        }
        let value = self.value();
        match self.parent() {
            Some(parent) => parent.service().hooks().formatter.display_value(
                &value,
                self.data_type,
                &self.type_hints(),
            ),
            None => value.to_string(),
        }
    }

    /// Change the value locally. Ignored (returning the current value) unless
    /// the object is editing, not frozen and the attribute is writable.
    ///
    /// When the attribute triggers a refresh the refresh runs before this
    /// returns, unless `allow_refresh` is false or the refresh policy defers
    /// it; a deferred refresh runs on the next call that leaves the value
    /// unchanged, or through [`Self::trigger_refresh`].
    pub async fn set_value(&self, value: impl Into<Value>, allow_refresh: bool) -> Result<Value> {
        let Some(parent) = self.parent() else {
            return Err(ServiceError::OwnerDropped(self.name.clone()));
        };
        if !parent.is_editing() || parent.is_frozen() {
            debug!(attribute = %self.name, "Ignoring value change outside of an edit");
            return Ok(self.value());
        }

        match self.apply_local_value(value.into()) {
            LocalChange::Rejected | LocalChange::Unchanged => {}
            LocalChange::FlushDeferred => {
                debug!(attribute = %self.name, "Running deferred refresh");
                parent.refresh_attribute(&self.id).await?;
            }
            LocalChange::Changed { triggers_refresh } => {
                parent.update_dirty();
                if triggers_refresh {
                    let timing = parent.service().hooks().refresh_policy.timing(self);
                    if allow_refresh && timing == RefreshTiming::Immediate {
                        parent.refresh_attribute(&self.id).await?;
                    } else {
                        self.state().should_refresh = true;
                    }
                }
            }
        }
        Ok(self.value())
    }

    fn apply_local_value(&self, value: Value) -> LocalChange {
        let mut state = self.state();
        if state.fields.is_read_only {
            return LocalChange::Rejected;
        }

        let value = match value {
            Value::String(text) => {
                Value::String(state.fields.type_hints.character_casing().apply(&text))
            }
            other => other,
        };
        let encoded = match self.data_type.to_service_string(&value) {
            Ok(encoded) => encoded,
            Err(error) => {
                let message = error.to_string();
                debug!(attribute = %self.name, %message, "Rejected value");
                state.fields.validation_error = Some(message.clone());
                drop(state);
                self.validation_error.set(Some(message));
                return LocalChange::Rejected;
            }
        };

        if encoded == state.fields.value {
            return if std::mem::take(&mut state.should_refresh) {
                LocalChange::FlushDeferred
            } else {
                LocalChange::Unchanged
            };
        }

        state.fields.value = encoded.clone();
        state.fields.is_value_changed = true;
        state.fields.validation_error = None;
        state.refresh.on_local_edit();
        let triggers_refresh = state.triggers_refresh;
        drop(state);

        self.service_value.set(encoded);
        self.validation_error.set_if_not_eq(None);
        LocalChange::Changed { triggers_refresh }
    }

    /// Run a refresh for this attribute now. With `immediate` the call waits
    /// for the response, otherwise the refresh is queued in the background.
    pub async fn trigger_refresh(&self, immediate: bool) -> Result<bool> {
        self.state().should_refresh = false;
        let Some(parent) = self.parent() else {
            return Err(ServiceError::OwnerDropped(self.name.clone()));
        };
        if immediate {
            return parent.refresh_attribute(&self.id).await;
        }

        let id = self.id.clone();
        tokio::spawn(async move {
            if let Err(error) = parent.refresh_attribute(&id).await {
                warn!(attribute = %id, %error, "Background refresh failed");
            }
        });
        Ok(true)
    }

    /// Merge a server copy of this attribute. Returns whether the visibility
    /// changed.
    pub(crate) fn refresh_from_result(
        &self,
        dto: &AttributeDto,
        result_wins: bool,
        parent_is_new: bool,
    ) -> bool {
        let mut state = self.state();
        state.label = dto.label.clone();
        state.tool_tip = dto.tool_tip.clone();
        state.rules = dto.rules.clone();
        state.actions = dto.actions.clone();
        state.column_span = dto.column_span;
        state.fields.options = dto.options.clone();
        state.fields.is_read_only = dto.is_read_only;
        state.fields.is_required = dto.is_required;

        let visibility = Visibility::parse(&dto.visibility);
        let visibility_changed = visibility != state.fields.visibility;
        state.fields.visibility = visibility;

        let current = state.fields.value.clone();
        let read_only = state.fields.is_read_only;
        match state.refresh.resolve(current.as_deref(), result_wins, read_only) {
            RefreshDecision::Accept => {
                state.fields.value = dto.value.clone();
                state.fields.validation_error = dto.validation_error.clone();
                state.fields.object_id = dto.object_id.clone();
                state.fields.is_value_changed = dto.is_value_changed;
                state.fields.type_hints = TypeHints::from_map(&dto.type_hints);
                state.display_attribute = dto.display_attribute.clone();
            }
            RefreshDecision::KeepLocal => {
                // the server validated the value it was sent, not this one
                state.fields.validation_error = None;
                debug!(attribute = %self.name, "Keeping value edited during refresh");
            }
        }
        state.triggers_refresh = dto.triggers_refresh;

        let value = state.fields.value.clone();
        let validation_error = state.fields.validation_error.clone();
        drop(state);

        self.service_value.set_if_not_eq(value);
        self.validation_error.set_if_not_eq(validation_error);
        self.is_visible
            .set_if_not_eq(visibility.is_visible_on_object(parent_is_new));
        visibility_changed
    }

    pub(crate) fn on_refresh_sent(&self) {
        let mut state = self.state();
        let current = state.fields.value.clone();
        state.refresh.on_refresh_sent(current.as_deref());
    }

    pub(crate) fn on_refresh_aborted(&self) {
        self.state().refresh.on_refresh_aborted();
    }

    /// Make the current fields the new baseline for dirty checks and cancelling
    pub(crate) fn commit(&self) {
        let mut state = self.state();
        state.committed = state.fields.clone();
        state.refresh.on_commit();
        state.should_refresh = false;
    }

    /// Roll back to the last committed fields. Returns whether the visibility
    /// changed.
    pub(crate) fn restore_committed(&self, parent_is_new: bool) -> bool {
        let mut state = self.state();
        let visibility_changed = state.fields.visibility != state.committed.visibility;
        state.fields = state.committed.clone();
        state.refresh.on_commit();
        state.should_refresh = false;
        let fields = state.fields.clone();
        drop(state);

        self.service_value.set_if_not_eq(fields.value);
        self.validation_error.set_if_not_eq(fields.validation_error);
        self.is_visible
            .set_if_not_eq(fields.visibility.is_visible_on_object(parent_is_new));
        visibility_changed
    }

    /// Differs from the last committed value
    pub(crate) fn is_changed(&self) -> bool {
        let state = self.state();
        state.fields.value != state.committed.value
            || state.fields.object_id != state.committed.object_id
    }

    pub(crate) fn update_visibility(&self, parent_is_new: bool) -> bool {
        let visible = self.visibility().is_visible_on_object(parent_is_new);
        self.is_visible.set_if_not_eq(visible).is_some()
    }

    /// Client side checks run before saving
    pub(crate) fn validate_for_save(&self) -> bool {
        let mut state = self.state();
        if state.fields.validation_error.is_some() {
            return false;
        }
        if !state.fields.is_required || !self.is_visible.get() {
            return true;
        }
        let empty = state
            .fields
            .value
            .as_deref()
            .is_none_or(|value| value.trim().is_empty());
        if !empty {
            return true;
        }

        let message = format!("{} is required", state.label);
        state.fields.validation_error = Some(message.clone());
        drop(state);
        self.validation_error.set(Some(message));
        false
    }

    pub(crate) fn to_service_dto(&self) -> AttributeDto {
        let state = self.state();
        let fields = &state.fields;
        AttributeDto {
            id: self.id.clone(),
            name: self.name.clone(),
            type_name: self.type_name.clone(),
            label: state.label.clone(),
            value: fields.value.clone(),
            is_read_only: fields.is_read_only,
            is_required: fields.is_required,
            is_value_changed: fields.is_value_changed,
            visibility: fields.visibility.to_string(),
            options: if fields.is_value_changed {
                fields.options.clone()
            } else {
                Vec::new()
            },
            type_hints: fields.type_hints.to_map(),
            rules: state.rules.clone(),
            validation_error: None,
            triggers_refresh: state.triggers_refresh,
            tab: state.tab.clone(),
            group: state.group.clone(),
            offset: state.offset,
            tool_tip: state.tool_tip.clone(),
            column_span: state.column_span,
            is_sensitive: state.is_sensitive,
            actions: state.actions.clone(),
            lookup: None,
            object_id: fields.object_id.clone(),
            display_attribute: state.display_attribute.clone(),
            can_add_new_reference: state.can_add_new_reference,
            select_in_place: state.select_in_place,
        }
    }
}
