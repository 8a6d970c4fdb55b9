use eyeball::{SharedObservable, Subscriber};
use objsync_wire_protocol::PersistentObjectDto;
use objsync_wire_protocol::well_known::{ACTION_REFRESH, ACTION_SAVE, PARAM_REFRESHED_ATTRIBUTE_ID};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::{debug, error, info, trace, warn};

use crate::action::{Action, ActionGroup, ActionOwner, OwnerEditState};
use crate::attribute::PersistentObjectAttribute;
use crate::error::{Result, ServiceError};
use crate::notification::Notification;
use crate::query::Query;
use crate::service::Service;
use crate::work_queue::WorkQueue;

mod tabs;

pub use tabs::{AttributeGroup, AttributeTab, QueryTab, Tab};

/// Parsed `stateBehavior` flags
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateBehavior {
    pub open_in_edit: bool,
    pub stay_in_edit: bool,
    pub as_dialog: bool,
    raw: String,
}

impl StateBehavior {
    pub fn parse(raw: &str) -> Self {
        let mut behavior = StateBehavior {
            raw: raw.to_string(),
            ..Default::default()
        };
        for flag in raw.split(',').map(str::trim) {
            match flag {
                "OpenInEdit" => behavior.open_in_edit = true,
                "StayInEdit" => behavior.stay_in_edit = true,
                "AsDialog" => behavior.as_dialog = true,
                _ => {}
            }
        }
        behavior
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SaveOptions {
    /// Return failures instead of turning them into a notification
    pub throw_exceptions: bool,
}

#[derive(Debug)]
struct ObjectState {
    object_id: Option<String>,
    label: String,
    breadcrumb: Option<String>,
    is_new: bool,
    is_read_only: bool,
    is_hidden: bool,
    is_bulk_edit: bool,
    bulk_object_ids: Vec<String>,
    state_behavior: StateBehavior,
    dialog_save_action: Option<String>,
    security_token: Option<String>,
    owner_query: Option<Weak<Query>>,
    frozen_by_host: bool,
    /// Number of queued round trips currently holding a freeze
    work_freezes: usize,
    /// Bumped whenever an edit session starts or is cancelled; refresh
    /// responses from an earlier session are dropped
    edit_session: u64,
}

/// A server record mirrored locally.
///
/// All round trips of one object (refresh, save, actions, reference changes)
/// run through its [`WorkQueue`], so at most one request is in flight and
/// each one sees the state left by the previous.
#[derive(Debug)]
pub struct PersistentObject {
    service: Service,
    id: String,
    type_name: String,
    full_type_name: String,
    parent: Option<Weak<PersistentObject>>,
    attributes: Vec<Arc<PersistentObjectAttribute>>,
    queries: Vec<Arc<Query>>,
    actions: Vec<Arc<Action>>,
    state: Mutex<ObjectState>,
    queue: WorkQueue,
    tabs: SharedObservable<Vec<Tab>>,
    is_editing: SharedObservable<bool>,
    is_dirty: SharedObservable<bool>,
    is_frozen: SharedObservable<bool>,
    notification: SharedObservable<Option<Notification>>,
}

/// Holds the object frozen while a round trip runs
pub(crate) struct FreezeGuard<'a> {
    object: &'a PersistentObject,
}

impl Drop for FreezeGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.object.state();
        state.work_freezes = state.work_freezes.saturating_sub(1);
        drop(state);
        self.object.update_frozen();
    }
}

impl PersistentObject {
    pub(crate) fn from_dto(
        service: Service,
        dto: PersistentObjectDto,
        owner_query: Option<Weak<Query>>,
        parent: Option<Weak<PersistentObject>>,
    ) -> Arc<Self> {
        let PersistentObjectDto {
            id,
            type_name,
            full_type_name,
            label,
            object_id,
            breadcrumb,
            notification,
            notification_type,
            notification_duration,
            is_new,
            is_read_only,
            is_hidden,
            is_bulk_edit,
            bulk_object_ids,
            state_behavior,
            attributes,
            tabs: tab_definitions,
            queries,
            actions,
            dialog_save_action,
            security_token,
            ..
        } = dto;
        let notification =
            Notification::from_wire(notification.as_deref(), notification_type, notification_duration);

        let object = Arc::new_cyclic(|this: &Weak<PersistentObject>| {
            let attributes: Vec<_> = attributes
                .into_iter()
                .map(|attribute| {
                    PersistentObjectAttribute::from_dto(&service, attribute, this.clone(), is_new)
                })
                .collect();
            let queries: Vec<_> = queries
                .into_iter()
                .map(|query| Query::from_dto(service.clone(), query, Some(this.clone())))
                .collect();
            let actions = actions
                .iter()
                .filter_map(|name| {
                    Action::get(&service, name, ActionOwner::PersistentObject(this.clone()))
                })
                .collect();
            let tabs = tabs::build_tabs(&tab_definitions, &attributes, &queries);

            PersistentObject {
                service: service.clone(),
                id,
                type_name,
                full_type_name,
                parent,
                attributes,
                queries,
                actions,
                state: Mutex::new(ObjectState {
                    object_id,
                    label,
                    breadcrumb,
                    is_new,
                    is_read_only,
                    is_hidden,
                    is_bulk_edit,
                    bulk_object_ids,
                    state_behavior: StateBehavior::parse(&state_behavior),
                    dialog_save_action,
                    security_token,
                    owner_query,
                    frozen_by_host: false,
                    work_freezes: 0,
                    edit_session: 0,
                }),
                queue: WorkQueue::new(),
                tabs: SharedObservable::new(tabs),
                is_editing: SharedObservable::new(false),
                is_dirty: SharedObservable::new(false),
                is_frozen: SharedObservable::new(false),
                notification: SharedObservable::new(notification),
            }
        });

        let behavior = object.state_behavior();
        if object.is_new() || behavior.open_in_edit || behavior.stay_in_edit {
            object.begin_edit();
        } else {
            object.notify_actions();
        }
        trace!(id = %object.id, object_id = ?object.object_id(), "Persistent object created");
        object
    }

    fn state(&self) -> MutexGuard<'_, ObjectState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn service(&self) -> &Service {
        &self.service
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn full_type_name(&self) -> &str {
        &self.full_type_name
    }

    pub fn object_id(&self) -> Option<String> {
        self.state().object_id.clone()
    }

    pub fn label(&self) -> String {
        self.state().label.clone()
    }

    pub fn breadcrumb(&self) -> Option<String> {
        self.state().breadcrumb.clone()
    }

    pub fn is_new(&self) -> bool {
        self.state().is_new
    }

    pub fn is_read_only(&self) -> bool {
        self.state().is_read_only
    }

    pub fn is_hidden(&self) -> bool {
        self.state().is_hidden
    }

    pub fn is_bulk_edit(&self) -> bool {
        self.state().is_bulk_edit
    }

    pub fn bulk_object_ids(&self) -> Vec<String> {
        self.state().bulk_object_ids.clone()
    }

    pub fn state_behavior(&self) -> StateBehavior {
        self.state().state_behavior.clone()
    }

    pub fn dialog_save_action(&self) -> Option<String> {
        self.state().dialog_save_action.clone()
    }

    pub fn security_token(&self) -> Option<String> {
        self.state().security_token.clone()
    }

    pub fn parent(&self) -> Option<Arc<PersistentObject>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    /// The query this object was opened from, refreshed after a save
    pub fn owner_query(&self) -> Option<Arc<Query>> {
        self.state().owner_query.as_ref().and_then(Weak::upgrade)
    }

    pub fn set_owner_query(&self, query: &Arc<Query>) {
        self.state().owner_query = Some(Arc::downgrade(query));
    }

    pub fn attributes(&self) -> &[Arc<PersistentObjectAttribute>] {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&Arc<PersistentObjectAttribute>> {
        self.attributes.iter().find(|attribute| attribute.name() == name)
    }

    pub fn queries(&self) -> &[Arc<Query>] {
        &self.queries
    }

    pub fn query(&self, name: &str) -> Option<&Arc<Query>> {
        self.queries.iter().find(|query| query.name() == name)
    }

    pub fn actions(&self) -> &[Arc<Action>] {
        &self.actions
    }

    pub fn action(&self, name: &str) -> Option<&Arc<Action>> {
        self.actions.iter().find(|action| action.name() == name)
    }

    pub fn action_groups(&self) -> Vec<ActionGroup> {
        ActionGroup::build(&self.actions)
    }

    pub fn tabs(&self) -> Vec<Tab> {
        self.tabs.get()
    }

    pub fn subscribe_tabs(&self) -> Subscriber<Vec<Tab>> {
        self.tabs.subscribe()
    }

    pub fn queue(&self) -> &WorkQueue {
        &self.queue
    }

    pub fn is_editing(&self) -> bool {
        self.is_editing.get()
    }

    pub fn subscribe_editing(&self) -> Subscriber<bool> {
        self.is_editing.subscribe()
    }

    pub fn is_dirty(&self) -> bool {
        self.is_dirty.get()
    }

    pub fn subscribe_dirty(&self) -> Subscriber<bool> {
        self.is_dirty.subscribe()
    }

    pub fn notification(&self) -> Option<Notification> {
        self.notification.get()
    }

    pub fn subscribe_notification(&self) -> Subscriber<Option<Notification>> {
        self.notification.subscribe()
    }

    pub fn set_notification(&self, notification: Option<Notification>) {
        self.notification.set(notification);
    }

    pub(crate) fn report_error(&self, error: &ServiceError) {
        error!(id = %self.id, object_id = ?self.object_id(), %error, "Request failed");
        self.set_notification(Some(Notification::error(error.notification_message())));
    }

    // Freezing

    /// Frozen objects reject every mutation until [`Self::unfreeze`]
    pub fn freeze(&self) {
        self.state().frozen_by_host = true;
        self.update_frozen();
    }

    pub fn unfreeze(&self) {
        self.state().frozen_by_host = false;
        self.update_frozen();
    }

    pub fn is_frozen(&self) -> bool {
        let state = self.state();
        state.frozen_by_host || state.work_freezes > 0
    }

    pub fn subscribe_frozen(&self) -> Subscriber<bool> {
        self.is_frozen.subscribe()
    }

    pub(crate) fn freeze_guard(&self) -> FreezeGuard<'_> {
        self.state().work_freezes += 1;
        self.update_frozen();
        FreezeGuard { object: self }
    }

    fn update_frozen(&self) {
        let frozen = self.is_frozen();
        self.is_frozen.set_if_not_eq(frozen);
    }

    // Editing

    /// Start an edit session, remembering the current values for cancelling
    pub fn begin_edit(&self) {
        if self.is_editing() || self.is_frozen() {
            return;
        }
        for attribute in &self.attributes {
            attribute.commit();
        }
        self.state().edit_session += 1;
        self.is_dirty.set_if_not_eq(false);
        self.is_editing.set(true);
        debug!(id = %self.id, object_id = ?self.object_id(), "Editing started");
        self.notify_actions();
    }

    /// Restore every attribute to its last committed state
    pub fn cancel_edit(&self) {
        if !self.is_editing() || self.is_frozen() {
            return;
        }
        let is_new = self.is_new();
        self.state().edit_session += 1;
        let mut visibility_changed = false;
        for attribute in &self.attributes {
            visibility_changed |= attribute.restore_committed(is_new);
        }
        if visibility_changed {
            self.update_tabs();
        }
        self.set_notification(None);
        self.is_dirty.set_if_not_eq(false);
        if !is_new && !self.state_behavior().stay_in_edit {
            self.is_editing.set(false);
        }
        debug!(id = %self.id, object_id = ?self.object_id(), "Edit cancelled");
        self.notify_actions();
    }

    fn is_in_edit_session(&self, session: u64) -> bool {
        self.is_editing() && self.state().edit_session == session
    }

    pub(crate) fn update_dirty(&self) {
        let dirty = self.attributes.iter().any(|attribute| attribute.is_changed());
        if self.is_dirty.set_if_not_eq(dirty).is_some() {
            self.notify_actions();
        }
    }

    fn notify_actions(&self) {
        let owner_state = {
            let state = self.state();
            OwnerEditState {
                is_editing: self.is_editing.get(),
                is_dirty: self.is_dirty.get(),
                is_new: state.is_new,
                is_read_only: state.is_read_only,
            }
        };
        for action in &self.actions {
            action.on_owner_state_changed(&owner_state);
        }
    }

    fn update_tabs(&self) {
        let mut tabs = self.tabs.get();
        tabs::update_visibility(&mut tabs, &self.attributes);
        self.tabs.set_if_not_eq(tabs);
    }

    // Server round trips

    /// Refresh the object after `attribute_id` changed. Failures become a
    /// notification on the object.
    pub(crate) async fn refresh_attribute(&self, attribute_id: &str) -> Result<bool> {
        let outcome = self
            .queue
            .run(async {
                if !self.is_editing() {
                    debug!(id = %self.id, "Skipping refresh of an object that stopped editing");
                    return Ok(false);
                }
                let session = self.state().edit_session;
                for attribute in &self.attributes {
                    attribute.on_refresh_sent();
                }

                let parameters = BTreeMap::from([(
                    PARAM_REFRESHED_ATTRIBUTE_ID.to_string(),
                    attribute_id.to_string(),
                )]);
                let result = self
                    .service
                    .execute_action(
                        ACTION_REFRESH,
                        Some(self.to_service_object()),
                        None,
                        Vec::new(),
                        parameters,
                    )
                    .await;

                match result {
                    Ok(Some(result)) if self.is_in_edit_session(session) => {
                        self.refresh_from_result(&result, false);
                        Ok(true)
                    }
                    Ok(Some(_)) => {
                        debug!(id = %self.id, "Dropping refresh response of a cancelled edit");
                        for attribute in &self.attributes {
                            attribute.on_refresh_aborted();
                        }
                        Ok(false)
                    }
                    other => {
                        for attribute in &self.attributes {
                            attribute.on_refresh_aborted();
                        }
                        other.map(|_| false)
                    }
                }
            })
            .await;

        outcome.or_else(|error: ServiceError| {
            self.report_error(&error);
            Ok(false)
        })
    }

    /// Validate, then send the object to the server. Returns whether the save
    /// succeeded; on failure the object stays in edit with its notification
    /// and validation errors set.
    pub async fn save(&self) -> Result<bool> {
        self.save_with(SaveOptions::default()).await
    }

    pub async fn save_with(&self, options: SaveOptions) -> Result<bool> {
        if !self.is_editing() || self.is_frozen() {
            debug!(id = %self.id, "Ignoring save outside of an edit");
            return Ok(false);
        }
        let mut valid = true;
        for attribute in &self.attributes {
            valid &= attribute.validate_for_save();
        }
        if !valid {
            info!(id = %self.id, "Save blocked by validation errors");
            return Ok(false);
        }

        let outcome = self
            .queue
            .run(async {
                let _frozen = self.freeze_guard();
                let result = self
                    .service
                    .execute_action(
                        ACTION_SAVE,
                        Some(self.to_service_object()),
                        None,
                        Vec::new(),
                        BTreeMap::new(),
                    )
                    .await?;
                Ok::<_, ServiceError>(match result {
                    Some(result) => self.apply_save_result(&result),
                    None => false,
                })
            })
            .await;

        match outcome {
            Ok(saved) => {
                if saved {
                    info!(id = %self.id, object_id = ?self.object_id(), "Saved");
                    self.refresh_owner_query();
                }
                Ok(saved)
            }
            Err(error) if options.throw_exceptions => Err(error),
            Err(error) => {
                self.report_error(&error);
                Ok(false)
            }
        }
    }

    fn apply_save_result(&self, result: &PersistentObjectDto) -> bool {
        self.refresh_from_result(result, true);
        let rejected = self.notification().is_some_and(|n| n.is_error())
            || self
                .attributes
                .iter()
                .any(|attribute| attribute.validation_error().is_some());
        if rejected {
            debug!(id = %self.id, "Server rejected save");
            return false;
        }

        for attribute in &self.attributes {
            attribute.commit();
        }
        self.is_dirty.set_if_not_eq(false);
        if !self.state_behavior().stay_in_edit {
            self.is_editing.set(false);
        }
        self.notify_actions();
        true
    }

    fn refresh_owner_query(&self) {
        let Some(query) = self.owner_query() else {
            return;
        };
        tokio::spawn(async move {
            if let Err(error) = query.search().await {
                warn!(query = %query.name(), %error, "Refreshing owner query failed");
            }
        });
    }

    /// Merge a server copy of this object. With `result_wins` every attribute
    /// takes the server value, otherwise attributes edited since the last
    /// refresh was sent keep their local value.
    pub fn refresh_from_result(&self, result: &PersistentObjectDto, result_wins: bool) {
        let (was_new, is_new) = {
            let mut state = self.state();
            let was_new = state.is_new;
            state.object_id = result.object_id.clone();
            state.label = result.label.clone();
            state.breadcrumb = result.breadcrumb.clone();
            state.is_new = result.is_new;
            state.is_read_only = result.is_read_only;
            state.is_hidden = result.is_hidden;
            state.security_token = result.security_token.clone();
            state.dialog_save_action = result.dialog_save_action.clone();
            state.state_behavior = StateBehavior::parse(&result.state_behavior);
            (was_new, state.is_new)
        };
        self.set_notification(Notification::from_wire(
            result.notification.as_deref(),
            result.notification_type,
            result.notification_duration,
        ));

        let mut visibility_changed = false;
        for dto in &result.attributes {
            let attribute = self
                .attributes
                .iter()
                .find(|attribute| !dto.id.is_empty() && attribute.id() == dto.id)
                .or_else(|| self.attribute(&dto.name));
            match attribute {
                Some(attribute) => {
                    visibility_changed |= attribute.refresh_from_result(dto, result_wins, is_new);
                }
                None => trace!(attribute = %dto.name, "Ignoring unknown attribute in result"),
            }
        }
        if was_new != is_new {
            for attribute in &self.attributes {
                visibility_changed |= attribute.update_visibility(is_new);
            }
        }
        if visibility_changed {
            self.update_tabs();
        }
        self.update_dirty();
        self.notify_actions();
    }

    /// Whether `result` describes this very object rather than a new one
    pub fn is_same_object(&self, result: &PersistentObjectDto) -> bool {
        let state = self.state();
        (result.full_type_name == self.full_type_name || result.is_new == state.is_new)
            && result.id == self.id
            && result.object_id == state.object_id
    }

    /// Apply an action result on the queue, so it lands after earlier work
    pub(crate) async fn merge_action_result(&self, result: PersistentObjectDto) {
        self.queue
            .run(async { self.refresh_from_result(&result, true) })
            .await
    }

    /// The wire form of the current local state
    pub fn to_service_object(&self) -> PersistentObjectDto {
        let attributes = self
            .attributes
            .iter()
            .map(|attribute| attribute.to_service_dto())
            .collect();
        let parent = self
            .parent()
            .map(|parent| Box::new(parent.to_service_object()));
        let state = self.state();
        PersistentObjectDto {
            id: self.id.clone(),
            type_name: self.type_name.clone(),
            full_type_name: self.full_type_name.clone(),
            label: state.label.clone(),
            object_id: state.object_id.clone(),
            breadcrumb: state.breadcrumb.clone(),
            is_new: state.is_new,
            is_read_only: state.is_read_only,
            is_hidden: state.is_hidden,
            is_bulk_edit: state.is_bulk_edit,
            bulk_object_ids: state.bulk_object_ids.clone(),
            state_behavior: state.state_behavior.as_str().to_string(),
            attributes,
            actions: self
                .actions
                .iter()
                .map(|action| action.name().to_string())
                .collect(),
            parent,
            dialog_save_action: state.dialog_save_action.clone(),
            security_token: state.security_token.clone(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{attribute_dto, person_dto, signed_in_service};
    use crate::transport::MockTransport;
    use crate::Value;
    use objsync_wire_protocol::RpcMethod;
    use serde_json::json;

    #[tokio::test]
    async fn test_new_object_opens_in_edit() {
        let service = signed_in_service(MockTransport::new()).await;
        let mut dto = person_dto();
        dto.is_new = true;

        let person = PersistentObject::from_dto(service, dto, None, None);
        assert!(person.is_editing());
        assert!(!person.is_dirty());
    }

    #[tokio::test]
    async fn test_cancel_edit_restores_values() {
        let service = signed_in_service(MockTransport::new()).await;
        let person = PersistentObject::from_dto(service, person_dto(), None, None);
        person.begin_edit();

        let last_name = person.attribute("LastName").unwrap();
        last_name.set_value("Byron", true).await.unwrap();
        assert!(person.is_dirty());
        assert_eq!(last_name.value(), Value::from("Byron"));

        person.cancel_edit();
        assert!(!person.is_editing());
        assert!(!person.is_dirty());
        assert_eq!(last_name.service_value().as_deref(), Some("Lovelace"));
    }

    #[tokio::test]
    async fn test_setting_same_value_is_a_no_op() {
        // no ExecuteAction expectation: any refresh would panic the mock
        let service = signed_in_service(MockTransport::new()).await;
        let person = PersistentObject::from_dto(service, person_dto(), None, None);
        person.begin_edit();

        let last_name = person.attribute("LastName").unwrap();
        assert_eq!(
            last_name.set_value("Lovelace", true).await.unwrap(),
            Value::from("Lovelace")
        );
        assert!(!person.is_dirty());
        assert!(!last_name.is_value_changed());
    }

    #[tokio::test]
    async fn test_frozen_object_rejects_edits() {
        let service = signed_in_service(MockTransport::new()).await;
        let person = PersistentObject::from_dto(service, person_dto(), None, None);
        person.begin_edit();
        person.freeze();

        let last_name = person.attribute("LastName").unwrap();
        assert_eq!(
            last_name.set_value("Byron", true).await.unwrap(),
            Value::from("Lovelace")
        );
        person.cancel_edit();
        assert!(person.is_editing(), "cancel is a mutation too");

        person.unfreeze();
        last_name.set_value("Byron", true).await.unwrap();
        assert_eq!(last_name.service_value().as_deref(), Some("Byron"));
    }

    #[tokio::test]
    async fn test_deferred_refresh_runs_on_unchanged_set() {
        let mut transport = MockTransport::new();
        transport
            .expect_post()
            .withf(|method, body| {
                *method == RpcMethod::ExecuteAction
                    && body["action"] == ACTION_REFRESH
                    && body["parameters"][PARAM_REFRESHED_ATTRIBUTE_ID] == "1"
            })
            .times(1)
            .returning(|_, body| {
                let mut parent = body["parent"].clone();
                parent["attributes"][2]["value"] = json!("Grace Lovelace");
                Ok(json!({ "result": parent }))
            });
        let service = signed_in_service(transport).await;
        let person = PersistentObject::from_dto(service, person_dto(), None, None);
        person.begin_edit();

        let first_name = person.attribute("FirstName").unwrap();
        first_name.set_value("Grace", false).await.unwrap();
        assert!(first_name.has_pending_refresh());

        first_name.set_value("Grace", true).await.unwrap();
        assert!(!first_name.has_pending_refresh());
        assert_eq!(
            person.attribute("FullName").unwrap().service_value().as_deref(),
            Some("Grace Lovelace")
        );
    }

    #[tokio::test]
    async fn test_save_rejected_by_server_stays_in_edit() {
        let mut transport = MockTransport::new();
        transport
            .expect_post()
            .withf(|method, body| *method == RpcMethod::ExecuteAction && body["action"] == ACTION_SAVE)
            .times(1)
            .returning(|_, body| {
                let mut result = body["parent"].clone();
                result["notification"] = json!("Last name is taken");
                result["notificationType"] = json!("Error");
                Ok(json!({ "result": result }))
            });
        let service = signed_in_service(transport).await;
        let person = PersistentObject::from_dto(service, person_dto(), None, None);
        person.begin_edit();
        person
            .attribute("LastName")
            .unwrap()
            .set_value("Byron", true)
            .await
            .unwrap();

        assert!(!person.save().await.unwrap());
        assert!(person.is_editing());
        assert!(person.is_dirty());
        assert_eq!(
            person.notification().map(|n| n.message).as_deref(),
            Some("Last name is taken")
        );
        assert!(!person.is_frozen());
    }

    #[tokio::test]
    async fn test_required_attribute_blocks_save() {
        let service = signed_in_service(MockTransport::new()).await;
        let mut dto = person_dto();
        let mut email = attribute_dto("4", "Email", None);
        email.is_required = true;
        dto.attributes.push(email);

        let person = PersistentObject::from_dto(service, dto, None, None);
        person.begin_edit();
        assert!(!person.save().await.unwrap());
        assert!(person.attribute("Email").unwrap().validation_error().is_some());
    }

    #[tokio::test]
    async fn test_transport_failure_becomes_notification() {
        let mut transport = MockTransport::new();
        transport
            .expect_post()
            .withf(|method, _| *method == RpcMethod::ExecuteAction)
            .returning(|_, _| Err(crate::TransportError::Timeout));
        let service = signed_in_service(transport).await;
        let person = PersistentObject::from_dto(service, person_dto(), None, None);
        person.begin_edit();
        person
            .attribute("LastName")
            .unwrap()
            .set_value("Byron", true)
            .await
            .unwrap();

        assert!(!person.save().await.unwrap());
        assert!(person.notification().is_some_and(|n| n.is_error()));

        let strict = person
            .save_with(SaveOptions {
                throw_exceptions: true,
            })
            .await;
        assert!(matches!(strict, Err(ServiceError::Transport(_))));
    }

    #[test]
    fn test_state_behavior_flags() {
        let behavior = StateBehavior::parse("OpenInEdit, StayInEdit");
        assert!(behavior.open_in_edit);
        assert!(behavior.stay_in_edit);
        assert!(!behavior.as_dialog);
        assert_eq!(behavior.as_str(), "OpenInEdit, StayInEdit");
    }
}
