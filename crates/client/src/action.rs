use eyeball::{SharedObservable, Subscriber};
use objsync_wire_protocol::PersistentObjectDto;
use objsync_wire_protocol::well_known::{
    ACTION_ADD_REFERENCE, ADD_REFERENCE_TYPE, NOTIFICATION_DIALOG, NOTIFICATION_TYPE,
    PARAM_ADD_ACTION, PARAM_MENU_LABEL, PARAM_MENU_OPTION, REGISTERED_STREAM_TYPE,
};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::{debug, info, warn};

use crate::error::{Result, ServiceError};
use crate::hooks::{ConfirmationRequest, MessageDialog, StreamTarget};
use crate::notification::Notification;
use crate::persistent_object::PersistentObject;
use crate::query::{Query, QueryResultItem, SearchOptions};
use crate::service::Service;

mod builtin;
mod definition;
mod group;
mod handler;
mod registry;
mod selection_rule;

pub use definition::ActionDefinition;
pub use group::ActionGroup;
pub use handler::{ActionExecutionHandler, HandlerFlow};
pub use registry::{ActionBehavior, ActionFactory, ActionRegistry, RemoteAction};
pub use selection_rule::{SelectionRule, SelectionRuleError};

/// What an action operates on
#[derive(Debug, Clone)]
pub enum ActionOwner {
    PersistentObject(Weak<PersistentObject>),
    Query(Weak<Query>),
}

impl ActionOwner {
    fn set_notification(&self, notification: Option<Notification>) {
        match self {
            ActionOwner::PersistentObject(object) => {
                if let Some(object) = object.upgrade() {
                    object.set_notification(notification);
                }
            }
            ActionOwner::Query(query) => {
                if let Some(query) = query.upgrade() {
                    query.set_notification(notification);
                }
            }
        }
    }

    fn report_error(&self, error: &ServiceError) {
        match self {
            ActionOwner::PersistentObject(object) => {
                if let Some(object) = object.upgrade() {
                    object.report_error(error);
                }
            }
            ActionOwner::Query(query) => {
                if let Some(query) = query.upgrade() {
                    query.report_error(error);
                }
            }
        }
    }
}

/// Edit state of an owning object, handed to [`ActionBehavior`]s
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OwnerEditState {
    pub is_editing: bool,
    pub is_dirty: bool,
    pub is_new: bool,
    pub is_read_only: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Index into [`ActionDefinition::options`]
    pub menu_option: Option<usize>,
    pub parameters: BTreeMap<String, String>,
    /// Overrides the owning query's selection
    pub selected_items: Option<Vec<Arc<QueryResultItem>>>,
    /// Do not hand a returned object to the open hook
    pub skip_open: bool,
    pub no_confirmation: bool,
    /// Return failures instead of turning them into a notification
    pub throw_exceptions: bool,
}

#[derive(Debug, Default)]
struct ActionState {
    is_blocked: bool,
    selection_count: usize,
}

/// How an action result is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResultKind {
    Dialog,
    Toast,
    Stream,
    AddReference,
    SameObject,
    Open,
}

impl ResultKind {
    fn classify(result: &PersistentObjectDto, parent: Option<&PersistentObject>) -> Self {
        match result.full_type_name.as_str() {
            NOTIFICATION_TYPE if result.object_id.as_deref() == Some(NOTIFICATION_DIALOG) => {
                ResultKind::Dialog
            }
            NOTIFICATION_TYPE => ResultKind::Toast,
            REGISTERED_STREAM_TYPE => ResultKind::Stream,
            ADD_REFERENCE_TYPE => ResultKind::AddReference,
            _ if parent.is_some_and(|parent| parent.is_same_object(result)) => {
                ResultKind::SameObject
            }
            _ => ResultKind::Open,
        }
    }
}

/// A named operation bound to a persistent object or a query
pub struct Action {
    service: Service,
    definition: Arc<ActionDefinition>,
    owner: ActionOwner,
    behavior: Arc<dyn ActionBehavior>,
    state: Mutex<ActionState>,
    can_execute: SharedObservable<bool>,
    is_visible: SharedObservable<bool>,
}

impl std::fmt::Debug for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Action")
            .field("name", &self.definition.name)
            .field("owner", &self.owner)
            .field("can_execute", &self.can_execute.get())
            .field("is_visible", &self.is_visible.get())
            .finish_non_exhaustive()
    }
}

impl Action {
    /// Bind the definition called `name` to `owner`. Unknown names yield `None`.
    pub fn get(service: &Service, name: &str, owner: ActionOwner) -> Option<Arc<Action>> {
        let Some(definition) = service.action_definition(name) else {
            warn!(action = name, "No definition for action, skipping");
            return None;
        };
        let action = Arc::new(Action {
            service: service.clone(),
            behavior: service.registry().resolve(name),
            definition,
            owner,
            state: Mutex::new(ActionState::default()),
            can_execute: SharedObservable::new(false),
            is_visible: SharedObservable::new(true),
        });
        action.update_can_execute();
        Some(action)
    }

    fn state(&self) -> MutexGuard<'_, ActionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn display_name(&self) -> &str {
        &self.definition.display_name
    }

    pub fn definition(&self) -> &ActionDefinition {
        &self.definition
    }

    pub fn owner(&self) -> &ActionOwner {
        &self.owner
    }

    /// The owning object, or the parent object of the owning query
    pub fn persistent_object(&self) -> Option<Arc<PersistentObject>> {
        match &self.owner {
            ActionOwner::PersistentObject(object) => object.upgrade(),
            ActionOwner::Query(query) => query.upgrade().and_then(|query| query.parent()),
        }
    }

    pub fn query(&self) -> Option<Arc<Query>> {
        match &self.owner {
            ActionOwner::Query(query) => query.upgrade(),
            ActionOwner::PersistentObject(_) => None,
        }
    }

    pub fn can_execute(&self) -> bool {
        self.can_execute.get()
    }

    pub fn subscribe_can_execute(&self) -> Subscriber<bool> {
        self.can_execute.subscribe()
    }

    pub fn is_visible(&self) -> bool {
        self.is_visible.get()
    }

    pub fn set_visible(&self, visible: bool) {
        self.is_visible.set_if_not_eq(visible);
    }

    pub fn subscribe_visible(&self) -> Subscriber<bool> {
        self.is_visible.subscribe()
    }

    pub fn is_blocked(&self) -> bool {
        self.state().is_blocked
    }

    /// A blocked action cannot execute regardless of the selection
    pub fn set_blocked(&self, blocked: bool) {
        self.state().is_blocked = blocked;
        self.update_can_execute();
    }

    pub fn selection_count(&self) -> usize {
        self.state().selection_count
    }

    pub(crate) fn set_selection_count(&self, count: usize) {
        self.state().selection_count = count;
        self.update_can_execute();
    }

    pub(crate) fn on_owner_state_changed(&self, owner_state: &OwnerEditState) {
        self.behavior.on_owner_state_changed(self, owner_state);
    }

    fn allowed_for(&self, selection_count: usize) -> bool {
        let rule_holds = match self.owner {
            ActionOwner::Query(_) => self.definition.selection_rule.is_satisfied(selection_count),
            ActionOwner::PersistentObject(_) => true,
        };
        rule_holds && !self.is_blocked()
    }

    fn update_can_execute(&self) {
        let allowed = self.allowed_for(self.selection_count());
        self.can_execute.set_if_not_eq(allowed);
    }

    /// Run the action: check the selection rule, ask for confirmation, consult
    /// the execution handlers, then hand over to the action's behavior.
    ///
    /// Returns the object the action produced, if it produced one to open.
    pub async fn execute(&self, options: ExecuteOptions) -> Result<Option<Arc<PersistentObject>>> {
        let selection_count = options
            .selected_items
            .as_ref()
            .map_or_else(|| self.selection_count(), Vec::len);
        if !self.allowed_for(selection_count) {
            debug!(action = %self.name(), selection_count, "Action cannot execute");
            return Ok(None);
        }

        if let Some(message) = &self.definition.confirmation {
            if !options.no_confirmation {
                let request = ConfirmationRequest {
                    action: self.name().to_string(),
                    display_name: self.display_name().to_string(),
                    message: message.clone(),
                    option: options
                        .menu_option
                        .and_then(|index| self.definition.options.get(index).cloned()),
                };
                if !self.service.hooks().confirmation.confirm(request).await {
                    info!(action = %self.name(), "Action not confirmed");
                    return Ok(None);
                }
            }
        }

        for handler in self.service.action_handlers() {
            if handler.before_execute(self, &options).await == HandlerFlow::Veto {
                info!(action = %self.name(), "Action vetoed by handler");
                return Ok(None);
            }
        }

        let behavior = self.behavior.clone();
        behavior.execute(self, options).await
    }

    /// Send the action to the server and interpret its result. Failures turn
    /// into an error notification on the owner unless `throw_exceptions` is set.
    pub async fn execute_remote(
        &self,
        options: ExecuteOptions,
    ) -> Result<Option<Arc<PersistentObject>>> {
        match self.run_remote(&options).await {
            Err(error) if !options.throw_exceptions => {
                self.owner.report_error(&error);
                Ok(None)
            }
            outcome => outcome,
        }
    }

    fn parameters(&self, options: &ExecuteOptions) -> BTreeMap<String, String> {
        let mut parameters = options.parameters.clone();
        if let Some(index) = options.menu_option {
            parameters.insert(PARAM_MENU_OPTION.to_string(), index.to_string());
            if let Some(label) = self.definition.options.get(index) {
                parameters.insert(PARAM_MENU_LABEL.to_string(), label.clone());
            }
        }
        parameters
    }

    fn owner_dropped(&self) -> ServiceError {
        ServiceError::OwnerDropped(self.name().to_string())
    }

    async fn run_remote(&self, options: &ExecuteOptions) -> Result<Option<Arc<PersistentObject>>> {
        let parameters = self.parameters(options);
        let mut result = match &self.owner {
            ActionOwner::PersistentObject(object) => {
                let object = object.upgrade().ok_or_else(|| self.owner_dropped())?;
                object
                    .queue()
                    .run(async {
                        let _frozen = object.freeze_guard();
                        self.service
                            .execute_action(
                                self.name(),
                                Some(object.to_service_object()),
                                None,
                                Vec::new(),
                                parameters,
                            )
                            .await
                    })
                    .await?
            }
            ActionOwner::Query(query) => {
                let query = query.upgrade().ok_or_else(|| self.owner_dropped())?;
                query
                    .queue()
                    .run(async {
                        let parent = query.parent();
                        let _frozen = parent.as_ref().map(|parent| parent.freeze_guard());
                        let selected_items = match &options.selected_items {
                            Some(items) => items.iter().map(|item| item.to_service_item()).collect(),
                            None => query.selected_items_for_request(),
                        };
                        self.service
                            .execute_action(
                                self.name(),
                                parent.as_ref().map(|parent| parent.to_service_object()),
                                Some(query.to_service_query()),
                                selected_items,
                                parameters,
                            )
                            .await
                    })
                    .await?
            }
        };

        for handler in self.service.action_handlers() {
            result = handler.after_execute(self, result).await;
        }
        self.handle_result(result, options).await
    }

    async fn handle_result(
        &self,
        result: Option<PersistentObjectDto>,
        options: &ExecuteOptions,
    ) -> Result<Option<Arc<PersistentObject>>> {
        let mut refresh_query = self
            .query()
            .filter(|_| self.definition.refresh_query_on_completed);
        let mut toast = None;

        let outcome = match result {
            None => None,
            Some(result) => {
                let parent = self.persistent_object();
                match ResultKind::classify(&result, parent.as_deref()) {
                    ResultKind::Dialog => {
                        let dialog = MessageDialog {
                            title: result.label,
                            message: result.notification.unwrap_or_default(),
                            kind: result.notification_type,
                        };
                        self.service
                            .hooks()
                            .message_dialog
                            .show_message_dialog(dialog)
                            .await;
                        None
                    }
                    ResultKind::Toast => {
                        toast = Notification::from_wire(
                            result.notification.as_deref(),
                            result.notification_type,
                            result.notification_duration,
                        );
                        None
                    }
                    ResultKind::Stream => {
                        let stream = StreamTarget {
                            token: result.object_id.clone().unwrap_or_default(),
                            label: result.label.clone(),
                            object: result,
                        };
                        self.service.hooks().stream.handle_stream(stream).await;
                        None
                    }
                    ResultKind::AddReference => {
                        self.add_references(result, parent, options).await?;
                        refresh_query = self.query();
                        None
                    }
                    ResultKind::SameObject => match parent {
                        Some(parent) => {
                            parent.merge_action_result(result).await;
                            Some(parent)
                        }
                        None => None,
                    },
                    ResultKind::Open => {
                        let query = self.query();
                        let object = PersistentObject::from_dto(
                            self.service.clone(),
                            result,
                            query.as_ref().map(Arc::downgrade),
                            parent.as_ref().map(Arc::downgrade),
                        );
                        if !options.skip_open {
                            self.service.hooks().open.open(object.clone()).await;
                        }
                        Some(object)
                    }
                }
            }
        };

        match refresh_query {
            Some(query) => self.spawn_query_refresh(query, toast),
            None => {
                if toast.is_some() {
                    self.owner.set_notification(toast);
                }
            }
        }
        Ok(outcome)
    }

    /// Let the user pick from the lookup the server sent, then commit the picks
    async fn add_references(
        &self,
        result: PersistentObjectDto,
        parent: Option<Arc<PersistentObject>>,
        options: &ExecuteOptions,
    ) -> Result<()> {
        let lookup = result
            .queries
            .into_iter()
            .next()
            .ok_or(ServiceError::MissingResult("lookup query"))?;
        let lookup = Query::from_dto(
            self.service.clone(),
            lookup,
            parent.as_ref().map(Arc::downgrade),
        );
        if !lookup.has_searched() {
            lookup.search().await?;
        }

        let picked = self
            .service
            .hooks()
            .reference_picker
            .select_references(lookup.clone())
            .await;
        if picked.is_empty() {
            debug!(action = %self.name(), "No references picked");
            return Ok(());
        }

        let selected_items: Vec<_> = picked.iter().map(|item| item.to_service_item()).collect();
        let mut parameters = self.parameters(options);
        parameters.insert(PARAM_ADD_ACTION.to_string(), self.name().to_string());
        let commit = async {
            self.service
                .execute_action(
                    ACTION_ADD_REFERENCE,
                    parent.as_ref().map(|parent| parent.to_service_object()),
                    Some(lookup.to_service_query()),
                    selected_items,
                    parameters,
                )
                .await
        };
        let committed = match &parent {
            Some(parent) => {
                parent
                    .queue()
                    .run(async {
                        let _frozen = parent.freeze_guard();
                        commit.await
                    })
                    .await?
            }
            None => commit.await?,
        };

        if let (Some(committed), Some(parent)) = (committed, &parent) {
            if parent.is_same_object(&committed) {
                parent.merge_action_result(committed).await;
            }
        }
        info!(action = %self.name(), count = picked.len(), "References added");
        Ok(())
    }

    /// Re-run the owning query in the background; a toast from the action is
    /// shown only once the query is up to date
    fn spawn_query_refresh(&self, query: Arc<Query>, toast: Option<Notification>) {
        let keep_selection = self.definition.keep_selection_on_refresh;
        let owner = self.owner.clone();
        tokio::spawn(async move {
            if let Err(error) = query.search_with(SearchOptions { keep_selection }).await {
                warn!(query = %query.name(), %error, "Refreshing query after action failed");
            }
            if toast.is_some() {
                owner.set_notification(toast);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{person_dto, signed_in_service_with};
    use crate::transport::MockTransport;
    use objsync_wire_protocol::{ActionDefinitionDto, RpcMethod};
    use serde_json::json;

    fn definitions() -> Vec<ActionDefinitionDto> {
        vec![
            ActionDefinitionDto {
                name: "Approve".to_string(),
                confirmation: Some("Approve this person?".to_string()),
                options: vec!["Now".to_string(), "Tomorrow".to_string()],
                ..Default::default()
            },
            ActionDefinitionDto {
                name: "Edit".to_string(),
                ..Default::default()
            },
            ActionDefinitionDto {
                name: "Save".to_string(),
                ..Default::default()
            },
        ]
    }

    fn person_with_actions(service: Service) -> Arc<PersistentObject> {
        let mut dto = person_dto();
        dto.actions = vec!["Approve".to_string(), "Edit".to_string(), "Save".to_string()];
        PersistentObject::from_dto(service, dto, None, None)
    }

    #[tokio::test]
    async fn test_builtin_visibility_follows_edit_state() {
        let service = signed_in_service_with(MockTransport::new(), definitions()).await;
        let person = person_with_actions(service);

        let edit = person.action("Edit").unwrap();
        let save = person.action("Save").unwrap();
        assert!(edit.is_visible());
        assert!(!save.is_visible());

        person.begin_edit();
        assert!(!edit.is_visible());
        assert!(save.is_visible());
        assert!(!save.can_execute(), "nothing to save yet");

        person
            .attribute("LastName")
            .unwrap()
            .set_value("Byron", true)
            .await
            .unwrap();
        assert!(save.can_execute());
    }

    #[tokio::test]
    async fn test_notification_result_yields_nothing() {
        let mut transport = MockTransport::new();
        transport
            .expect_post()
            .withf(|method, body| {
                *method == RpcMethod::ExecuteAction
                    && body["action"] == "Approve"
                    && body["parameters"][PARAM_MENU_OPTION] == "1"
                    && body["parameters"][PARAM_MENU_LABEL] == "Tomorrow"
            })
            .times(1)
            .returning(|_, _| {
                Ok(json!({
                    "result": {
                        "fullTypeName": NOTIFICATION_TYPE,
                        "notification": "Approval scheduled",
                        "notificationType": "OK"
                    }
                }))
            });
        let service = signed_in_service_with(transport, definitions()).await;
        let person = person_with_actions(service);

        let approve = person.action("Approve").unwrap();
        let opened = approve
            .execute(ExecuteOptions {
                menu_option: Some(1),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(opened.is_none());
        let notification = person.notification().unwrap();
        assert_eq!(notification.message, "Approval scheduled");
        assert_eq!(notification.kind, crate::NotificationType::Ok);
        assert!(!person.is_frozen());
    }

    #[tokio::test]
    async fn test_server_exception_becomes_notification() {
        let mut transport = MockTransport::new();
        transport
            .expect_post()
            .withf(|method, _| *method == RpcMethod::ExecuteAction)
            .returning(|_, _| Ok(json!({ "exception": "Not allowed" })));
        let service = signed_in_service_with(transport, definitions()).await;
        let person = person_with_actions(service);
        let approve = person.action("Approve").unwrap();

        let quiet = approve
            .execute(ExecuteOptions {
                no_confirmation: true,
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(quiet.is_none());
        assert_eq!(
            person.notification().map(|n| n.message).as_deref(),
            Some("Not allowed")
        );

        let loud = approve
            .execute(ExecuteOptions {
                no_confirmation: true,
                throw_exceptions: true,
                ..Default::default()
            })
            .await;
        assert!(matches!(loud, Err(ServiceError::Server(message)) if message == "Not allowed"));
    }

    #[tokio::test]
    async fn test_blocked_action_does_not_execute() {
        // no ExecuteAction expectation: sending anything would panic the mock
        let service = signed_in_service_with(MockTransport::new(), definitions()).await;
        let person = person_with_actions(service);
        let approve = person.action("Approve").unwrap();

        approve.set_blocked(true);
        assert!(!approve.can_execute());
        assert!(approve.execute(ExecuteOptions::default()).await.unwrap().is_none());
    }

    #[test]
    fn test_result_classification() {
        let dialog = PersistentObjectDto {
            full_type_name: NOTIFICATION_TYPE.to_string(),
            object_id: Some(NOTIFICATION_DIALOG.to_string()),
            ..Default::default()
        };
        assert_eq!(ResultKind::classify(&dialog, None), ResultKind::Dialog);

        let stream = PersistentObjectDto {
            full_type_name: REGISTERED_STREAM_TYPE.to_string(),
            ..Default::default()
        };
        assert_eq!(ResultKind::classify(&stream, None), ResultKind::Stream);
        assert_eq!(ResultKind::classify(&person_dto(), None), ResultKind::Open);
    }
}
