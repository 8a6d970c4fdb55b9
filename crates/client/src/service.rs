use eyeball::{SharedObservable, Subscriber};
use objsync_wire_protocol::well_known::PARAM_RETRY_OPTION;
use objsync_wire_protocol::{
    ApplicationDto, ExecuteActionRequest, ExecuteActionResponse, ExecuteQueryRequest,
    ExecuteQueryResponse, GetApplicationRequest, GetApplicationResponse,
    GetPersistentObjectRequest, GetPersistentObjectResponse, GetQueryRequest, GetQueryResponse,
    PersistentObjectDto, QueryDto, QueryResultDto, QueryResultItemDto, Request, RequestHeader,
    Response, RpcMethod,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, trace, warn};

use crate::action::{ActionDefinition, ActionExecutionHandler, ActionRegistry};
use crate::config::ServiceConfig;
use crate::error::{Result, ServiceError};
use crate::hooks::ServiceHooks;
use crate::persistent_object::PersistentObject;
use crate::query::Query;
use crate::transport::Transport;

mod builder;

pub use builder::ServiceBuilder;

#[derive(Debug, Default)]
struct Session {
    user_name: Option<String>,
    auth_token: Option<String>,
    application: Option<Arc<ApplicationDto>>,
    definitions: HashMap<String, Arc<ActionDefinition>>,
}

struct ServiceInner {
    transport: Arc<dyn Transport>,
    hooks: ServiceHooks,
    config: ServiceConfig,
    registry: ActionRegistry,
    handlers: Vec<Arc<dyn ActionExecutionHandler>>,
    session: RwLock<Session>,
    is_signed_in: SharedObservable<bool>,
}

/// Session root and RPC gateway.
///
/// Cheap to clone; every clone shares the same session. Objects and queries
/// created through it keep a clone to issue their own round trips.
#[derive(Clone)]
pub struct Service {
    inner: Arc<ServiceInner>,
}

impl std::fmt::Debug for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service")
            .field("user_name", &self.user_name())
            .field("is_signed_in", &self.is_signed_in())
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl Service {
    fn session(&self) -> RwLockReadGuard<'_, Session> {
        self.inner
            .session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn session_mut(&self) -> RwLockWriteGuard<'_, Session> {
        self.inner
            .session
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn hooks(&self) -> &ServiceHooks {
        &self.inner.hooks
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.inner.config
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.inner.registry
    }

    pub fn action_handlers(&self) -> &[Arc<dyn ActionExecutionHandler>] {
        &self.inner.handlers
    }

    // Session

    pub fn is_signed_in(&self) -> bool {
        self.inner.is_signed_in.get()
    }

    pub fn subscribe_signed_in(&self) -> Subscriber<bool> {
        self.inner.is_signed_in.subscribe()
    }

    pub fn user_name(&self) -> Option<String> {
        self.session().user_name.clone()
    }

    /// Current session token, renewed by the server as requests go by
    pub fn auth_token(&self) -> Option<String> {
        self.session().auth_token.clone()
    }

    pub fn application(&self) -> Option<Arc<ApplicationDto>> {
        self.session().application.clone()
    }

    pub fn action_definition(&self, name: &str) -> Option<Arc<ActionDefinition>> {
        self.session().definitions.get(name).cloned()
    }

    pub async fn sign_in_with_credentials(
        &self,
        user_name: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<()> {
        let header = RequestHeader {
            user_name: Some(user_name.into()),
            password: Some(password.into()),
            ..self.base_header()
        };
        self.sign_in(header).await
    }

    /// Resume a session. Without a user name the configured default is used.
    pub async fn sign_in_with_token(
        &self,
        user_name: Option<&str>,
        auth_token: impl Into<String>,
    ) -> Result<()> {
        let header = RequestHeader {
            user_name: user_name
                .map(str::to_string)
                .or_else(|| self.inner.config.default_user_name.clone()),
            auth_token: Some(auth_token.into()),
            ..self.base_header()
        };
        self.sign_in(header).await
    }

    async fn sign_in(&self, header: RequestHeader) -> Result<()> {
        let requested_user = header.user_name.clone();
        let requested_token = header.auth_token.clone();
        let (renewed_token, response): (_, GetApplicationResponse) = self
            .send(RpcMethod::GetApplication, header, GetApplicationRequest::default())
            .await?;
        let application = response
            .application
            .ok_or(ServiceError::MissingResult("application"))?;
        let Some(auth_token) = renewed_token.or(requested_token) else {
            return Err(ServiceError::NotSignedIn);
        };

        let definitions = application
            .actions
            .iter()
            .cloned()
            .map(|dto| {
                let definition = ActionDefinition::from(dto);
                (definition.name.clone(), Arc::new(definition))
            })
            .collect();
        let user_name = Some(application.user_name.clone())
            .filter(|name| !name.is_empty())
            .or(requested_user);
        info!(user = ?user_name, actions = application.actions.len(), "Signed in");

        *self.session_mut() = Session {
            user_name,
            auth_token: Some(auth_token),
            application: Some(Arc::new(application)),
            definitions,
        };
        self.inner.is_signed_in.set(true);
        Ok(())
    }

    pub fn sign_out(&self) {
        *self.session_mut() = Session::default();
        self.inner.is_signed_in.set(false);
        info!("Signed out");
    }

    // Settings

    pub async fn user_setting(&self, key: &str) -> Option<String> {
        self.inner.hooks.user_settings.read_setting(key).await
    }

    pub async fn set_user_setting(&self, key: &str, value: Option<String>) {
        self.inner.hooks.user_settings.write_setting(key, value).await
    }

    // Round trips

    pub async fn get_persistent_object(
        &self,
        parent: Option<&Arc<PersistentObject>>,
        type_id: &str,
        object_id: Option<&str>,
        is_new: bool,
    ) -> Result<Arc<PersistentObject>> {
        let request = GetPersistentObjectRequest {
            persistent_object_type_id: type_id.to_string(),
            object_id: object_id.map(str::to_string),
            is_new,
            parent: parent.map(|parent| parent.to_service_object()),
        };
        let response: GetPersistentObjectResponse =
            self.post(RpcMethod::GetPersistentObject, request).await?;
        let dto = response
            .result
            .ok_or(ServiceError::MissingResult("persistent object"))?;
        Ok(PersistentObject::from_dto(
            self.clone(),
            dto,
            None,
            parent.map(Arc::downgrade),
        ))
    }

    /// Load a query definition. Auto queries that came without rows are
    /// searched before they are returned.
    pub async fn get_query(&self, id: &str, text_search: Option<&str>) -> Result<Arc<Query>> {
        let request = GetQueryRequest {
            id: id.to_string(),
            text_search: text_search.map(str::to_string),
        };
        let response: GetQueryResponse = self.post(RpcMethod::GetQuery, request).await?;
        let dto = response.query.ok_or(ServiceError::MissingResult("query"))?;
        let needs_search = dto.auto_query && dto.result.is_none();

        let query = Query::from_dto(self.clone(), dto, None);
        if needs_search {
            query.search().await?;
        }
        Ok(query)
    }

    pub(crate) async fn execute_query(
        &self,
        parent: Option<PersistentObjectDto>,
        query: QueryDto,
    ) -> Result<QueryResultDto> {
        let response: ExecuteQueryResponse = self
            .post(RpcMethod::ExecuteQuery, ExecuteQueryRequest { query, parent })
            .await?;
        response.result.ok_or(ServiceError::MissingResult("query result"))
    }

    /// Run action `action` on the server. When the server asks a retry
    /// question the [`crate::hooks::RetryHook`] picks an option and the action
    /// is sent again; dismissing the question ends with `Ok(None)`.
    pub async fn execute_action(
        &self,
        action: &str,
        parent: Option<PersistentObjectDto>,
        query: Option<QueryDto>,
        selected_items: Vec<QueryResultItemDto>,
        parameters: BTreeMap<String, String>,
    ) -> Result<Option<PersistentObjectDto>> {
        let mut request = ExecuteActionRequest {
            action: action.to_string(),
            parent,
            query,
            selected_items,
            parameters,
        };
        loop {
            let response: ExecuteActionResponse =
                self.post(RpcMethod::ExecuteAction, &request).await?;
            let Some(retry) = response.retry else {
                return Ok(response.result);
            };

            let options = retry.options.clone();
            let cancel_option = retry.cancel_option;
            let choice = self.inner.hooks.retry.choose_retry_option(retry).await;
            match choice {
                Some(index) if Some(index) != cancel_option => {
                    let label = options
                        .get(index)
                        .cloned()
                        .unwrap_or_else(|| index.to_string());
                    debug!(action, option = %label, "Retrying action");
                    request
                        .parameters
                        .insert(PARAM_RETRY_OPTION.to_string(), label);
                }
                _ => {
                    info!(action, "Retry question dismissed");
                    return Ok(None);
                }
            }
        }
    }

    fn base_header(&self) -> RequestHeader {
        RequestHeader {
            client_version: self.inner.config.client_version.clone(),
            environment: self.inner.config.environment.clone(),
            environment_version: self.inner.config.environment_version.clone(),
            ..Default::default()
        }
    }

    /// Post on behalf of the signed in session, storing a renewed token
    async fn post<B, R>(&self, method: RpcMethod, body: B) -> Result<R>
    where
        B: Serialize,
        R: DeserializeOwned,
    {
        let header = {
            let session = self.session();
            if session.auth_token.is_none() {
                return Err(ServiceError::NotSignedIn);
            }
            RequestHeader {
                user_name: session.user_name.clone(),
                auth_token: session.auth_token.clone(),
                ..self.base_header()
            }
        };
        let (renewed_token, response) = self.send(method, header, body).await?;
        if let Some(token) = renewed_token {
            trace!(%method, "Auth token renewed");
            self.session_mut().auth_token = Some(token);
        }
        Ok(response)
    }

    async fn send<B, R>(
        &self,
        method: RpcMethod,
        header: RequestHeader,
        body: B,
    ) -> Result<(Option<String>, R)>
    where
        B: Serialize,
        R: DeserializeOwned,
    {
        let body = Request::new(header, body).to_value()?;
        debug!(%method, "Sending request");
        let response = self.inner.transport.post(method, body).await?;
        let Response { header, body } = Response::<R>::from_value(response)?;
        if let Some(exception) = header.exception {
            warn!(%method, %exception, "Server returned an exception");
            return Err(ServiceError::Server(exception));
        }
        Ok((header.auth_token, body))
    }
}
