use eyeball::SharedObservable;
use std::sync::{Arc, RwLock};

use super::{Service, ServiceInner, Session};
use crate::action::{ActionBehavior, ActionExecutionHandler, ActionRegistry};
use crate::config::ServiceConfig;
use crate::error::{Result, ServiceError};
use crate::hooks::{RefreshPolicy, ServiceHooks};
use crate::transport::Transport;

#[derive(Default)]
pub struct ServiceBuilder {
    transport: Option<Arc<dyn Transport>>,
    config: Option<ServiceConfig>,
    hooks: Option<ServiceHooks>,
    refresh_policy: Option<Arc<dyn RefreshPolicy>>,
    registry: ActionRegistry,
    handlers: Vec<Arc<dyn ActionExecutionHandler>>,
}

impl Service {
    /// Create a new ServiceBuilder for constructing a Service
    pub fn builder() -> ServiceBuilder {
        ServiceBuilder::default()
    }
}

impl ServiceBuilder {
    /// The channel every request goes through. Required.
    pub fn transport(&mut self, transport: Arc<dyn Transport>) {
        self.transport = Some(transport);
    }

    pub fn config(&mut self, config: ServiceConfig) {
        self.config = Some(config);
    }

    /// Load the config from a JSON document, see [`ServiceConfig::from_json_str`]
    pub fn config_json(&mut self, json: &str) -> Result<()> {
        self.config = Some(ServiceConfig::from_json_str(json)?);
        Ok(())
    }

    pub fn hooks(&mut self, hooks: ServiceHooks) {
        self.hooks = Some(hooks);
    }

    /// Takes precedence over the policy in [`ServiceHooks`]
    pub fn refresh_policy(&mut self, policy: Arc<dyn RefreshPolicy>) {
        self.refresh_policy = Some(policy);
    }

    /// Give action `name` client side behavior, replacing a built-in one
    pub fn register_action<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Arc<dyn ActionBehavior> + Send + Sync + 'static,
    {
        self.registry.register(name, factory);
    }

    /// Handlers run in registration order before and after every action
    pub fn action_handler(&mut self, handler: Arc<dyn ActionExecutionHandler>) {
        self.handlers.push(handler);
    }

    pub fn build(self) -> Result<Service> {
        let Some(transport) = self.transport else {
            return Err(ServiceError::Build("A transport is required".to_string()));
        };
        let config = self.config.unwrap_or_default();
        if config.default_page_size == 0 {
            return Err(ServiceError::Build(
                "default_page_size must be at least 1".to_string(),
            ));
        }

        let mut hooks = self.hooks.unwrap_or_default();
        if let Some(policy) = self.refresh_policy {
            hooks.refresh_policy = policy;
        }

        Ok(Service {
            inner: Arc::new(ServiceInner {
                transport,
                hooks,
                config,
                registry: self.registry,
                handlers: self.handlers,
                session: RwLock::new(Session::default()),
                is_signed_in: SharedObservable::new(false),
            }),
        })
    }
}
