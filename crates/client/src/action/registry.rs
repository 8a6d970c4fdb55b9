use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use super::{Action, ExecuteOptions, OwnerEditState, builtin};
use crate::error::Result;
use crate::persistent_object::PersistentObject;

/// What an action does when executed, and how it reacts to its owner.
///
/// The default implementation sends the action to the server.
#[async_trait]
pub trait ActionBehavior: Send + Sync {
    async fn execute(
        &self,
        action: &Action,
        options: ExecuteOptions,
    ) -> Result<Option<Arc<PersistentObject>>> {
        action.execute_remote(options).await
    }

    /// Called whenever the owning object starts or stops editing or changes
    /// its dirty state
    fn on_owner_state_changed(&self, _action: &Action, _state: &OwnerEditState) {}
}

/// Plain server-side action
#[derive(Debug, Default)]
pub struct RemoteAction;

impl ActionBehavior for RemoteAction {}

pub type ActionFactory = Arc<dyn Fn() -> Arc<dyn ActionBehavior> + Send + Sync>;

/// Maps action names to their client side behavior
#[derive(Clone)]
pub struct ActionRegistry {
    factories: HashMap<String, ActionFactory>,
}

impl Default for ActionRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        builtin::register(&mut registry);
        registry
    }
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.factories.keys().collect();
        names.sort();
        f.debug_struct("ActionRegistry").field("actions", &names).finish()
    }
}

impl ActionRegistry {
    /// A registry without the built-in edit actions
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Arc<dyn ActionBehavior> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// The registered behavior, or [`RemoteAction`] for unknown names
    pub fn resolve(&self, name: &str) -> Arc<dyn ActionBehavior> {
        match self.factories.get(name) {
            Some(factory) => factory(),
            None => Arc::new(RemoteAction),
        }
    }
}
