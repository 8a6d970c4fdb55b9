use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::{Action, ActionBehavior, ActionRegistry, ExecuteOptions, OwnerEditState};
use crate::error::{Result, ServiceError};
use crate::persistent_object::{PersistentObject, SaveOptions};
use crate::query::SearchOptions;

pub(super) fn register(registry: &mut ActionRegistry) {
    registry.register("Edit", || Arc::new(Edit));
    registry.register("CancelEdit", || Arc::new(CancelEdit));
    registry.register("Save", || Arc::new(Save));
    registry.register("EndEdit", || Arc::new(EndEdit));
    registry.register("CancelSave", || Arc::new(CancelSave));
    registry.register("RefreshQuery", || Arc::new(RefreshQuery));
}

fn owner_object(action: &Action) -> Result<Arc<PersistentObject>> {
    action
        .persistent_object()
        .ok_or_else(|| ServiceError::OwnerDropped(action.name().to_string()))
}

async fn save(
    object: &Arc<PersistentObject>,
    options: &ExecuteOptions,
) -> Result<Option<Arc<PersistentObject>>> {
    let saved = object
        .save_with(SaveOptions {
            throw_exceptions: options.throw_exceptions,
        })
        .await?;
    Ok(saved.then(|| object.clone()))
}

struct Edit;

#[async_trait]
impl ActionBehavior for Edit {
    async fn execute(
        &self,
        action: &Action,
        _options: ExecuteOptions,
    ) -> Result<Option<Arc<PersistentObject>>> {
        owner_object(action)?.begin_edit();
        Ok(None)
    }

    fn on_owner_state_changed(&self, action: &Action, state: &OwnerEditState) {
        action.set_visible(!state.is_editing && !state.is_read_only);
    }
}

struct CancelEdit;

#[async_trait]
impl ActionBehavior for CancelEdit {
    async fn execute(
        &self,
        action: &Action,
        _options: ExecuteOptions,
    ) -> Result<Option<Arc<PersistentObject>>> {
        owner_object(action)?.cancel_edit();
        Ok(None)
    }

    fn on_owner_state_changed(&self, action: &Action, state: &OwnerEditState) {
        action.set_visible(state.is_editing && !state.is_new);
    }
}

struct Save;

#[async_trait]
impl ActionBehavior for Save {
    async fn execute(
        &self,
        action: &Action,
        options: ExecuteOptions,
    ) -> Result<Option<Arc<PersistentObject>>> {
        save(&owner_object(action)?, &options).await
    }

    fn on_owner_state_changed(&self, action: &Action, state: &OwnerEditState) {
        action.set_visible(state.is_editing);
        action.set_blocked(!state.is_dirty && !state.is_new);
    }
}

/// Save when there is something to save, otherwise just leave edit mode
struct EndEdit;

#[async_trait]
impl ActionBehavior for EndEdit {
    async fn execute(
        &self,
        action: &Action,
        options: ExecuteOptions,
    ) -> Result<Option<Arc<PersistentObject>>> {
        let object = owner_object(action)?;
        if object.is_dirty() || object.is_new() {
            return save(&object, &options).await;
        }
        debug!(id = %object.id(), "Nothing to save, leaving edit mode");
        object.cancel_edit();
        Ok(None)
    }

    fn on_owner_state_changed(&self, action: &Action, state: &OwnerEditState) {
        action.set_visible(state.is_editing);
    }
}

/// Cancel of a new object, which has nothing to fall back to
struct CancelSave;

#[async_trait]
impl ActionBehavior for CancelSave {
    async fn execute(
        &self,
        action: &Action,
        _options: ExecuteOptions,
    ) -> Result<Option<Arc<PersistentObject>>> {
        let object = owner_object(action)?;
        object.cancel_edit();
        Ok(None)
    }

    fn on_owner_state_changed(&self, action: &Action, state: &OwnerEditState) {
        action.set_visible(state.is_editing && state.is_new);
    }
}

/// Re-run the owning query, client side only
struct RefreshQuery;

#[async_trait]
impl ActionBehavior for RefreshQuery {
    async fn execute(
        &self,
        action: &Action,
        _options: ExecuteOptions,
    ) -> Result<Option<Arc<PersistentObject>>> {
        let query = action
            .query()
            .ok_or_else(|| ServiceError::OwnerDropped(action.name().to_string()))?;
        query
            .search_with(SearchOptions {
                keep_selection: action.definition().keep_selection_on_refresh,
            })
            .await?;
        Ok(None)
    }
}
