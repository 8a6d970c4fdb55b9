use objsync_wire_protocol::well_known::{ACTION_CHANGE_REFERENCE, PARAM_ATTRIBUTE_ID};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use super::PersistentObjectAttribute;
use crate::error::{Result, ServiceError};
use crate::query::{Query, QueryResultItem};

impl PersistentObjectAttribute {
    pub fn is_reference(&self) -> bool {
        self.lookup.is_some()
    }

    /// Query listing the objects this attribute can point to
    pub fn lookup(&self) -> Option<&Arc<Query>> {
        self.lookup.as_ref()
    }

    pub fn reference_object_id(&self) -> Option<String> {
        self.state().fields.object_id.clone()
    }

    pub fn display_attribute(&self) -> Option<String> {
        self.state().display_attribute.clone()
    }

    pub fn can_add_new_reference(&self) -> bool {
        self.state().can_add_new_reference
    }

    pub fn select_in_place(&self) -> bool {
        self.state().select_in_place
    }

    /// Point the reference at `selected` (empty clears it). The server
    /// answers with the updated object, which replaces the local state.
    pub async fn change_reference(&self, selected: &[Arc<QueryResultItem>]) -> Result<bool> {
        let Some(lookup) = self.lookup.clone() else {
            return Ok(false);
        };
        let Some(parent) = self.parent() else {
            return Err(ServiceError::OwnerDropped(self.name.clone()));
        };
        if !parent.is_editing() || parent.is_frozen() || self.is_read_only() {
            debug!(attribute = %self.name, "Ignoring reference change outside of an edit");
            return Ok(false);
        }

        let selected_items = selected.iter().map(|item| item.to_service_item()).collect();
        let parameters = BTreeMap::from([(PARAM_ATTRIBUTE_ID.to_string(), self.id.clone())]);
        let outcome = parent
            .queue()
            .run(async {
                let _frozen = parent.freeze_guard();
                let result = parent
                    .service()
                    .execute_action(
                        ACTION_CHANGE_REFERENCE,
                        Some(parent.to_service_object()),
                        Some(lookup.to_service_query()),
                        selected_items,
                        parameters,
                    )
                    .await?;
                if let Some(result) = &result {
                    parent.refresh_from_result(result, true);
                }
                Ok::<_, ServiceError>(result.is_some())
            })
            .await;

        match outcome {
            Ok(changed) => {
                info!(attribute = %self.name, object_id = ?self.reference_object_id(), "Reference changed");
                parent.update_dirty();
                Ok(changed)
            }
            Err(error) => {
                parent.report_error(&error);
                Ok(false)
            }
        }
    }

    /// Ask the host's reference picker for a new target and apply it
    pub async fn select_reference(&self) -> Result<bool> {
        let Some(lookup) = self.lookup.clone() else {
            return Ok(false);
        };
        let Some(parent) = self.parent() else {
            return Err(ServiceError::OwnerDropped(self.name.clone()));
        };
        if !lookup.has_searched() {
            lookup.search().await?;
        }

        let picked = parent
            .service()
            .hooks()
            .reference_picker
            .select_references(lookup)
            .await;
        if picked.is_empty() {
            debug!(attribute = %self.name, "Reference selection cancelled");
            return Ok(false);
        }
        self.change_reference(&picked).await
    }
}
