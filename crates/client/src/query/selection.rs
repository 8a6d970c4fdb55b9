use std::collections::BTreeMap;
use std::sync::Arc;

use super::QueryResultItem;

/// Select-all state of a query. `inverse` means everything is selected except
/// the rows deselected afterwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectAll {
    /// Only queries with a known total can select all
    pub is_available: bool,
    pub all_selected: bool,
    pub inverse: bool,
}

/// Rows whose selection differs from the baseline: the selected rows
/// normally, the deselected rows while everything is selected.
#[derive(Debug, Default)]
pub(super) struct Selection {
    select_all: SelectAll,
    exceptions: BTreeMap<String, Arc<QueryResultItem>>,
}

impl Selection {
    pub(super) fn select_all(&self) -> SelectAll {
        self.select_all
    }

    pub(super) fn set_available(&mut self, available: bool) {
        self.select_all.is_available = available;
        if !available && self.select_all.all_selected {
            self.select_all.all_selected = false;
            self.select_all.inverse = false;
            self.exceptions.clear();
        }
    }

    pub(super) fn is_selected(&self, id: &str) -> bool {
        self.select_all.all_selected != self.exceptions.contains_key(id)
    }

    /// Returns whether anything changed
    pub(super) fn set_selected(&mut self, item: &Arc<QueryResultItem>, selected: bool) -> bool {
        let is_exception = selected != self.select_all.all_selected;
        let changed = if is_exception {
            self.exceptions
                .insert(item.id().to_string(), item.clone())
                .is_none()
        } else {
            self.exceptions.remove(item.id()).is_some()
        };
        if self.select_all.all_selected {
            self.select_all.inverse = !self.exceptions.is_empty();
        }
        changed
    }

    /// Select everything, or clear a full selection. Returns whether
    /// everything is selected afterwards.
    pub(super) fn toggle_all(&mut self) -> bool {
        if !self.select_all.is_available {
            return false;
        }
        let select = !self.select_all.all_selected || self.select_all.inverse;
        self.select_all.all_selected = select;
        self.select_all.inverse = false;
        self.exceptions.clear();
        select
    }

    pub(super) fn clear(&mut self) {
        self.select_all.all_selected = false;
        self.select_all.inverse = false;
        self.exceptions.clear();
    }

    /// Number of selected rows; `loaded` stands in for an unknown total
    pub(super) fn count(&self, total_items: Option<u64>, loaded: usize) -> usize {
        if self.select_all.all_selected {
            let total = total_items.map_or(loaded, |total| total as usize);
            total.saturating_sub(self.exceptions.len())
        } else {
            self.exceptions.len()
        }
    }

    pub(super) fn exceptions(&self) -> impl Iterator<Item = &Arc<QueryResultItem>> {
        self.exceptions.values()
    }

    /// Carry the selection over a new search result. A plain full selection
    /// stays full; explicit rows survive only if they are still present.
    pub(super) fn reconcile<'a>(
        &mut self,
        current: impl IntoIterator<Item = &'a Arc<QueryResultItem>>,
        keep_selection: bool,
    ) {
        if !self.select_all.all_selected && !keep_selection {
            self.exceptions.clear();
            return;
        }
        let mut kept = BTreeMap::new();
        for item in current {
            if self.exceptions.contains_key(item.id()) {
                kept.insert(item.id().to_string(), item.clone());
            }
        }
        self.exceptions = kept;
        if self.select_all.all_selected {
            self.select_all.inverse = !self.exceptions.is_empty();
        }
    }
}
