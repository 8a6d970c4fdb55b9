use eyeball::{SharedObservable, Subscriber};
use objsync_wire_protocol::{QueryResultItemDto, QueryResultItemValueDto};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::warn;

use super::Query;
use crate::data_type::{DataKind, DataType, Value};
use crate::error::{Result, ServiceError};
use crate::persistent_object::PersistentObject;
use crate::type_hints::TypeHints;

#[derive(Debug)]
struct ItemState {
    breadcrumb: Option<String>,
    values: Vec<QueryResultItemValueDto>,
    type_hints: TypeHints,
    /// Parsed values keyed by column, with the raw value they came from
    cache: HashMap<String, (Option<String>, Value)>,
}

/// One row of a [`Query`]
#[derive(Debug)]
pub struct QueryResultItem {
    id: String,
    query: Weak<Query>,
    state: Mutex<ItemState>,
    is_selected: SharedObservable<bool>,
}

impl QueryResultItem {
    pub(crate) fn new(dto: QueryResultItemDto, query: Weak<Query>) -> Arc<Self> {
        Arc::new(Self {
            id: dto.id,
            query,
            state: Mutex::new(ItemState {
                breadcrumb: dto.breadcrumb,
                values: dto.values,
                type_hints: TypeHints::from_map(&dto.type_hints),
                cache: HashMap::new(),
            }),
            is_selected: SharedObservable::new(false),
        })
    }

    fn state(&self) -> MutexGuard<'_, ItemState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn query(&self) -> Option<Arc<Query>> {
        self.query.upgrade()
    }

    pub fn breadcrumb(&self) -> Option<String> {
        self.state().breadcrumb.clone()
    }

    pub fn type_hints(&self) -> TypeHints {
        self.state().type_hints.clone()
    }

    /// The wire string of column `key`
    pub fn raw_value(&self, key: &str) -> Option<String> {
        self.state()
            .values
            .iter()
            .find(|value| value.key == key)
            .and_then(|value| value.value.clone())
    }

    /// Object id of a reference column
    pub fn reference_object_id(&self, key: &str) -> Option<String> {
        self.state()
            .values
            .iter()
            .find(|value| value.key == key)
            .and_then(|value| value.object_id.clone())
    }

    fn column_type(&self, key: &str) -> (DataType, TypeHints) {
        match self.query().and_then(|query| query.column(key)) {
            Some(column) => (column.data_type, column.type_hints),
            None => (DataType::new(DataKind::String, true), TypeHints::default()),
        }
    }

    /// Typed value of column `key`, parsed once per raw value
    pub fn value(&self, key: &str) -> Value {
        let (data_type, _) = self.column_type(key);
        let mut state = self.state();
        let raw = state
            .values
            .iter()
            .find(|value| value.key == key)
            .and_then(|value| value.value.clone());
        if let Some((source, value)) = state.cache.get(key) {
            if *source == raw {
                return value.clone();
            }
        }

        let value = data_type
            .from_service_string(raw.as_deref(), false)
            .unwrap_or_else(|error| {
                warn!(item = %self.id, column = key, %error, "Unparsable query value");
                Value::Null
            });
        state.cache.insert(key.to_string(), (raw, value.clone()));
        value
    }

    /// Column `key` formatted with the column's hints, overridden by the row's
    pub fn display_value(&self, key: &str) -> String {
        let (data_type, column_hints) = self.column_type(key);
        let value = self.value(key);
        let hints = column_hints.merged_with(&self.type_hints());
        match self.query() {
            Some(query) => query
                .service()
                .hooks()
                .formatter
                .display_value(&value, data_type, &hints),
            None => value.to_string(),
        }
    }

    pub fn is_selected(&self) -> bool {
        self.is_selected.get()
    }

    pub fn subscribe_selected(&self) -> Subscriber<bool> {
        self.is_selected.subscribe()
    }

    /// Select or deselect through the owning query, keeping its selection
    /// bookkeeping and action state current
    pub fn set_selected(self: &Arc<Self>, selected: bool) {
        match self.query() {
            Some(query) if selected => query.select_item(self),
            Some(query) => query.deselect_item(self),
            None => self.mark_selected(selected),
        }
    }

    pub(super) fn mark_selected(&self, selected: bool) {
        self.is_selected.set_if_not_eq(selected);
    }

    /// Replace the row's values with a fresher copy of the same row
    pub fn refresh_values(&self, dto: QueryResultItemDto) {
        let mut state = self.state();
        state.breadcrumb = dto.breadcrumb;
        state.values = dto.values;
        state.type_hints = TypeHints::from_map(&dto.type_hints);
        state.cache.clear();
    }

    /// Load the full object behind this row. The object remembers the query
    /// so saving it refreshes the list.
    pub async fn get_persistent_object(&self) -> Result<Arc<PersistentObject>> {
        let query = self
            .query()
            .ok_or_else(|| ServiceError::OwnerDropped(self.id.clone()))?;
        let type_id = query
            .persistent_object_type_id()
            .ok_or(ServiceError::MissingResult("the row's object type"))?;
        let parent = query.parent();
        let object = query
            .service()
            .get_persistent_object(parent.as_ref(), &type_id, Some(&self.id), false)
            .await?;
        object.set_owner_query(&query);
        Ok(object)
    }

    pub fn to_service_item(&self) -> QueryResultItemDto {
        let state = self.state();
        QueryResultItemDto {
            id: self.id.clone(),
            breadcrumb: state.breadcrumb.clone(),
            values: state.values.clone(),
            type_hints: state.type_hints.to_map(),
        }
    }
}
