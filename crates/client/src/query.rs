use async_stream::try_stream;
use eyeball::{SharedObservable, Subscriber};
use futures::future::try_join_all;
use futures::{Stream, TryStreamExt};
use objsync_wire_protocol::{PersistentObjectDto, QueryDto, QueryResultDto, QueryResultItemDto};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::{debug, error, trace, warn};

use crate::action::{Action, ActionOwner};
use crate::error::{Result, ServiceError};
use crate::notification::Notification;
use crate::persistent_object::PersistentObject;
use crate::service::Service;
use crate::work_queue::WorkQueue;

mod column;
mod grouping;
mod item;
mod selection;

pub use column::{QueryColumn, SortDirection, SortOption};
pub use grouping::{QueryGroup, QueryRow};
pub use item::QueryResultItem;
pub use selection::SelectAll;

use selection::Selection;

#[derive(Debug, Clone, Copy, Default)]
pub struct SearchOptions {
    /// Keep explicitly selected rows that are still present afterwards
    pub keep_selection: bool,
}

#[derive(Debug)]
struct QueryState {
    label: String,
    columns: Vec<QueryColumn>,
    allow_text_search: bool,
    auto_query: bool,
    can_read: bool,
    is_system: bool,
    max_selected_items: Option<u32>,
    page_size: usize,
    skip: Option<u64>,
    top: Option<u64>,
    sort_options: Vec<SortOption>,
    text_search: String,
    group_by: Option<String>,
    groups: Vec<QueryGroup>,
    continuation: Option<String>,
    has_more: bool,
    has_searched: bool,
    /// Bumped by every search; page responses of an older generation are dropped
    generation: u64,
    items: BTreeMap<usize, Arc<QueryResultItem>>,
    loaded_pages: BTreeSet<usize>,
    page_locks: HashMap<usize, Arc<tokio::sync::Mutex<()>>>,
    selection: Selection,
}

/// A paged, searchable and selectable list of [`QueryResultItem`]s.
///
/// Rows are loaded lazily: [`Query::item`] only returns rows that were
/// fetched already, [`Query::get_items`] and [`Query::stream`] fetch the
/// missing pages. A page is never requested twice at the same time, while
/// different pages may load concurrently. When the server does not report a
/// total the query pages with continuation tokens, one page after the other.
pub struct Query {
    this: Weak<Query>,
    service: Service,
    id: String,
    name: String,
    parent: Option<Weak<PersistentObject>>,
    persistent_object: Option<Box<PersistentObjectDto>>,
    actions: Vec<Arc<Action>>,
    state: Mutex<QueryState>,
    queue: WorkQueue,
    total_items: SharedObservable<Option<u64>>,
    selected_count: SharedObservable<usize>,
    notification: SharedObservable<Option<Notification>>,
}

impl std::fmt::Debug for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("total_items", &self.total_items.get())
            .field("selected_count", &self.selected_count.get())
            .finish_non_exhaustive()
    }
}

impl Query {
    pub(crate) fn from_dto(
        service: Service,
        dto: QueryDto,
        parent: Option<Weak<PersistentObject>>,
    ) -> Arc<Self> {
        let QueryDto {
            id,
            name,
            label,
            persistent_object,
            columns,
            actions,
            allow_text_search,
            auto_query,
            can_read,
            is_system,
            page_size,
            skip,
            top,
            sort_options,
            text_search,
            group_by,
            continuation,
            max_selected_items,
            result,
            ..
        } = dto;
        let page_size = page_size
            .or_else(|| service.application().and_then(|app| app.default_page_size))
            .unwrap_or(service.config().default_page_size) as usize;

        let query = Arc::new_cyclic(|this: &Weak<Query>| Query {
            this: this.clone(),
            actions: actions
                .iter()
                .filter_map(|name| Action::get(&service, name, ActionOwner::Query(this.clone())))
                .collect(),
            service: service.clone(),
            id,
            name,
            parent,
            persistent_object,
            state: Mutex::new(QueryState {
                label,
                columns: columns.into_iter().map(QueryColumn::from).collect(),
                allow_text_search,
                auto_query,
                can_read,
                is_system,
                max_selected_items,
                page_size,
                skip,
                top,
                sort_options: SortOption::parse_list(&sort_options),
                text_search,
                group_by,
                groups: Vec::new(),
                continuation,
                has_more: false,
                has_searched: false,
                generation: 0,
                items: BTreeMap::new(),
                loaded_pages: BTreeSet::new(),
                page_locks: HashMap::new(),
                selection: Selection::default(),
            }),
            queue: WorkQueue::new(),
            total_items: SharedObservable::new(None),
            selected_count: SharedObservable::new(0),
            notification: SharedObservable::new(None),
        });

        if let Some(result) = result {
            query.apply_search_result(result, false);
        }
        trace!(query = %query.name, "Query created");
        query
    }

    fn state(&self) -> MutexGuard<'_, QueryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn service(&self) -> &Service {
        &self.service
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> String {
        self.state().label.clone()
    }

    /// The object this query is a detail of, if any
    pub fn parent(&self) -> Option<Arc<PersistentObject>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    /// Type of the objects behind the rows
    pub fn persistent_object_type_id(&self) -> Option<String> {
        self.persistent_object.as_ref().map(|template| template.id.clone())
    }

    pub fn columns(&self) -> Vec<QueryColumn> {
        self.state().columns.clone()
    }

    pub fn column(&self, name: &str) -> Option<QueryColumn> {
        self.state()
            .columns
            .iter()
            .find(|column| column.name == name)
            .cloned()
    }

    pub fn actions(&self) -> &[Arc<Action>] {
        &self.actions
    }

    pub fn action(&self, name: &str) -> Option<&Arc<Action>> {
        self.actions.iter().find(|action| action.name() == name)
    }

    pub fn queue(&self) -> &WorkQueue {
        &self.queue
    }

    pub fn is_busy(&self) -> bool {
        self.queue.is_busy()
    }

    pub fn allow_text_search(&self) -> bool {
        self.state().allow_text_search
    }

    pub fn auto_query(&self) -> bool {
        self.state().auto_query
    }

    pub fn can_read(&self) -> bool {
        self.state().can_read
    }

    pub fn is_system(&self) -> bool {
        self.state().is_system
    }

    pub fn has_searched(&self) -> bool {
        self.state().has_searched
    }

    pub fn page_size(&self) -> usize {
        self.state().page_size
    }

    /// `None` while the server only reports whether more rows follow
    pub fn total_items(&self) -> Option<u64> {
        self.total_items.get()
    }

    pub fn subscribe_total_items(&self) -> Subscriber<Option<u64>> {
        self.total_items.subscribe()
    }

    pub fn has_more(&self) -> bool {
        self.state().has_more
    }

    pub fn continuation(&self) -> Option<String> {
        self.state().continuation.clone()
    }

    pub fn sort_options(&self) -> Vec<SortOption> {
        self.state().sort_options.clone()
    }

    /// Takes effect with the next search
    pub fn set_sort_options(&self, options: Vec<SortOption>) {
        self.state().sort_options = options;
    }

    pub fn text_search(&self) -> String {
        self.state().text_search.clone()
    }

    /// Takes effect with the next search
    pub fn set_text_search(&self, text: impl Into<String>) {
        self.state().text_search = text.into();
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
        error!(query = %self.name, %error, "Request failed");
        self.set_notification(Some(Notification::error(error.notification_message())));
    }

    // Searching

    pub async fn search(&self) -> Result<()> {
        let keep_selection = self.service.config().keep_selection_on_search;
        self.search_with(SearchOptions { keep_selection }).await
    }

    /// Replace the rows with the first page of a fresh result. Pages still
    /// loading for the previous result are discarded when they arrive.
    pub async fn search_with(&self, options: SearchOptions) -> Result<()> {
        self.queue
            .run(async {
                let request = self.request(None, None);
                let parent = self.parent().map(|parent| parent.to_service_object());
                debug!(query = %self.name, text_search = %request.text_search, "Searching");
                match self.service.execute_query(parent, request).await {
                    Ok(result) => {
                        self.apply_search_result(result, options.keep_selection);
                        Ok(())
                    }
                    Err(error) => {
                        self.report_error(&error);
                        Err(error)
                    }
                }
            })
            .await
    }

    /// Group by `column`, or remove the grouping, and search again
    pub async fn group_by(&self, column: Option<&str>) -> Result<()> {
        self.state().group_by = column.map(str::to_string);
        self.search_with(SearchOptions {
            keep_selection: true,
        })
        .await
    }

    pub fn grouped_by(&self) -> Option<String> {
        self.state().group_by.clone()
    }

    pub fn groups(&self) -> Vec<QueryGroup> {
        self.state().groups.clone()
    }

    /// Returns whether the group is collapsed afterwards
    pub fn toggle_group_collapsed(&self, name: &str) -> bool {
        let mut state = self.state();
        match state.groups.iter_mut().find(|group| group.name == name) {
            Some(group) => {
                group.is_collapsed = !group.is_collapsed;
                group.is_collapsed
            }
            None => false,
        }
    }

    /// Loaded rows with group headers in between
    pub fn rows(&self) -> Vec<QueryRow> {
        let state = self.state();
        grouping::build_rows(&state.groups, &state.items)
    }

    fn apply_search_result(&self, result: QueryResultDto, keep_selection: bool) {
        let QueryResultDto {
            items,
            columns,
            total_items,
            page_size,
            continuation,
            sort_options,
            grouping_info,
            notification,
            notification_type,
            notification_duration,
        } = result;

        let selected_count = {
            let mut state = self.state();
            let previous: HashMap<String, Arc<QueryResultItem>> = state
                .items
                .values()
                .map(|item| (item.id().to_string(), item.clone()))
                .collect();

            state.generation += 1;
            state.items.clear();
            state.loaded_pages.clear();
            state.page_locks.clear();
            if !columns.is_empty() {
                state.columns = columns.into_iter().map(QueryColumn::from).collect();
            }
            if let Some(page_size) = page_size {
                state.page_size = page_size as usize;
            }
            if !sort_options.is_empty() {
                state.sort_options = SortOption::parse_list(&sort_options);
            }
            state.groups = match &grouping_info {
                Some(info) => grouping::build_groups(info, &state.groups),
                None => Vec::new(),
            };
            if let Some(info) = grouping_info {
                state.group_by = Some(info.group_by);
            }

            let loaded = items.len();
            for (index, dto) in items.into_iter().enumerate() {
                let item = match previous.get(&dto.id) {
                    Some(known) => {
                        known.refresh_values(dto);
                        known.clone()
                    }
                    None => self.new_item(dto),
                };
                state.items.insert(index, item);
            }
            state.loaded_pages.insert(0);
            state.has_more = match total_items {
                Some(total) => (loaded as u64) < total,
                None => continuation.is_some(),
            };
            state.continuation = continuation;
            state.has_searched = true;

            let QueryState {
                selection, items, ..
            } = &mut *state;
            selection.set_available(total_items.is_some());
            selection.reconcile(items.values(), keep_selection);
            for item in items.values() {
                item.mark_selected(selection.is_selected(item.id()));
            }
            selection.count(total_items, items.len())
        };

        self.total_items.set(total_items);
        self.set_notification(Notification::from_wire(
            notification.as_deref(),
            notification_type,
            notification_duration,
        ));
        self.update_selected_count(selected_count);
        debug!(query = %self.name, ?total_items, "Search result applied");
    }

    fn new_item(&self, dto: QueryResultItemDto) -> Arc<QueryResultItem> {
        QueryResultItem::new(dto, self.this.clone())
    }

    // Items

    /// An already loaded row
    pub fn item(&self, index: usize) -> Option<Arc<QueryResultItem>> {
        self.state().items.get(&index).cloned()
    }

    /// Number of rows loaded so far
    pub fn loaded_count(&self) -> usize {
        self.state().items.len()
    }

    /// Rows `start..start + len`, fetching missing pages first. Rows past the
    /// end of the result are left out.
    pub async fn get_items(&self, start: usize, len: usize) -> Result<Vec<Arc<QueryResultItem>>> {
        if !self.has_searched() {
            self.search().await?;
        }

        let end = match self.total_items() {
            Some(total) => (start + len).min(total as usize),
            None => start + len,
        };
        if start >= end {
            return Ok(Vec::new());
        }

        if self.total_items().is_some() {
            let page_size = self.page_size().max(1);
            let missing: Vec<usize> = {
                let state = self.state();
                (start / page_size..=(end - 1) / page_size)
                    .filter(|page| !state.loaded_pages.contains(page))
                    .collect()
            };
            if !missing.is_empty() {
                trace!(query = %self.name, ?missing, "Fetching pages");
                try_join_all(missing.into_iter().map(|page| self.fetch_page(page))).await?;
            }
        } else {
            while self.loaded_count() < end && self.has_more() {
                if !self.fetch_next_page().await? {
                    break;
                }
            }
        }

        let state = self.state();
        Ok(state.items.range(start..end).map(|(_, item)| item.clone()).collect())
    }

    fn page_lock(&self, page: usize) -> Option<(u64, Arc<tokio::sync::Mutex<()>>)> {
        let mut state = self.state();
        if state.loaded_pages.contains(&page) {
            return None;
        }
        let generation = state.generation;
        Some((generation, state.page_locks.entry(page).or_default().clone()))
    }

    /// Load page `page` unless it is loaded or loading already
    async fn fetch_page(&self, page: usize) -> Result<()> {
        let Some((generation, lock)) = self.page_lock(page) else {
            return Ok(());
        };
        let _page = lock.lock().await;
        let page_size = {
            let state = self.state();
            if state.generation != generation || state.loaded_pages.contains(&page) {
                return Ok(());
            }
            state.page_size
        };

        let skip = (page * page_size) as u64;
        let request = self.request(Some(skip), None);
        let parent = self.parent().map(|parent| parent.to_service_object());
        let result = self.service.execute_query(parent, request).await?;
        self.insert_page(generation, page, skip as usize, result);
        Ok(())
    }

    /// Load the page following the loaded rows using the continuation token.
    /// Returns whether rows were added.
    async fn fetch_next_page(&self) -> Result<bool> {
        let (generation, page, lock) = {
            let mut state = self.state();
            let page = state.items.len() / state.page_size.max(1);
            let generation = state.generation;
            (generation, page, state.page_locks.entry(page).or_default().clone())
        };
        let _page = lock.lock().await;
        let (skip, continuation) = {
            let state = self.state();
            if state.generation != generation || state.loaded_pages.contains(&page) {
                return Ok(state.loaded_pages.contains(&page));
            }
            (state.items.len(), state.continuation.clone())
        };

        let request = self.request(Some(skip as u64), continuation);
        let parent = self.parent().map(|parent| parent.to_service_object());
        let result = self.service.execute_query(parent, request).await?;
        Ok(self.insert_page(generation, page, skip, result))
    }

    fn insert_page(
        &self,
        generation: u64,
        page: usize,
        offset: usize,
        result: QueryResultDto,
    ) -> bool {
        let mut state = self.state();
        if state.generation != generation {
            debug!(query = %self.name, page, "Discarding page of an outdated search");
            return false;
        }
        let added = !result.items.is_empty();
        for (index, dto) in result.items.into_iter().enumerate() {
            let item = self.new_item(dto);
            item.mark_selected(state.selection.is_selected(item.id()));
            state.items.insert(offset + index, item);
        }
        state.loaded_pages.insert(page);
        match result.total_items {
            Some(total) => state.has_more = (state.items.len() as u64) < total,
            None => {
                state.has_more = result.continuation.is_some();
                state.continuation = result.continuation;
            }
        }
        trace!(query = %self.name, page, loaded = state.items.len(), "Page loaded");
        added
    }

    /// Every row, fetched page by page as the stream is polled. Each call
    /// starts from the first row again.
    pub fn stream(
        self: &Arc<Self>,
    ) -> impl Stream<Item = Result<Arc<QueryResultItem>>> + Send + 'static {
        let query = self.clone();
        try_stream! {
            let mut index = 0;
            loop {
                let batch = query.get_items(index, query.page_size().max(1)).await?;
                if batch.is_empty() {
                    break;
                }
                index += batch.len();
                for item in batch {
                    yield item;
                }
            }
        }
    }

    pub async fn find<F>(
        self: &Arc<Self>,
        mut predicate: F,
    ) -> Result<Option<Arc<QueryResultItem>>>
    where
        F: FnMut(&QueryResultItem) -> bool,
    {
        let stream = self.stream();
        futures::pin_mut!(stream);
        while let Some(item) = stream.try_next().await? {
            if predicate(&item) {
                return Ok(Some(item));
            }
        }
        Ok(None)
    }

    pub async fn filter<F>(
        self: &Arc<Self>,
        mut predicate: F,
    ) -> Result<Vec<Arc<QueryResultItem>>>
    where
        F: FnMut(&QueryResultItem) -> bool,
    {
        self.stream()
            .try_filter(|item| futures::future::ready(predicate(item)))
            .try_collect()
            .await
    }

    /// Rows `start..end`
    pub async fn slice(&self, start: usize, end: usize) -> Result<Vec<Arc<QueryResultItem>>> {
        self.get_items(start, end.saturating_sub(start)).await
    }

    /// Every row of the result
    pub async fn to_vec(self: &Arc<Self>) -> Result<Vec<Arc<QueryResultItem>>> {
        self.stream().try_collect().await
    }

    // Selection

    pub fn select_all(&self) -> SelectAll {
        self.state().selection.select_all()
    }

    pub fn select_item(&self, item: &Arc<QueryResultItem>) {
        self.set_item_selected(item, true);
    }

    pub fn deselect_item(&self, item: &Arc<QueryResultItem>) {
        self.set_item_selected(item, false);
    }

    fn set_item_selected(&self, item: &Arc<QueryResultItem>, selected: bool) {
        let count = {
            let mut state = self.state();
            if selected {
                if let Some(max) = state.max_selected_items {
                    let current = state.selection.count(self.total_items.get(), state.items.len());
                    if !item.is_selected() && current >= max as usize {
                        warn!(query = %self.name, max, "Selection limit reached");
                        return;
                    }
                }
            }
            if !state.selection.set_selected(item, selected) {
                return;
            }
            state.selection.count(self.total_items.get(), state.items.len())
        };
        item.mark_selected(selected);
        self.update_selected_count(count);
    }

    /// Select every row, or clear the selection when everything is selected
    pub fn toggle_select_all(&self) {
        let count = {
            let mut state = self.state();
            if !state.selection.select_all().is_available {
                debug!(query = %self.name, "Select all is not available");
                return;
            }
            state.selection.toggle_all();
            let QueryState {
                selection, items, ..
            } = &mut *state;
            for item in items.values() {
                item.mark_selected(selection.is_selected(item.id()));
            }
            selection.count(self.total_items.get(), items.len())
        };
        self.update_selected_count(count);
    }

    pub fn clear_selection(&self) {
        let items: Vec<_> = {
            let mut state = self.state();
            state.selection.clear();
            state.items.values().cloned().collect()
        };
        for item in items {
            item.mark_selected(false);
        }
        self.update_selected_count(0);
    }

    pub fn selected_count(&self) -> usize {
        self.selected_count.get()
    }

    pub fn subscribe_selected_count(&self) -> Subscriber<usize> {
        self.selected_count.subscribe()
    }

    /// Loaded rows that are selected
    pub fn selected_items(&self) -> Vec<Arc<QueryResultItem>> {
        self.state()
            .items
            .values()
            .filter(|item| item.is_selected())
            .cloned()
            .collect()
    }

    /// Rows to send along with an action: the selected rows, or while
    /// everything is selected the rows excluded from it
    pub(crate) fn selected_items_for_request(&self) -> Vec<QueryResultItemDto> {
        self.state()
            .selection
            .exceptions()
            .map(|item| item.to_service_item())
            .collect()
    }

    fn update_selected_count(&self, count: usize) {
        self.selected_count.set_if_not_eq(count);
        for action in &self.actions {
            action.set_selection_count(count);
        }
    }

    /// The wire form of the query's current settings, without rows
    pub fn to_service_query(&self) -> QueryDto {
        self.request(None, None)
    }

    fn request(&self, skip: Option<u64>, continuation: Option<String>) -> QueryDto {
        let state = self.state();
        let select_all = state.selection.select_all();
        QueryDto {
            id: self.id.clone(),
            name: self.name.clone(),
            label: state.label.clone(),
            persistent_object: self.persistent_object.clone(),
            columns: state.columns.iter().map(QueryColumn::to_dto).collect(),
            actions: self
                .actions
                .iter()
                .map(|action| action.name().to_string())
                .collect(),
            allow_text_search: state.allow_text_search,
            auto_query: state.auto_query,
            can_read: state.can_read,
            is_system: state.is_system,
            page_size: Some(state.page_size as u32),
            skip: skip.or(state.skip),
            top: state.top.or(Some(state.page_size as u64)),
            sort_options: SortOption::format_list(&state.sort_options),
            text_search: state.text_search.clone(),
            group_by: state.group_by.clone(),
            continuation,
            all_selected: select_all.all_selected,
            all_selected_inversed: select_all.inverse,
            max_selected_items: state.max_selected_items,
            result: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::signed_in_service;
    use crate::transport::MockTransport;
    use objsync_wire_protocol::{QueryResultItemDto, RpcMethod};
    use serde_json::json;

    fn people(service: Service, max_selected_items: Option<u32>) -> Arc<Query> {
        let items = (0..3)
            .map(|index| QueryResultItemDto {
                id: index.to_string(),
                ..Default::default()
            })
            .collect();
        Query::from_dto(
            service,
            QueryDto {
                id: "People".to_string(),
                name: "People".to_string(),
                max_selected_items,
                result: Some(QueryResultDto {
                    items,
                    total_items: Some(3),
                    ..Default::default()
                }),
                ..Default::default()
            },
            None,
        )
    }

    #[tokio::test]
    async fn test_embedded_result_counts_as_searched() {
        let service = signed_in_service(MockTransport::new()).await;
        let query = people(service.clone(), None);
        assert!(query.has_searched());
        assert_eq!(query.total_items(), Some(3));
        assert_eq!(query.page_size(), service.config().default_page_size as usize);
        assert_eq!(query.item(2).unwrap().query().unwrap().id(), "People");
    }

    #[tokio::test]
    async fn test_selection_limit() {
        let service = signed_in_service(MockTransport::new()).await;
        let query = people(service, Some(2));
        let items: Vec<_> = (0..3).filter_map(|index| query.item(index)).collect();

        for item in &items {
            query.select_item(item);
        }
        assert_eq!(query.selected_count(), 2);
        assert!(!items[2].is_selected());

        items[0].set_selected(false);
        items[2].set_selected(true);
        assert_eq!(query.selected_count(), 2);
        assert_eq!(
            query
                .selected_items()
                .iter()
                .map(|item| item.id().to_string())
                .collect::<Vec<_>>(),
            vec!["1".to_string(), "2".to_string()]
        );
    }

    #[tokio::test]
    async fn test_failed_search_sets_notification() {
        let mut transport = MockTransport::new();
        transport
            .expect_post()
            .withf(|method, _| *method == RpcMethod::ExecuteQuery)
            .times(1)
            .returning(|_, _| Ok(json!({ "exception": "Query timed out" })));
        let service = signed_in_service(transport).await;
        let query = people(service, None);

        assert!(matches!(query.search().await, Err(ServiceError::Server(_))));
        assert_eq!(
            query.notification().map(|n| n.message).as_deref(),
            Some("Query timed out")
        );
        assert_eq!(query.loaded_count(), 3, "rows of the last result stay");
    }

    #[tokio::test]
    async fn test_search_sends_sort_and_text() {
        let mut transport = MockTransport::new();
        transport
            .expect_post()
            .withf(|method, body| {
                *method == RpcMethod::ExecuteQuery
                    && body["query"]["textSearch"] == "ada"
                    && body["query"]["sortOptions"] == "Name DESC"
                    && body["query"].get("skip").is_none()
            })
            .times(1)
            .returning(|_, _| Ok(json!({ "result": { "items": [], "totalItems": 0 } })));
        let service = signed_in_service(transport).await;
        let query = people(service, None);
        query.select_item(&query.item(0).unwrap());

        query.set_text_search("ada");
        query.set_sort_options(vec![SortOption::new("Name", SortDirection::Descending)]);
        query.search().await.unwrap();

        assert_eq!(query.total_items(), Some(0));
        assert_eq!(query.loaded_count(), 0);
        assert_eq!(query.selected_count(), 0);
        assert!(!query.has_more());
    }
}
