//! The grid controller.
//!
//! Owns the shared state (source collection, displayed rows, active item, selection) and
//! composes the identifier mapper, flat store, filter/sort engine, tree registry and window
//! tracker. Every remote operation is bounded by a timeout and settled at the operation
//! boundary: invalid operations are logged and rejected, stale subscriptions queue a
//! resubscribe, anything else becomes a `Notice` for the rendering surface.

use crate::config::{GridConfig, LazyLoadConfig};
use crate::debounce::Debouncer;
use crate::error::{GridError, Notice, RemoteError};
use crate::filter::{ResultsCount, filter_items};
use crate::identity::{IdKind, ids_equal};
use crate::item::{Item, Record, RowBackground};
use crate::sort::{SortDirection, SortSet, Sorter};
use crate::source::{Detached, LazyLoadSource, Page, PageRequest, with_timeout};
use crate::store::FlatStore;
use crate::tree::{
    ExpandedNode, ExpansionRegistry, NodeState, tree_column_width, validate_tree_records,
};
use crate::window::{ScrollDirection, ScrollSample, ScrollTracker, WindowState};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info, warn};

const DEFAULT_SCROLL_DEBOUNCE: Duration = Duration::from_millis(250);

/// What the rendering surface is told.
#[derive(Debug, Clone, PartialEq)]
pub enum GridEvent {
    DisplayedItemsChanged,
    ActiveItemChanged(Option<String>),
    ActiveItemUpdated,
    SelectionChanged,
    LoadingChanged(bool),
    Notice(Notice),
    ScrollToItem(usize),
    RemovalPending(Vec<String>),
}

/// Work the controller schedules for itself.
///
/// A scroll fetch carries the page generation current when it was scheduled; it is dropped
/// if any page was rendered since.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridTask {
    Fetch {
        direction: ScrollDirection,
        generation: u64,
    },
    Resubscribe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectAllState {
    Unchecked,
    Indeterminate,
    Checked,
}

/// Last-request-wins guard: every page request bumps the generation.
#[derive(Debug, Default)]
struct RequestSequencer {
    latest: u64,
}

impl RequestSequencer {
    fn issue(&mut self) -> u64 {
        self.latest += 1;
        self.latest
    }

    fn current(&self) -> u64 {
        self.latest
    }

    fn is_latest(&self, token: u64) -> bool {
        token == self.latest
    }
}

pub struct GridController<S> {
    pub(crate) config: GridConfig,
    source: Arc<S>,
    pub(crate) items: Vec<Item>,
    pub(crate) displayed: FlatStore,
    pub(crate) active: Option<Item>,
    pub(crate) selected: Vec<Item>,
    query: String,
    sorters: SortSet,
    results: ResultsCount,
    pub(crate) registry: ExpansionRegistry,
    transitions: HashMap<String, NodeState>,
    window: WindowState,
    scroll: ScrollTracker,
    debouncer: Debouncer,
    requests: RequestSequencer,
    loading: bool,
    pub(crate) stale: bool,
    activate_on_apply: Option<String>,
    active_hint: Option<String>,
    tree_column_width: u64,
    resubscribe_attempts: u32,
    pub(crate) pending_removal: Vec<String>,
    events: UnboundedSender<GridEvent>,
    task_tx: UnboundedSender<GridTask>,
    task_rx: UnboundedReceiver<GridTask>,
}

impl GridController<Detached> {
    /// A controller fed only through `set_items`.
    pub fn local(config: GridConfig) -> (Self, UnboundedReceiver<GridEvent>) {
        Self::new(config, Arc::new(Detached))
    }
}

impl<S: LazyLoadSource> GridController<S> {
    pub fn new(config: GridConfig, source: Arc<S>) -> (Self, UnboundedReceiver<GridEvent>) {
        let (events, event_rx) = mpsc::unbounded_channel();
        let (task_tx, task_rx) = mpsc::unbounded_channel();
        let debounce = config
            .lazy_load
            .as_ref()
            .map_or(DEFAULT_SCROLL_DEBOUNCE, LazyLoadConfig::scroll_debounce);
        let sorters = SortSet::new(config.sorters.clone());

        let controller = Self {
            config,
            source,
            items: Vec::new(),
            displayed: FlatStore::default(),
            active: None,
            selected: Vec::new(),
            query: String::new(),
            sorters,
            results: ResultsCount { shown: 0, total: 0 },
            registry: ExpansionRegistry::default(),
            transitions: HashMap::new(),
            window: WindowState::default(),
            scroll: ScrollTracker::default(),
            debouncer: Debouncer::new(debounce),
            requests: RequestSequencer::default(),
            loading: false,
            stale: false,
            activate_on_apply: None,
            active_hint: None,
            tree_column_width: tree_column_width(1),
            resubscribe_attempts: 0,
            pending_removal: Vec::new(),
            events,
            task_tx,
            task_rx,
        };
        (controller, event_rx)
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// The source collection the displayed rows are derived from.
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn displayed_items(&self) -> &[Item] {
        self.displayed.rows()
    }

    pub fn active_item(&self) -> Option<&Item> {
        self.active.as_ref()
    }

    pub fn selected_items(&self) -> &[Item] {
        &self.selected
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn results(&self) -> ResultsCount {
        self.results
    }

    pub fn results_label(&self) -> String {
        self.results.label(&self.config.labels)
    }

    pub fn sorters(&self) -> &[Sorter] {
        self.sorters.all()
    }

    pub fn active_sorters(&self) -> Vec<&Sorter> {
        self.sorters.active()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Local edits may no longer match the remote source.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn window(&self) -> &WindowState {
        &self.window
    }

    pub fn tree_column_width(&self) -> u64 {
        self.tree_column_width
    }

    pub fn expanded_nodes(&self) -> &[ExpandedNode] {
        self.registry.nodes()
    }

    pub fn pending_removal(&self) -> &[String] {
        &self.pending_removal
    }

    pub fn node_state(&self, id: &str) -> NodeState {
        match self.transitions.get(id) {
            Some(state) => *state,
            None if self.registry.contains(id) => NodeState::Expanded,
            None => NodeState::Collapsed,
        }
    }

    /// Placeholder condition: nothing to show and nothing on the way.
    pub fn has_no_items(&self) -> bool {
        !self.loading && self.displayed.is_empty()
    }

    // ---- items, filtering, sorting ------------------------------------------------------

    pub fn set_items(&mut self, records: Vec<Record>, activate: Option<&str>) {
        let items = records
            .into_iter()
            .map(|record| Item::from_record(record, &self.config.fields))
            .collect();
        self.set_item_rows(items, activate.map(str::to_string));
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
        self.apply_filter();
    }

    pub fn set_sorter(&mut self, path: &str, direction: SortDirection) {
        self.sorters.set(path, direction);
        self.apply_filter();
    }

    pub fn cycle_sorter(&mut self, path: &str) -> SortDirection {
        let direction = self.sorters.cycle(path);
        self.apply_filter();
        direction
    }

    pub fn remove_active_sorter(&mut self, path: &str) {
        if self.sorters.clear(path) {
            self.apply_filter();
        }
    }

    fn set_item_rows(&mut self, items: Vec<Item>, activate: Option<String>) {
        self.activate_on_apply = activate;
        self.items = items;
        self.apply_filter();
    }

    /// Derives the displayed rows from the source collection.
    fn apply_filter(&mut self) {
        self.active = None;
        if !self.selected.is_empty() {
            self.selected.clear();
            self.emit(GridEvent::SelectionChanged);
        }
        if !self.config.is_lazy() && !self.registry.is_empty() {
            // Locally expanded children live only in the displayed rows.
            self.registry = ExpansionRegistry::default();
        }

        let mut shown = filter_items(
            &self.items,
            &self.query,
            self.config.filter_attributes.as_deref(),
        );
        self.sorters.sort(&mut shown);
        self.results = ResultsCount {
            shown: shown.len(),
            total: self.items.len(),
        };
        self.displayed.replace_all(shown);
        self.emit(GridEvent::DisplayedItemsChanged);
        self.activate_pending();
    }

    fn activate_pending(&mut self) {
        let index = match self.activate_on_apply.take() {
            Some(id) => {
                let index = self.displayed.position_of(&id, IdKind::External);
                if let Some(index) = index {
                    self.emit(GridEvent::ScrollToItem(index));
                }
                index
            }
            None => Some(0),
        };
        let next = index.and_then(|index| self.displayed.get(index)).cloned();
        self.set_active(next);
    }

    // ---- activation and selection -------------------------------------------------------

    pub fn activate(&mut self, id: &str) -> Result<(), GridError> {
        let index = self
            .displayed
            .position_of(id, IdKind::External)
            .ok_or_else(|| GridError::UnknownItem(id.to_string()))?;
        let item = self.displayed.get(index).cloned();
        self.active_hint = Some(id.to_string());
        self.set_active(item);
        Ok(())
    }

    /// The surface lost its active row; keep the previous one while rows remain.
    pub fn deactivate(&mut self) {
        if self.displayed.is_empty() {
            self.set_active(None);
        }
    }

    pub(crate) fn set_active(&mut self, item: Option<Item>) {
        let id = item.as_ref().and_then(|item| item.external_id.clone());
        self.active = item;
        self.emit(GridEvent::ActiveItemChanged(id));
    }

    pub fn selectable_items(&self) -> Vec<&Item> {
        self.displayed
            .rows()
            .iter()
            .filter(|item| !item.selection_disabled)
            .collect()
    }

    pub fn select_all_state(&self) -> SelectAllState {
        let selectable = self.selectable_items().len();
        match self.selected.len() {
            0 => SelectAllState::Unchecked,
            n if n == selectable => SelectAllState::Checked,
            _ => SelectAllState::Indeterminate,
        }
    }

    /// Returns whether the row is selected afterwards.
    pub fn toggle_selected(&mut self, id: &str) -> Result<bool, GridError> {
        let item = self
            .displayed
            .position_of(id, IdKind::External)
            .and_then(|index| self.displayed.get(index))
            .cloned()
            .ok_or_else(|| GridError::UnknownItem(id.to_string()))?;
        if item.selection_disabled {
            return Ok(false);
        }

        let before = self.selected.len();
        self.selected
            .retain(|selected| !ids_equal(selected, &item, IdKind::External));
        let now_selected = self.selected.len() == before;
        if now_selected {
            self.selected.push(item);
        }
        self.emit(GridEvent::SelectionChanged);
        Ok(now_selected)
    }

    pub fn set_selected(&mut self, ids: &[&str]) {
        self.selected = self
            .displayed
            .rows()
            .iter()
            .filter(|item| !item.selection_disabled)
            .filter(|item| item.external_id.as_deref().is_some_and(|id| ids.contains(&id)))
            .cloned()
            .collect();
        self.emit(GridEvent::SelectionChanged);
    }

    pub fn select_all(&mut self) {
        self.selected = self.selectable_items().into_iter().cloned().collect();
        self.emit(GridEvent::SelectionChanged);
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
        self.emit(GridEvent::SelectionChanged);
    }

    // ---- tree expansion -----------------------------------------------------------------

    pub async fn expand_item(&mut self, id: &str, parent_id: Option<&str>) -> Result<(), GridError> {
        let result = if self.config.is_lazy() {
            self.expand_remote(id, parent_id).await
        } else {
            self.expand_local(id, parent_id)
        };
        self.settle("expand", result)
    }

    pub async fn collapse_item(&mut self, id: &str, parent_id: Option<&str>) -> Result<(), GridError> {
        let result = if self.config.is_lazy() {
            self.collapse_remote(id, parent_id).await
        } else {
            self.collapse_local(id)
        };
        self.settle("collapse", result)
    }

    async fn expand_remote(&mut self, id: &str, parent_id: Option<&str>) -> Result<(), GridError> {
        let id = require_id(id)?;
        let lazy = self.lazy()?;
        if self.registry.contains(id) {
            return Err(GridError::AlreadyExpanded(id.to_string()));
        }

        self.active_hint = Some(id.to_string());
        // Registered before the call so nested expands racing this one are judged correctly.
        self.registry.register(id, parent_id)?;
        self.transitions.insert(id.to_string(), NodeState::Expanding);

        let started = Instant::now();
        let timeout = lazy.request_timeout();
        let source = Arc::clone(&self.source);
        let response = with_timeout(timeout, source.expand(&lazy.resource, id, timeout)).await;
        self.transitions.remove(id);

        let response = match response {
            Ok(response) => response,
            // A stale subscription keeps the registration so the resubscribe replay applies it.
            Err(err) => {
                if !err.is_stale_subscription() {
                    let _ = self.registry.remove_subtree(id);
                }
                return Err(err.into());
            }
        };
        self.window.apply_tree(&response);
        debug!(
            id,
            user_size = response.user_ids_size,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "expanded node"
        );

        self.try_fetch(None).await
    }

    async fn collapse_remote(&mut self, id: &str, parent_id: Option<&str>) -> Result<(), GridError> {
        let id = require_id(id)?;
        let lazy = self.lazy()?;
        let removed = self.registry.remove_subtree(id)?;

        self.active_hint = Some(id.to_string());
        self.transitions.insert(id.to_string(), NodeState::Collapsing);

        let started = Instant::now();
        let timeout = lazy.request_timeout();
        let source = Arc::clone(&self.source);
        let response = with_timeout(timeout, source.collapse(&lazy.resource, id, timeout)).await;
        self.transitions.remove(id);

        let response = match response {
            Ok(response) => response,
            Err(err) => {
                if !err.is_stale_subscription() {
                    self.registry.restore(removed);
                }
                return Err(err.into());
            }
        };
        self.window.apply_tree(&response);
        debug!(
            id,
            parent_id,
            unregistered = removed.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "collapsed node"
        );

        self.try_fetch(None).await
    }

    /// Splices the children embedded in the row's children field.
    fn expand_local(&mut self, id: &str, parent_id: Option<&str>) -> Result<(), GridError> {
        let id = require_id(id)?;
        let Some(children_field) = self.config.fields.children.clone() else {
            return Err(GridError::NotExpandable(id.to_string()));
        };
        if self.registry.contains(id) {
            return Err(GridError::AlreadyExpanded(id.to_string()));
        }
        let index = self
            .displayed
            .position_of(id, IdKind::External)
            .ok_or_else(|| GridError::UnknownItem(id.to_string()))?;

        let children: Vec<Item> = self
            .displayed
            .get(index)
            .and_then(|parent| parent.get(&children_field))
            .and_then(Value::as_array)
            .filter(|children| !children.is_empty())
            .ok_or_else(|| GridError::NotExpandable(id.to_string()))?
            .iter()
            .filter_map(Value::as_object)
            .map(|record| {
                let mut child = Item::from_record(record.clone(), &self.config.fields);
                child.parent_id = Some(id.to_string());
                child.background = Some(RowBackground::Child);
                child
            })
            .collect();

        let parent_id = parent_id.map(str::to_string).or_else(|| {
            self.displayed
                .get(index)
                .and_then(|parent| parent.parent_id.clone())
        });
        self.registry.register(id, parent_id.as_deref())?;
        if let Some(parent) = self.displayed.rows_mut().get_mut(index) {
            parent.expanded = true;
            parent.background = Some(RowBackground::Parent);
        }
        debug!(id, children = children.len(), "expanded local node");
        self.displayed.insert_after(Some(index), children);
        self.active_hint = Some(id.to_string());
        self.emit(GridEvent::DisplayedItemsChanged);
        Ok(())
    }

    fn collapse_local(&mut self, id: &str) -> Result<(), GridError> {
        let id = require_id(id)?;
        let unregistered = self.registry.remove_subtree(id)?;
        if let Some(parent) = self.displayed.find_mut(id) {
            parent.expanded = false;
            parent.background = None;
        }
        let removed = self.displayed.remove_descendants(id);
        debug!(
            id,
            unregistered = unregistered.len(),
            removed = removed.len(),
            "collapsed local node"
        );
        self.active_hint = Some(id.to_string());
        self.emit(GridEvent::DisplayedItemsChanged);
        Ok(())
    }

    // ---- windowed lazy loading ----------------------------------------------------------

    /// Subscribes, replays expanded nodes in registration order and loads the first page.
    pub async fn initialize(&mut self) -> Result<(), GridError> {
        let result = self.try_initialize().await;
        self.settle("initialize", result)
    }

    pub async fn refresh_items(&mut self) -> Result<(), GridError> {
        if !self.config.is_lazy() {
            self.activate_on_apply = self.active.as_ref().and_then(|item| item.external_id.clone());
            self.apply_filter();
            self.stale = false;
            return Ok(());
        }
        let result = self.try_initialize().await;
        if result.is_ok() {
            self.stale = false;
        }
        self.settle("refresh", result)
    }

    pub async fn fetch(&mut self, direction: Option<ScrollDirection>) -> Result<(), GridError> {
        let result = self.try_fetch(direction).await;
        self.settle("fetch", result)
    }

    async fn try_initialize(&mut self) -> Result<(), GridError> {
        let lazy = self.lazy()?;
        let timeout = lazy.request_timeout();
        self.set_loading(true);

        let started = Instant::now();
        let source = Arc::clone(&self.source);
        let subscribed = with_timeout(
            timeout,
            source.subscribe(&lazy.resource, &self.config.fields.parent, timeout),
        )
        .await?;

        // Window updates are committed only once subscribe and every replay succeeded.
        let mut window = self.window.clone();
        window.apply_subscribe(&subscribed);
        let replay: Vec<String> = self
            .registry
            .nodes()
            .iter()
            .map(|node| node.id.clone())
            .collect();
        for id in &replay {
            let response = with_timeout(timeout, source.expand(&lazy.resource, id, timeout)).await?;
            window.apply_tree(&response);
        }
        self.window = window;
        info!(
            resource = %lazy.resource,
            total = self.window.total_size,
            user_size = self.window.user_size,
            replayed = replay.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "subscribed"
        );

        self.try_fetch(None).await
    }

    async fn try_fetch(&mut self, direction: Option<ScrollDirection>) -> Result<(), GridError> {
        let lazy = self.lazy()?;
        let timeout = lazy.request_timeout();
        self.set_loading(true);

        let request = PageRequest {
            active_id: self.active_hint.clone().unwrap_or_else(|| "0".to_string()),
            direction,
        };
        let generation = self.requests.issue();
        let started = Instant::now();
        let source = Arc::clone(&self.source);
        let result = with_timeout(timeout, source.fetch_page(&lazy.resource, &request, timeout)).await;

        let outcome = self.apply_page(result, &lazy);
        self.set_loading(false);
        if outcome.is_ok() {
            debug!(
                generation,
                active_id = %request.active_id,
                direction = direction.map(ScrollDirection::as_str),
                rows = self.items.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "rendered page"
            );
        }
        outcome
    }

    fn apply_page(
        &mut self,
        result: Result<Page, RemoteError>,
        lazy: &LazyLoadConfig,
    ) -> Result<(), GridError> {
        let page = result?;
        if lazy.tree {
            validate_tree_records(&page.data, &self.config.fields)?;
        }

        let mut max_level = 1;
        let rows: Vec<Item> = page
            .data
            .into_iter()
            .take(lazy.max_resident_rows)
            .map(|record| {
                let mut item = Item::from_record(record, &self.config.fields);
                item.expanded = item
                    .external_id
                    .as_deref()
                    .is_some_and(|id| self.registry.contains(id));
                max_level = max_level.max(item.level.unwrap_or(1));
                item
            })
            .collect();

        if lazy.tree {
            self.tree_column_width = tree_column_width(max_level);
        }
        self.window.visible_set_size = rows.len();
        self.resubscribe_attempts = 0;

        let activate = self.active_hint.clone();
        self.set_item_rows(rows, activate);
        Ok(())
    }

    /// Feeds one scroller reading; reaching an edge of a partial window schedules a fetch
    /// in the direction of travel once scrolling goes quiet.
    pub fn handle_scroll(&mut self, sample: ScrollSample) {
        let Some(lazy) = self.config.lazy_load.as_ref() else {
            return;
        };
        let partial = self.window.exceeds(lazy.max_resident_rows);
        let Some(direction) = self.scroll.observe(sample, partial) else {
            return;
        };

        let generation = self.requests.current();
        debug!(direction = direction.as_str(), generation, "scroll edge reached");
        let tasks = self.task_tx.clone();
        self.debouncer.schedule(async move {
            let _ = tasks.send(GridTask::Fetch {
                direction,
                generation,
            });
        });
    }

    pub fn has_pending_scroll_fetch(&self) -> bool {
        self.debouncer.is_pending()
    }

    pub async fn run_task(&mut self, task: GridTask) -> Result<(), GridError> {
        match task {
            GridTask::Fetch { generation, .. } if !self.requests.is_latest(generation) => {
                debug!(
                    generation,
                    latest = self.requests.current(),
                    "dropping scroll fetch for a superseded window"
                );
                Ok(())
            }
            GridTask::Fetch {
                direction: ScrollDirection::Up,
                ..
            } => self.scroll_and_render_top().await,
            GridTask::Fetch {
                direction: ScrollDirection::Down,
                ..
            } => self.scroll_and_render_bottom().await,
            GridTask::Resubscribe => self.initialize().await,
        }
    }

    /// Runs every queued task, including ones queued while running. Returns how many ran.
    pub async fn run_pending_tasks(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.task_rx.try_recv() {
            let _ = self.run_task(task).await;
            ran += 1;
        }
        ran
    }

    pub async fn next_task(&mut self) -> Option<GridTask> {
        self.task_rx.recv().await
    }

    async fn scroll_and_render_top(&mut self) -> Result<(), GridError> {
        let Some(first) = self.items.first().and_then(|item| item.external_id.clone()) else {
            return Ok(());
        };
        if self.window.first_visible_id.is_none()
            || self.window.first_visible_id.as_deref() == Some(first.as_str())
        {
            debug!(first = %first, "window already starts at the first row");
            return Ok(());
        }

        self.active_hint = Some(first);
        self.fetch(Some(ScrollDirection::Up)).await
    }

    async fn scroll_and_render_bottom(&mut self) -> Result<(), GridError> {
        let Some(last) = self.items.last().and_then(|item| item.external_id.clone()) else {
            return Ok(());
        };
        if self.window.last_visible_id.is_none()
            || self.window.last_visible_id.as_deref() == Some(last.as_str())
        {
            debug!(last = %last, "window already ends at the last row");
            return Ok(());
        }

        let row_height = self
            .config
            .lazy_load
            .as_ref()
            .map_or(1.0, |lazy| lazy.row_height_px.max(1.0));
        let visible_rows = (self.scroll.client_height() / row_height).round().max(1.0) as usize;
        let anchor = self.items.len().saturating_sub(visible_rows);
        self.active_hint = self
            .items
            .get(anchor)
            .and_then(|item| item.external_id.clone());
        self.fetch(Some(ScrollDirection::Down)).await
    }

    // ---- plumbing -----------------------------------------------------------------------

    fn lazy(&self) -> Result<LazyLoadConfig, GridError> {
        self.config.lazy_load.clone().ok_or(GridError::NotLazy)
    }

    fn set_loading(&mut self, loading: bool) {
        if self.loading != loading {
            self.loading = loading;
            self.emit(GridEvent::LoadingChanged(loading));
        }
    }

    pub(crate) fn emit(&self, event: GridEvent) {
        let _ = self.events.send(event);
    }

    /// Operation boundary: nothing escapes unhandled, the result is still returned.
    fn settle(&mut self, operation: &'static str, result: Result<(), GridError>) -> Result<(), GridError> {
        let err = match result {
            Ok(()) => return Ok(()),
            Err(err) => err,
        };

        if err.is_invalid_operation() {
            warn!(operation, error = %err, "rejected grid operation");
            return Err(err);
        }

        self.set_loading(false);
        if err.is_stale_subscription() && self.schedule_resubscribe() {
            return Err(err);
        }

        error!(operation, error = %err, "grid operation failed");
        let message = err.user_message(&self.config.labels);
        self.emit(GridEvent::Notice(Notice { operation, message }));
        Err(err)
    }

    fn schedule_resubscribe(&mut self) -> bool {
        let limit = self
            .config
            .lazy_load
            .as_ref()
            .map_or(0, |lazy| lazy.max_resubscribe_attempts);
        if self.resubscribe_attempts >= limit {
            warn!(attempts = self.resubscribe_attempts, "giving up on resubscribing");
            return false;
        }

        self.resubscribe_attempts += 1;
        info!(attempt = self.resubscribe_attempts, "subscription expired, resubscribing");
        self.task_tx.send(GridTask::Resubscribe).is_ok()
    }
}

fn require_id(id: &str) -> Result<&str, GridError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(GridError::MissingId);
    }
    Ok(id)
}
