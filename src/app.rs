use lazygrid::{GridController, GridEvent, Item, MemorySource, ScrollSample};

const MAX_LOG_LINES: usize = 500;
const FALLBACK_ROW_HEIGHT_PX: f64 = 38.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModalState {
    None,
    Help,
    ListFilter { value: String, original: String },
}

/// Grid operations that wait on the remote source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridCommand {
    Initialize,
    Refresh,
    Expand { id: String, parent_id: Option<String> },
    Collapse { id: String, parent_id: Option<String> },
    RemoveDeferred { ids: Vec<String> },
}

impl GridCommand {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::Refresh => "refresh",
            Self::Expand { .. } => "expand",
            Self::Collapse { .. } => "collapse",
            Self::RemoveDeferred { .. } => "remove",
        }
    }
}

pub struct App {
    pub grid: GridController<MemorySource>,
    pub selected_index: usize,
    list_scroll: usize,
    viewport_rows: usize,
    fed_scroll: Option<(usize, usize)>,
    pub removing: Vec<String>,
    pub logs: Vec<String>,
    pub log_tail_offset: usize,
    pub modal: ModalState,
    pub busy: bool,
    pub should_quit: bool,
    next_row_id: u64,
}

impl App {
    pub fn new(grid: GridController<MemorySource>) -> Self {
        Self {
            grid,
            selected_index: 0,
            list_scroll: 0,
            viewport_rows: 1,
            fed_scroll: None,
            removing: Vec::new(),
            logs: Vec::new(),
            log_tail_offset: 0,
            modal: ModalState::None,
            busy: false,
            should_quit: false,
            next_row_id: 1_000_000,
        }
    }

    pub fn current_len(&self) -> usize {
        self.grid.displayed_items().len()
    }

    pub fn selected_item(&self) -> Option<&Item> {
        self.grid.displayed_items().get(self.selected_index)
    }

    pub fn selected_id(&self) -> Option<String> {
        self.selected_item().and_then(|item| item.external_id.clone())
    }

    pub fn select_next(&mut self) {
        let len = self.current_len();
        if len == 0 {
            self.selected_index = 0;
            return;
        }
        self.selected_index = (self.selected_index + 1).min(len - 1);
        self.activate_selected();
    }

    pub fn select_prev(&mut self) {
        self.selected_index = self.selected_index.saturating_sub(1);
        self.activate_selected();
    }

    pub fn select_page_down(&mut self) {
        let len = self.current_len();
        if len == 0 {
            return;
        }
        self.selected_index = (self.selected_index + self.viewport_rows).min(len - 1);
        self.activate_selected();
    }

    pub fn select_page_up(&mut self) {
        self.selected_index = self.selected_index.saturating_sub(self.viewport_rows);
        self.activate_selected();
    }

    fn activate_selected(&mut self) {
        if let Some(id) = self.selected_id()
            && let Err(err) = self.grid.activate(&id)
        {
            self.log(format!("activate failed: {err}"));
        }
    }

    pub fn list_scroll(&self) -> usize {
        self.list_scroll
    }

    pub fn sync_list_scroll(&mut self, viewport_rows: usize) {
        self.viewport_rows = viewport_rows.max(1);
        let len = self.current_len();
        if len == 0 {
            self.list_scroll = 0;
            return;
        }

        let rows = self.viewport_rows;
        if self.selected_index < self.list_scroll {
            self.list_scroll = self.selected_index;
        } else if self.selected_index >= self.list_scroll + rows {
            self.list_scroll = self.selected_index + 1 - rows;
        }

        let max_offset = len.saturating_sub(rows);
        if self.list_scroll > max_offset {
            self.list_scroll = max_offset;
        }
    }

    pub fn sync_selection_bounds(&mut self) {
        let len = self.current_len();
        if len == 0 {
            self.selected_index = 0;
            self.list_scroll = 0;
        } else if self.selected_index >= len {
            self.selected_index = len - 1;
        }
    }

    /// The list viewport expressed the way the controller measures a scroller.
    pub fn scroll_sample(&self) -> ScrollSample {
        let row_height = self
            .grid
            .config()
            .lazy_load
            .as_ref()
            .map_or(FALLBACK_ROW_HEIGHT_PX, |lazy| lazy.row_height_px);
        ScrollSample {
            scroll_top: self.list_scroll as f64 * row_height,
            scroll_height: self.current_len() as f64 * row_height,
            client_height: self.viewport_rows as f64 * row_height,
        }
    }

    /// Reports the viewport to the controller when the list offset moved.
    pub fn feed_scroll(&mut self) {
        let position = (self.list_scroll, self.current_len());
        if self.fed_scroll == Some(position) {
            return;
        }
        self.fed_scroll = Some(position);
        let sample = self.scroll_sample();
        self.grid.handle_scroll(sample);
    }

    pub fn current_items(&self) -> Vec<String> {
        self.grid
            .displayed_items()
            .iter()
            .map(|item| self.format_row(item))
            .collect()
    }

    fn format_row(&self, item: &Item) -> String {
        let depth = item.level.map_or_else(|| self.local_depth(item), |level| level.saturating_sub(1));
        let marker = if item.expanded {
            '▾'
        } else if item.has_children() || self.has_inline_children(item) {
            '▸'
        } else {
            ' '
        };
        let checked = if self.is_selected(item) { "[x]" } else { "[ ]" };
        let name = item
            .get("name")
            .and_then(|value| value.as_str())
            .unwrap_or_default();
        let role = item
            .get("role")
            .and_then(|value| value.as_str())
            .unwrap_or_default();

        format!(
            "{checked} {}{marker} {name:<32} {role}",
            "  ".repeat(depth as usize)
        )
    }

    fn local_depth(&self, item: &Item) -> u64 {
        let mut depth = 0;
        let mut parent = item.parent_id.clone();
        let rows = self.grid.displayed_items();
        while let Some(id) = parent
            && depth < rows.len() as u64
        {
            parent = rows
                .iter()
                .find(|row| row.external_id.as_deref() == Some(id.as_str()))
                .and_then(|row| row.parent_id.clone());
            depth += 1;
        }
        depth
    }

    fn has_inline_children(&self, item: &Item) -> bool {
        self.grid
            .config()
            .fields
            .children
            .as_ref()
            .and_then(|field| item.get(field))
            .and_then(|value| value.as_array())
            .is_some_and(|children| !children.is_empty())
    }

    pub fn is_selected(&self, item: &Item) -> bool {
        self.grid
            .selected_items()
            .iter()
            .any(|selected| selected.external_id == item.external_id)
    }

    pub fn is_removing(&self, item: &Item) -> bool {
        item.external_id
            .as_ref()
            .is_some_and(|id| self.removing.contains(id) || self.grid.pending_removal().contains(id))
    }

    /// Moves the cursor onto the controller's active row.
    pub fn follow_active(&mut self) {
        let active = self
            .grid
            .active_item()
            .and_then(|active| active.external_id.as_deref());
        match active.and_then(|id| {
            self.grid
                .displayed_items()
                .iter()
                .position(|item| item.external_id.as_deref() == Some(id))
        }) {
            Some(index) => self.selected_index = index,
            None => self.sync_selection_bounds(),
        }
    }

    pub fn allocate_row_id(&mut self) -> u64 {
        self.next_row_id += 1;
        self.next_row_id
    }

    pub fn apply_grid_event(&mut self, event: GridEvent) {
        match event {
            GridEvent::DisplayedItemsChanged => self.sync_selection_bounds(),
            GridEvent::ActiveItemChanged(_) => self.follow_active(),
            GridEvent::ScrollToItem(index) => {
                self.selected_index = index;
                self.sync_selection_bounds();
            }
            GridEvent::LoadingChanged(loading) => self.busy = loading,
            GridEvent::Notice(notice) => {
                self.log(format!("error[{}]: {}", notice.operation, notice.message));
            }
            GridEvent::RemovalPending(ids) => self.log(format!("removing {}", ids.join(", "))),
            GridEvent::ActiveItemUpdated | GridEvent::SelectionChanged => {}
        }
    }

    pub fn open_help(&mut self) {
        self.modal = ModalState::Help;
    }

    pub fn open_list_filter(&mut self) {
        let current = self.grid.query().to_string();
        self.modal = ModalState::ListFilter {
            value: current.clone(),
            original: current,
        };
    }

    pub fn close_modal(&mut self) {
        self.modal = ModalState::None;
    }

    pub fn log(&mut self, line: String) {
        self.logs.push(line);
        if self.log_tail_offset > 0 {
            self.log_tail_offset = self.log_tail_offset.saturating_add(1);
        }
        if self.logs.len() > MAX_LOG_LINES {
            let to_trim = self.logs.len() - MAX_LOG_LINES;
            self.logs.drain(0..to_trim);
        }
    }

    pub fn scroll_log_up(&mut self, lines: usize) -> bool {
        let before = self.log_tail_offset;
        let max = self.logs.len().saturating_sub(1);
        self.log_tail_offset = self.log_tail_offset.saturating_add(lines).min(max);
        self.log_tail_offset != before
    }

    pub fn scroll_log_down(&mut self, lines: usize) -> bool {
        let before = self.log_tail_offset;
        self.log_tail_offset = self.log_tail_offset.saturating_sub(lines);
        self.log_tail_offset != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lazygrid::{FieldMap, GridConfig, LazyLoadConfig, Notice, Record};
    use serde_json::json;
    use std::sync::Arc;

    fn rows(count: u64) -> Vec<Record> {
        (1..=count)
            .filter_map(|id| {
                json!({"id": id, "name": format!("row {id}"), "role": "pessoa"})
                    .as_object()
                    .cloned()
            })
            .collect()
    }

    fn app_with_rows(count: u64) -> App {
        let config = GridConfig {
            lazy_load: Some(LazyLoadConfig::for_resource("people")),
            ..GridConfig::default()
        };
        let source = Arc::new(MemorySource::new(Vec::new(), FieldMap::default(), 100));
        let (mut grid, _events) = GridController::new(config, source);
        grid.set_items(rows(count), None);
        App::new(grid)
    }

    #[test]
    fn sync_list_scroll_follows_selection() {
        let mut app = app_with_rows(30);
        app.selected_index = 25;
        app.sync_list_scroll(10);
        assert_eq!(app.list_scroll(), 16);

        app.selected_index = 3;
        app.sync_list_scroll(10);
        assert_eq!(app.list_scroll(), 3);
    }

    #[test]
    fn moving_selection_activates_the_row() {
        let mut app = app_with_rows(3);
        app.select_next();
        app.select_next();
        app.select_next();
        assert_eq!(app.selected_index, 2);
        assert_eq!(
            app.grid
                .active_item()
                .and_then(|item| item.external_id.as_deref()),
            Some("3")
        );
    }

    #[test]
    fn scroll_sample_measures_rows_in_pixels() {
        let mut app = app_with_rows(30);
        app.selected_index = 29;
        app.sync_list_scroll(10);

        let sample = app.scroll_sample();
        assert_eq!(sample.scroll_top, 20.0 * 38.0);
        assert_eq!(sample.scroll_height, 30.0 * 38.0);
        assert_eq!(sample.client_height, 10.0 * 38.0);
    }

    #[test]
    fn grid_events_move_selection_and_log_notices() {
        let mut app = app_with_rows(5);
        app.apply_grid_event(GridEvent::ScrollToItem(3));
        assert_eq!(app.selected_index, 3);

        app.grid.activate("2").expect("activate");
        app.apply_grid_event(GridEvent::ActiveItemChanged(Some("2".to_string())));
        assert_eq!(app.selected_index, 1);

        app.apply_grid_event(GridEvent::LoadingChanged(true));
        assert!(app.busy);

        app.apply_grid_event(GridEvent::Notice(Notice {
            operation: "fetch",
            message: "Ocorreu um erro a carregar os dados.".to_string(),
        }));
        assert_eq!(
            app.logs.last().map(String::as_str),
            Some("error[fetch]: Ocorreu um erro a carregar os dados.")
        );
    }

    #[test]
    fn rows_render_selection_box_and_name() {
        let mut app = app_with_rows(2);
        app.grid.toggle_selected("2").expect("select");
        let lines = app.current_items();
        assert!(lines[0].starts_with("[ ]"));
        assert!(lines[1].starts_with("[x]"));
        assert!(lines[1].contains("row 2"));
    }

    #[test]
    fn log_scroll_moves_with_up_and_down() {
        let mut app = app_with_rows(0);
        for line in 0..10 {
            app.log(format!("line-{line}"));
        }
        assert!(!app.scroll_log_down(1));
        assert!(app.scroll_log_up(5));
        assert_eq!(app.log_tail_offset, 5);
        assert!(app.scroll_log_down(2));
        assert_eq!(app.log_tail_offset, 3);
        assert!(app.scroll_log_down(10));
        assert_eq!(app.log_tail_offset, 0);
    }

    #[test]
    fn log_keeps_the_most_recent_lines() {
        let mut app = app_with_rows(0);
        for line in 0..(MAX_LOG_LINES + 20) {
            app.log(format!("line-{line}"));
        }
        assert_eq!(app.logs.len(), MAX_LOG_LINES);
        assert_eq!(app.logs.first().map(String::as_str), Some("line-20"));
    }
}
