use crate::app::{App, GridCommand, ModalState};
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use lazygrid::{GridEvent, Record, SelectAllState};
use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;

const SORT_FIELD: &str = "name";

pub(crate) fn handle_grid_event(app: &mut App, event: GridEvent) {
    app.apply_grid_event(event);
}

pub(crate) fn send_command(
    app: &mut App,
    command_tx: &UnboundedSender<GridCommand>,
    command: GridCommand,
) -> Result<()> {
    app.busy = true;
    command_tx
        .send(command)
        .map_err(|err| anyhow::anyhow!("failed to dispatch grid command: {err}"))
}

pub(crate) fn handle_key_event(
    app: &mut App,
    key: KeyEvent,
    command_tx: &UnboundedSender<GridCommand>,
) -> Result<()> {
    if key.modifiers == KeyModifiers::CONTROL && key.code == KeyCode::Char('c') {
        app.should_quit = true;
        return Ok(());
    }

    match app.modal.clone() {
        ModalState::None => handle_key_without_modal(app, key, command_tx),
        ModalState::Help => {
            handle_help_key(app, key);
            Ok(())
        }
        ModalState::ListFilter { .. } => {
            handle_list_filter_key(app, key);
            Ok(())
        }
    }
}

pub(crate) fn handle_mouse_event(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollDown => app.select_next(),
        MouseEventKind::ScrollUp => app.select_prev(),
        _ => {}
    }
}

fn handle_key_without_modal(
    app: &mut App,
    key: KeyEvent,
    command_tx: &UnboundedSender<GridCommand>,
) -> Result<()> {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('?') => app.open_help(),
        KeyCode::Char('/') => app.open_list_filter(),
        KeyCode::Esc if !app.grid.query().is_empty() => app.grid.set_query(""),
        KeyCode::Char('j') | KeyCode::Down => app.select_next(),
        KeyCode::Char('k') | KeyCode::Up => app.select_prev(),
        KeyCode::PageDown => app.select_page_down(),
        KeyCode::PageUp => app.select_page_up(),
        KeyCode::Char('d') if key.modifiers == KeyModifiers::CONTROL => {
            app.scroll_log_down(5);
        }
        KeyCode::Char('u') if key.modifiers == KeyModifiers::CONTROL => {
            app.scroll_log_up(5);
        }
        KeyCode::Char('l') | KeyCode::Right | KeyCode::Enter => {
            if let Some(item) = app.selected_item().cloned() {
                match item.external_id {
                    Some(id) if !item.expanded => {
                        let parent_id = item.parent_id.clone();
                        send_command(app, command_tx, GridCommand::Expand { id, parent_id })?;
                    }
                    Some(id) => app.log(format!("{id} is already expanded")),
                    None => app.log("row has no id".to_string()),
                }
            }
        }
        KeyCode::Char('h') | KeyCode::Left => collapse_selected_or_parent(app, command_tx)?,
        KeyCode::Char(' ') => {
            if let Some(id) = app.selected_id() {
                match app.grid.toggle_selected(&id) {
                    Ok(false) if app.selected_item().is_some_and(|item| item.selection_disabled) => {
                        app.log(format!("{id} cannot be selected"));
                    }
                    Ok(_) => {}
                    Err(err) => app.log(format!("select failed: {err}")),
                }
            }
        }
        KeyCode::Char('A') => match app.grid.select_all_state() {
            SelectAllState::Checked => app.grid.clear_selection(),
            SelectAllState::Unchecked | SelectAllState::Indeterminate => app.grid.select_all(),
        },
        KeyCode::Char('s') => {
            let direction = app.grid.cycle_sorter(SORT_FIELD);
            app.log(format!("sort {SORT_FIELD} {}", direction.symbol()));
        }
        KeyCode::Char('S') => app.grid.remove_active_sorter(SORT_FIELD),
        KeyCode::Char('a') => add_sibling_row(app),
        KeyCode::Char('c') if key.modifiers.is_empty() => add_child_row(app),
        KeyCode::Char('u') if key.modifiers.is_empty() => mark_selected_row(app),
        KeyCode::Char('x') => {
            if let Some(id) = app.selected_id() {
                app.removing.push(id.clone());
                send_command(app, command_tx, GridCommand::RemoveDeferred { ids: vec![id] })?;
            }
        }
        KeyCode::Char('r') => send_command(app, command_tx, GridCommand::Refresh)?,
        _ => {}
    }

    Ok(())
}

/// Collapses the selected row when expanded, otherwise the nearest expanded ancestor.
fn collapse_selected_or_parent(
    app: &mut App,
    command_tx: &UnboundedSender<GridCommand>,
) -> Result<()> {
    let Some(item) = app.selected_item().cloned() else {
        return Ok(());
    };

    let target = if item.expanded {
        item.external_id.clone().map(|id| (id, item.parent_id.clone()))
    } else {
        item.parent_id.clone().and_then(|parent| {
            app.grid
                .expanded_nodes()
                .iter()
                .find(|node| node.id == parent)
                .map(|node| (node.id.clone(), node.parent_id.clone()))
        })
    };

    match target {
        Some((id, parent_id)) => send_command(app, command_tx, GridCommand::Collapse { id, parent_id }),
        None => Ok(()),
    }
}

fn new_row(app: &mut App, name: String, parent: Option<&str>) -> Record {
    let fields = app.grid.config().fields.clone();
    let id = app.allocate_row_id();
    let mut record = Record::new();
    record.insert(fields.id, Value::from(id));
    record.insert("name".to_string(), Value::from(name));
    record.insert("role".to_string(), Value::from("novo"));
    if let Some(parent) = parent {
        record.insert(fields.parent, Value::from(parent));
    }
    record
}

fn add_sibling_row(app: &mut App) {
    let after = app.selected_id();
    let record = new_row(app, "Nova linha".to_string(), None);
    app.grid.add_item(vec![record], after.as_deref(), true);
    app.follow_active();
}

fn add_child_row(app: &mut App) {
    let Some(parent) = app.selected_id() else {
        return;
    };
    let record = new_row(app, format!("Filho de {parent}"), Some(&parent));
    app.grid.add_item(vec![record], None, true);
    if !app.grid.expanded_nodes().iter().any(|node| node.id == parent) {
        app.log(format!("{parent} is collapsed; the new child stays hidden"));
    }
}

fn mark_selected_row(app: &mut App) {
    let Some(item) = app.selected_item().cloned() else {
        return;
    };
    let id_field = app.grid.config().fields.id.clone();
    let name = item
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default();

    let mut patch = Record::new();
    if let Some(id) = item.get(&id_field) {
        patch.insert(id_field, id.clone());
    }
    patch.insert("name".to_string(), Value::from(format!("{name} *")));
    app.grid.update_item(vec![patch], true);
}

fn handle_help_key(app: &mut App, key: KeyEvent) {
    if matches!(key.code, KeyCode::Esc | KeyCode::Enter | KeyCode::Char('?') | KeyCode::Char('q')) {
        app.close_modal();
    }
}

fn handle_list_filter_key(app: &mut App, key: KeyEvent) {
    let mut immediate_filter: Option<String> = None;
    let mut restore_filter: Option<String> = None;
    let mut finalize = false;

    {
        let ModalState::ListFilter { value, original } = &mut app.modal else {
            return;
        };

        match key.code {
            KeyCode::Esc => {
                restore_filter = Some(original.clone());
                finalize = true;
            }
            KeyCode::Enter => finalize = true,
            KeyCode::Backspace => {
                value.pop();
                immediate_filter = Some(value.clone());
            }
            KeyCode::Char(c)
                if !key.modifiers.contains(KeyModifiers::CONTROL)
                    && !key.modifiers.contains(KeyModifiers::ALT)
                    && !key.modifiers.contains(KeyModifiers::SUPER) =>
            {
                value.push(c);
                immediate_filter = Some(value.clone());
            }
            _ => {}
        }
    }

    if let Some(filter) = immediate_filter {
        app.grid.set_query(filter);
    }
    if let Some(filter) = restore_filter {
        app.grid.set_query(filter);
    }
    if finalize {
        app.close_modal();
    }
}
