mod app;
mod demo;
mod handlers;
mod terminal;
mod ui;

use crate::app::{App, GridCommand};
use crate::handlers::{handle_grid_event, handle_key_event, handle_mouse_event, send_command};
use crate::terminal::{Tui, install_panic_hook, restore_terminal, setup_terminal};
use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyEventKind};
use lazygrid::{GridConfig, GridController, LazyLoadConfig, MemorySource};
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEMO_RESOURCE: &str = "organisation";

#[tokio::main]
async fn main() -> Result<()> {
    let config = match GridConfig::load_or_default() {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("failed to load config, using defaults: {err:#}");
            GridConfig::default()
        }
    };

    if let Err(err) = init_tracing() {
        eprintln!("logging disabled: {err:#}");
    }

    install_panic_hook();
    let mut terminal = setup_terminal()?;

    let run_result = run_app(&mut terminal, config).await;

    restore_terminal(&mut terminal)?;
    if let Err(err) = run_result {
        eprintln!("{err:#}");
        std::process::exit(1);
    }

    Ok(())
}

/// Sends tracing output to a file; the terminal belongs to the UI.
fn init_tracing() -> Result<PathBuf> {
    let dir = dirs::cache_dir()
        .context("failed to resolve cache directory")?
        .join("lazygrid");
    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create log directory: {}", dir.display()))?;
    let path = dir.join("lazygrid.log");
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file: {}", path.display()))?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lazygrid=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|err| anyhow::anyhow!("failed to install tracing subscriber: {err}"))?;
    Ok(path)
}

async fn run_app(terminal: &mut Tui, mut config: GridConfig) -> Result<()> {
    let lazy = config
        .lazy_load
        .get_or_insert_with(|| LazyLoadConfig::for_resource(DEMO_RESOURCE))
        .clone();
    let records = demo::organisation(&config.fields);
    info!(rows = records.len(), resource = %lazy.resource, "starting demo grid");
    let source = Arc::new(MemorySource::new(
        records,
        config.fields.clone(),
        lazy.max_resident_rows,
    ));

    let (grid, mut grid_events) = GridController::new(config, source);
    let mut app = App::new(grid);
    let (command_tx, mut command_rx) = mpsc::unbounded_channel::<GridCommand>();

    send_command(&mut app, &command_tx, GridCommand::Initialize)?;

    while !app.should_quit {
        while let Ok(event) = grid_events.try_recv() {
            handle_grid_event(&mut app, event);
        }

        terminal.draw(|frame| ui::draw(frame, &mut app))?;
        app.feed_scroll();

        if let Ok(command) = command_rx.try_recv() {
            run_command(&mut app, command).await;
            continue;
        }
        if app.grid.run_pending_tasks().await > 0 {
            continue;
        }

        if event::poll(Duration::from_millis(100)).context("event poll failed")? {
            match event::read().context("event read failed")? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    handle_key_event(&mut app, key, &command_tx)?;
                }
                Event::Mouse(mouse) => handle_mouse_event(&mut app, mouse),
                _ => {}
            }
        }
    }

    if let Err(err) = app.grid.config().save() {
        eprintln!("failed to save config: {err:#}");
    }

    Ok(())
}

async fn run_command(app: &mut App, command: GridCommand) {
    let started = Instant::now();
    let outcome = match &command {
        GridCommand::Initialize => app.grid.initialize().await,
        GridCommand::Refresh => app.grid.refresh_items().await,
        GridCommand::Expand { id, parent_id } => {
            app.grid.expand_item(id, parent_id.as_deref()).await
        }
        GridCommand::Collapse { id, parent_id } => {
            app.grid.collapse_item(id, parent_id.as_deref()).await
        }
        GridCommand::RemoveDeferred { ids } => {
            let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
            app.grid.remove_item_deferred(&ids, true).await;
            app.removing.clear();
            Ok(())
        }
    };
    app.busy = app.grid.is_loading();

    let elapsed = started.elapsed().as_millis();
    match outcome {
        Ok(()) => app.log(format!("{} ok duration={elapsed}ms", command.label())),
        Err(err) if err.is_invalid_operation() => {
            app.log(format!("{} skipped: {err}", command.label()));
        }
        // Remote failures arrive as notices through the event channel.
        Err(_) => {}
    }
}
