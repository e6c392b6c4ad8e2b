use crate::app::{App, ModalState};
use lazygrid::RowBackground;
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::prelude::{Alignment, Color, Line, Modifier, Span, Style};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};

const HELP_LINES: &[&str] = &[
    "j/k ↑/↓       move",
    "PgUp/PgDn     move one page",
    "l → Enter     expand row",
    "h ←           collapse row or parent",
    "/             filter, Esc clears",
    "s / S         cycle / clear name sort",
    "space / A     toggle row / all rows",
    "a / c         add row / add child",
    "u             mark row as edited",
    "x             remove row",
    "r             refresh",
    "Ctrl+u/d      scroll log",
    "q             quit",
];

pub fn draw(frame: &mut Frame, app: &mut App) {
    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(frame.area());

    let main = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(75), Constraint::Percentage(25)])
        .split(outer[0]);

    draw_grid(frame, app, main[0]);
    draw_logs(frame, app, main[1]);
    draw_status_bar(frame, app, outer[1]);
    draw_modal(frame, app);
}

fn draw_grid(frame: &mut Frame, app: &mut App, area: Rect) {
    let viewport_rows = area.height.saturating_sub(2) as usize;
    app.sync_list_scroll(viewport_rows);

    let title = format!(
        " {} | {} ",
        app.grid
            .config()
            .lazy_load
            .as_ref()
            .map_or("grid", |lazy| lazy.resource.as_str()),
        app.grid.results_label()
    );
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    if app.grid.has_no_items() {
        let placeholder = Paragraph::new(app.grid.config().labels.no_items.as_str())
            .block(block)
            .alignment(Alignment::Center);
        frame.render_widget(placeholder, area);
        return;
    }

    let items: Vec<ListItem> = app
        .current_items()
        .into_iter()
        .zip(app.grid.displayed_items())
        .map(|(line, item)| {
            let style = if app.is_removing(item) {
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::CROSSED_OUT)
            } else {
                match item.background {
                    Some(RowBackground::Parent) => Style::default().fg(Color::LightBlue),
                    Some(RowBackground::Child) => Style::default().fg(Color::Gray),
                    None => Style::default(),
                }
            };
            ListItem::new(line).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .fg(Color::Black)
                .bg(Color::LightGreen)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▶ ");

    let mut state = ListState::default().with_offset(app.list_scroll());
    if app.current_len() > 0 {
        state.select(Some(app.selected_index));
    }

    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_logs(frame: &mut Frame, app: &App, area: Rect) {
    let visible = area.height.saturating_sub(2) as usize;
    let end = app.logs.len().saturating_sub(app.log_tail_offset);
    let start = end.saturating_sub(visible);
    let lines: Vec<Line> = app.logs[start..end]
        .iter()
        .map(|line| {
            if line.starts_with("error[") {
                Line::from(line.as_str()).style(Style::default().fg(Color::LightRed))
            } else {
                Line::from(line.as_str())
            }
        })
        .collect();

    let paragraph = Paragraph::new(lines)
        .block(Block::default().title(" Log ").borders(Borders::ALL))
        .wrap(Wrap { trim: false });

    frame.render_widget(paragraph, area);
}

fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let (busy, busy_style) = if app.busy || app.grid.is_loading() {
        ("LOADING", Style::default().bg(Color::Yellow).fg(Color::Black))
    } else {
        ("IDLE", Style::default().bg(Color::DarkGray).fg(Color::White))
    };

    let window = app.grid.window();
    let sorters: Vec<String> = app
        .grid
        .active_sorters()
        .iter()
        .map(|sorter| format!("{}{}", sorter.path, sorter.direction.symbol()))
        .collect();

    let mut spans = vec![
        Span::styled(format!(" {busy} "), busy_style),
        Span::raw("  "),
        Span::styled(
            format!(
                "window {}/{} of {}",
                window.visible_set_size, window.user_size, window.total_size
            ),
            Style::default().fg(Color::Gray),
        ),
    ];
    if !sorters.is_empty() {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            format!("sort {}", sorters.join(",")),
            Style::default().fg(Color::Gray),
        ));
    }
    if app.grid.is_stale() {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            " STALE (r) ",
            Style::default().bg(Color::LightRed).fg(Color::Black),
        ));
    }
    spans.push(Span::raw("  "));
    spans.push(Span::styled("? help", Style::default().fg(Color::Gray)));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_modal(frame: &mut Frame, app: &App) {
    match &app.modal {
        ModalState::None => {}
        ModalState::Help => {
            let area = centered_rect(50, 60, frame.area());
            frame.render_widget(Clear, area);
            let lines: Vec<Line> = HELP_LINES.iter().map(|line| Line::from(*line)).collect();
            let paragraph = Paragraph::new(lines).block(
                Block::default()
                    .title(" Keys ")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Cyan)),
            );
            frame.render_widget(paragraph, area);
        }
        ModalState::ListFilter { value, .. } => {
            let area = centered_rect(60, 20, frame.area());
            frame.render_widget(Clear, area);
            let lines = vec![
                Line::from(format!("filter: {value}")).style(Style::default().fg(Color::Yellow)),
                Line::from(""),
                Line::from("Enter: keep  Esc: restore"),
            ];
            let paragraph = Paragraph::new(lines).block(
                Block::default()
                    .title(" Filter ")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Cyan)),
            );
            frame.render_widget(paragraph, area);
        }
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
