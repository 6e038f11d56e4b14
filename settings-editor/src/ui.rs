//! Frame rendering.
//!
//! The screen is split into a header with the window title and refresh
//! flags, the settings table, and a footer that shows either the input
//! prompt, the last status message, or the key help.

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
};
use settree::NodeKind;

use crate::app::{App, InputMode};

const HELP: &str =
    "q: quit | j/k: move | Enter: expand/edit | Left: collapse | r: refresh | a: auto refresh | f: fallbacks | o: open";

/// Rows around the table body: header, footer, borders and column titles.
pub const CHROME_HEIGHT: u16 = 7;

pub fn draw(frame: &mut Frame<'_>, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(3),
            Constraint::Length(2),
        ])
        .split(frame.area());

    render_header(frame, chunks[0], app);
    render_table(frame, chunks[1], app);
    render_footer(frame, chunks[2], app);
}

fn flag(name: &str, on: bool) -> Span<'static> {
    let style = if on {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    Span::styled(format!(" {name}: {} ", if on { "on" } else { "off" }), style)
}

fn render_header(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let mut spans = vec![Span::styled(
        app.title(),
        Style::default().add_modifier(Modifier::BOLD),
    )];
    if app.tree.settings().is_some() {
        spans.push(Span::raw("  "));
        spans.push(flag("auto refresh", app.tree.auto_refresh()));
        spans.push(flag("fallbacks", app.tree.fallbacks_enabled()));
    }
    let header = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, area);
}

fn render_table(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let rows = app.visible_rows();
    let editing = app.mode == InputMode::Editing;

    let table_rows: Vec<Row> = rows
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            let node = row.node;
            let icon = match node.kind {
                NodeKind::Group if node.expanded => "▼ ",
                NodeKind::Group => "▶ ",
                NodeKind::Key => "• ",
            };
            let label = format!("{}{}{}", "  ".repeat(row.depth), icon, node.label);
            let value = if editing && idx == app.cursor.pos() {
                Cell::from(format!("{}_", app.input)).style(Style::default().fg(Color::Yellow))
            } else {
                Cell::from(node.value_text.as_str())
            };
            let label_style = match node.kind {
                NodeKind::Group => Style::default().fg(Color::Cyan),
                NodeKind::Key => Style::default(),
            };
            Row::new(vec![
                Cell::from(label).style(label_style),
                Cell::from(node.type_text.as_str()).style(Style::default().fg(Color::DarkGray)),
                value,
            ])
        })
        .collect();

    let header = Row::new(["Setting", "Type", "Value"])
        .style(Style::default().add_modifier(Modifier::BOLD));
    let table = Table::new(
        table_rows,
        [
            Constraint::Percentage(40),
            Constraint::Length(12),
            Constraint::Fill(1),
        ],
    )
    .header(header)
    .block(Block::default().borders(Borders::ALL))
    .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let mut state = TableState::default().with_offset(app.scroll_offset);
    if !rows.is_empty() {
        state = state.with_selected(Some(app.cursor.pos()));
    }
    frame.render_stateful_widget(table, area, &mut state);
}

fn render_footer(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let line = match app.mode {
        InputMode::Opening => Line::from(vec![
            Span::styled("Open: ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(format!("{}_", app.input)),
        ]),
        _ => match &app.status {
            Some(status) if status.is_error => {
                Line::from(Span::styled(status.text.clone(), Style::default().fg(Color::Red)))
            }
            Some(status) => Line::from(status.text.clone()),
            None => Line::from(Span::styled(HELP, Style::default().fg(Color::DarkGray))),
        },
    };
    let footer = Paragraph::new(line).block(Block::default().borders(Borders::TOP));
    frame.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use ratatui::{Terminal, backend::TestBackend, buffer::Buffer};
    use settree::{
        SettingsTree,
        store::{MemoryStore, handle},
    };

    use super::*;

    fn render(app: &App) -> String {
        let backend = TestBackend::new(80, 12);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|frame| draw(frame, app)).unwrap();
        buffer_text(terminal.backend().buffer())
    }

    fn buffer_text(buffer: &Buffer) -> String {
        let area = buffer.area;
        let mut out = String::new();
        for y in 0..area.height {
            for x in 0..area.width {
                out.push_str(buffer[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    fn app() -> App {
        let store = MemoryStore::new("demo")
            .with("window/width", 800)
            .with("title", "hello");
        let mut tree = SettingsTree::new();
        tree.set_settings_object(Some(handle(store)));
        App::new(tree)
    }

    #[test]
    fn renders_columns_and_rows() {
        let text = render(&app());
        assert!(text.contains("Settings Editor - demo"));
        assert!(text.contains("Setting"));
        assert!(text.contains("Type"));
        assert!(text.contains("▶ window"));
        assert!(text.contains("• title"));
        assert!(text.contains("string"));
        assert!(text.contains("hello"));
        assert!(text.contains("q: quit"));
    }

    #[test]
    fn shows_the_edit_buffer() {
        let mut app = app();
        app.cursor.end();
        app.on_key(crossterm::event::KeyEvent::new(
            crossterm::event::KeyCode::Char('e'),
            crossterm::event::KeyModifiers::NONE,
        ));
        let text = render(&app);
        assert!(text.contains("hello_"));
        assert!(text.contains("Editing title"));
    }
}
