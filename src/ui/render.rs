//! Render functions for the TUI.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::{App, Screen};
use infinilist::list::VirtualSource;

use super::{grid, status};

/// Minimum terminal dimensions required for normal operation.
pub(super) const MIN_WIDTH: u16 = 40;
pub(super) const MIN_HEIGHT: u16 = 8;

const SPINNER: [char; 4] = ['|', '/', '-', '\\'];

/// Main render dispatch function.
///
/// Also records how many rows the grid can show, which the viewport uses to
/// decide what to load.
pub(super) fn render(f: &mut Frame, app: &mut App) {
    let area = f.area();
    if area.width < 1 || area.height < 1 {
        return;
    }

    if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
        let msg = if area.height < 3 || area.width < 20 {
            Paragraph::new("Too small")
        } else {
            Paragraph::new(format!(
                "Terminal too small\n\nMinimum: {}x{}\nCurrent: {}x{}",
                MIN_WIDTH, MIN_HEIGHT, area.width, area.height
            ))
            .alignment(Alignment::Center)
        };
        f.render_widget(msg, area);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(area);

    match app.screen {
        Screen::List => render_list(f, app, chunks[0]),
        Screen::Elsewhere => render_elsewhere(f, app, chunks[0]),
    }
    status::render(f, app, chunks[1]);
}

fn render_elsewhere(f: &mut Frame, app: &App, area: Rect) {
    let text = format!(
        "You left {}.\n\nThe list was unmounted and its state saved for this session.\n\n[n] go back   [q] quit",
        app.location()
    );
    let paragraph = Paragraph::new(text)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title("Elsewhere"));
    f.render_widget(paragraph, area);
}

fn render_list(f: &mut Frame, app: &mut App, area: Rect) {
    let columns = app.columns();
    let Some(list) = &app.list else {
        return;
    };

    let has_header = list.options().has_header;
    let inner_height = usize::from(area.height.saturating_sub(2));
    // Without a header sentinel the labels are pinned above the rows.
    let pinned_header = !has_header && !columns.is_empty();
    let viewport_height = inner_height.saturating_sub(usize::from(pinned_header)).max(1);

    let mut lines: Vec<Line> = Vec::with_capacity(inner_height);
    let label_style = Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
    if pinned_header {
        lines.push(Line::styled(format!("  {}", grid::header_line(&columns)), label_style));
    }

    let count = list.item_count();
    let end = (app.offset + viewport_height).min(count);
    let spinner = SPINNER[app.spinner_frame % SPINNER.len()];
    // Read before `with_items`, which holds the state lock.
    let page = list.page();
    let records = list.records();

    list.with_items(|items| {
        for index in app.offset..end {
            let line = match items.get(index) {
                None => Line::styled("  …", Style::default().fg(Color::DarkGray)),
                Some(item) if item.is_placeholder() => Line::styled(
                    format!("  {spinner} loading page {page}"),
                    Style::default().fg(Color::Cyan),
                ),
                Some(item) if item.is_header() => {
                    Line::styled(format!("  {}", grid::header_line(&columns)), label_style)
                }
                Some(item) if item.is_footer() => Line::styled(
                    format!("  end of list, {} records", records.unwrap_or(0)),
                    Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
                ),
                Some(item) => {
                    let marker = if item.selected { "● " } else { "  " };
                    let mut style = Style::default();
                    if item.selected {
                        style = style.fg(Color::Yellow);
                    }
                    if index == app.cursor {
                        style = style.bg(Color::DarkGray).fg(Color::White);
                    }
                    Line::from(vec![
                        Span::styled(marker, style),
                        Span::styled(grid::row_line(item, &columns), style),
                    ])
                }
            };
            lines.push(line);
        }
    });

    let title = format!(
        " {} · {} rows{} ",
        app.location(),
        list.len(),
        match records {
            Some(records) => format!(" of {records}"),
            None => String::new(),
        }
    );
    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(title),
    );
    f.render_widget(paragraph, area);

    app.viewport_height = viewport_height;
}
