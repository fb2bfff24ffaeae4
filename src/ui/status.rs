use crate::app::{App, Screen};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::Paragraph,
    Frame,
};
use std::borrow::Cow;

const LIST_HINTS: &str =
    "[j/k]move [h/l]column [s/S]sort [space]select [a]all [r]reset [n]navigate [q]uit";

/// Render the status bar: message or key hints on the left, list
/// indicators on the right.
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    if area.width < 1 || area.height < 1 {
        return;
    }

    let text: Cow<'_, str> = if let Some((msg, _)) = &app.status_message {
        Cow::Borrowed(msg.as_ref())
    } else {
        match app.screen {
            Screen::List => Cow::Borrowed(LIST_HINTS),
            Screen::Elsewhere => Cow::Borrowed("[n]go back [q]uit"),
        }
    };

    let indicators = indicators(app);
    let right_width = (indicators.chars().count() as u16).min(area.width / 2);
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(right_width)])
        .split(area);

    let style = Style::default().bg(Color::DarkGray).fg(Color::White);
    f.render_widget(Paragraph::new(text).style(style), chunks[0]);
    f.render_widget(
        Paragraph::new(indicators).style(style.add_modifier(Modifier::BOLD)),
        chunks[1],
    );
}

fn indicators(app: &App) -> String {
    let mut parts: Vec<String> = Vec::new();
    if app.screen == Screen::List {
        if let Some(column) = app.columns().get(app.sort_column) {
            let arrow = match &app.sorted_by {
                Some((label, descending)) if *label == column.label => {
                    if *descending {
                        " ↓"
                    } else {
                        " ↑"
                    }
                }
                _ => "",
            };
            parts.push(format!("sort: {}{arrow}", column.label));
        }
        if let Some(list) = &app.list {
            let selected = list.selected_items().len();
            if selected > 0 {
                parts.push(format!("{selected} selected"));
            }
        }
        if app.is_fetching() {
            parts.push("loading".to_string());
        }
        if app.is_scrolled_away() {
            parts.push("[g] top".to_string());
        }
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" {} ", parts.join(" | "))
    }
}
