//! Keyboard input handling.

use crossterm::event::{KeyCode, KeyModifiers};

use crate::app::{App, Screen};

use super::Action;

/// Main input dispatch function.
pub(super) fn handle_input(app: &mut App, code: KeyCode, modifiers: KeyModifiers) -> Action {
    if modifiers.contains(KeyModifiers::CONTROL) && code == KeyCode::Char('c') {
        return Action::Quit;
    }

    match app.screen {
        Screen::List => handle_list_input(app, code),
        Screen::Elsewhere => handle_elsewhere_input(app, code),
    }
}

fn handle_list_input(app: &mut App, code: KeyCode) -> Action {
    let page = app.viewport_height.max(1) as isize;
    match code {
        KeyCode::Char('q') | KeyCode::Esc => return Action::Quit,
        KeyCode::Char('j') | KeyCode::Down => app.move_cursor(1),
        KeyCode::Char('k') | KeyCode::Up => app.move_cursor(-1),
        KeyCode::PageDown => app.move_cursor(page),
        KeyCode::PageUp => app.move_cursor(-page),
        KeyCode::Char('g') | KeyCode::Home => app.cursor_home(),
        KeyCode::Char('G') | KeyCode::End => app.cursor_end(),
        KeyCode::Char('h') | KeyCode::Left => app.cycle_sort_column(-1),
        KeyCode::Char('l') | KeyCode::Right => app.cycle_sort_column(1),
        KeyCode::Char('s') => app.sort(false),
        KeyCode::Char('S') => app.sort(true),
        KeyCode::Char(' ') => app.toggle_selection(),
        KeyCode::Char('a') => app.toggle_select_all(),
        KeyCode::Char('r') => app.reset(),
        KeyCode::Char('R') => app.retry_load(),
        KeyCode::Char('n') => app.navigate(),
        _ => {}
    }
    Action::Continue
}

fn handle_elsewhere_input(app: &mut App, code: KeyCode) -> Action {
    match code {
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('n') | KeyCode::Char('b') | KeyCode::Backspace => {
            app.navigate();
            Action::Continue
        }
        _ => Action::Continue,
    }
}
