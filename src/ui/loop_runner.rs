//! The demo's event loop and terminal lifetime.

use crate::app::{App, AppEvent};
use anyhow::Result;
use crossterm::event::{Event, EventStream, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use futures::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use std::time::Duration;
use tokio::sync::mpsc;

use super::input::handle_input;
use super::render::render;

const TICK: Duration = Duration::from_millis(250);

/// What the loop should do after a key press.
pub enum Action {
    Continue,
    Quit,
}

/// Raw mode plus the alternate screen, undone on drop.
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalGuard {
    fn enter() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        Ok(Self {
            terminal: Terminal::new(CrosstermBackend::new(stdout))?,
        })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

/// Leave raw mode before the default hook prints a panic message.
fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        previous(info);
    }));
}

/// Resolves on SIGINT or SIGTERM (Ctrl-C elsewhere).
async fn shutdown_signal() -> io::Result<&'static str> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = signal(SignalKind::terminate())?;
        let mut int = signal(SignalKind::interrupt())?;
        tokio::select! {
            _ = term.recv() => Ok("SIGTERM"),
            _ = int.recv() => Ok("SIGINT"),
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        Ok("Ctrl-C")
    }
}

/// Drive the demo until the user quits or the process is signalled.
///
/// Each turn applies the list's viewport commands, redraws when something
/// changed and lets the viewport request the rows it can now see, then waits
/// for the next key, page result, tick or signal.
pub async fn run(
    app: &mut App,
    event_tx: mpsc::Sender<AppEvent>,
    mut event_rx: mpsc::Receiver<AppEvent>,
) -> Result<()> {
    install_panic_hook();
    let mut guard = TerminalGuard::enter()?;
    let mut keys = EventStream::new();
    let mut ticks = tokio::time::interval(TICK);
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        app.drain_viewport_commands();
        if app.needs_redraw {
            guard.terminal.draw(|f| render(f, app))?;
            app.needs_redraw = false;
        }
        // Uses the height measured by the draw above.
        app.request_visible_pages(&event_tx);
        if app.clear_expired_status() {
            app.needs_redraw = true;
        }

        tokio::select! {
            biased;

            signal = &mut shutdown => {
                let signal = signal?;
                tracing::info!(signal, "Shutting down on signal");
                break;
            }

            event = keys.next() => match event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    app.needs_redraw = true;
                    if let Action::Quit = handle_input(app, key.code, key.modifiers) {
                        break;
                    }
                }
                Some(Ok(Event::Resize(..))) => app.needs_redraw = true,
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "Terminal input error");
                }
                None => break,
                _ => {}
            },

            Some(event) = event_rx.recv() => app.handle_event(event),

            _ = ticks.tick() => {
                if app.is_fetching() {
                    app.spinner_frame = app.spinner_frame.wrapping_add(1);
                    app.needs_redraw = true;
                }
            }
        }
    }

    drop(guard);
    Ok(())
}
