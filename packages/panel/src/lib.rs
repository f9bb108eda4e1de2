#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal status panel for the traffic monitor.
//!
//! A pure display task: it re-reads the persisted incident log on a fixed
//! timer, listens to the monitor's status channel, and offers three keys —
//! `s` to start/stop polling, `c` to clear the history, `q` to quit. It
//! shares nothing with the monitor but the store file and the two watch
//! channels.
//!
//! Renders to stderr so `stdout` stays clean, and restores the terminal even
//! on panic.

pub mod app;
pub mod ui;

use std::{io, path::PathBuf, time::Duration};

use crossterm::{
    event::{Event, EventStream, KeyCode, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::sync::watch;
use traffic_watch_monitor::{Control, MonitorStatus};

use self::app::PanelApp;

/// How often the statistics are re-read from the persisted store.
const REFRESH_INTERVAL: Duration = Duration::from_secs(5);

/// Sets up the panic hook to restore the terminal even on unexpected panics.
fn setup_panic_hook() {
    let original = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        // Best-effort terminal restore
        let _ = disable_raw_mode();
        let _ = execute!(io::stderr(), LeaveAlternateScreen);
        original(info);
    }));
}

/// Initializes the terminal for TUI rendering.
fn enter_tui() -> io::Result<Terminal<CrosstermBackend<io::Stderr>>> {
    enable_raw_mode()?;
    let mut stderr = io::stderr();
    execute!(stderr, EnterAlternateScreen)?;
    Terminal::new(CrosstermBackend::new(io::stderr()))
}

/// Restores the terminal to its original state.
fn leave_tui(terminal: &mut Terminal<CrosstermBackend<io::Stderr>>) {
    let _ = disable_raw_mode();
    let _ = execute!(terminal.backend_mut(), LeaveAlternateScreen);
    let _ = terminal.show_cursor();
}

/// Runs the panel until the user quits.
///
/// On quit, sends [`Control::Shutdown`] so the monitor finishes its in-flight
/// cycle and exits; the caller is expected to await the monitor task after
/// this returns.
///
/// # Errors
///
/// Returns [`io::Error`] if the terminal cannot be initialized.
pub async fn run(
    store_path: PathBuf,
    control: watch::Sender<Control>,
    mut status: watch::Receiver<MonitorStatus>,
) -> io::Result<()> {
    setup_panic_hook();
    let mut terminal = enter_tui()?;

    let mut app = PanelApp::new(store_path);
    app.set_status(status.borrow().clone());
    app.refresh();

    let mut event_stream = EventStream::new();
    let mut status_open = true;

    loop {
        if let Err(e) = terminal.draw(|frame| ui::draw(frame, &app)) {
            log::error!("Panel render failed: {e}");
            break;
        }

        tokio::select! {
            () = tokio::time::sleep(REFRESH_INTERVAL) => {
                app.refresh();
            }

            changed = status.changed(), if status_open => {
                if changed.is_ok() {
                    app.set_status(status.borrow().clone());
                } else {
                    // Monitor gone; keep the last known status on screen.
                    status_open = false;
                }
            }

            maybe_event = event_stream.next() => {
                if let Some(Ok(Event::Key(key))) = maybe_event {
                    let ctrl_c = key.code == KeyCode::Char('c')
                        && key.modifiers.contains(KeyModifiers::CONTROL);
                    match key.code {
                        KeyCode::Char('q') => {
                            control.send_replace(Control::Shutdown);
                            break;
                        }
                        _ if ctrl_c => {
                            control.send_replace(Control::Shutdown);
                            break;
                        }
                        KeyCode::Char('s') => {
                            let next = match *control.borrow() {
                                Control::Run => Control::Pause,
                                Control::Pause | Control::Shutdown => Control::Run,
                            };
                            control.send_replace(next);
                        }
                        KeyCode::Char('c') => {
                            if let Err(e) = app.clear() {
                                log::error!("Clear failed: {e}");
                            }
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    leave_tui(&mut terminal);
    Ok(())
}
