use std::io::{self, Stdout};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;

use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use lamachat_core::{Error, Result};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

static PANIC_HOOK: Once = Once::new();

pub(super) fn term_err(e: io::Error) -> Error {
    Error::Terminal(e.to_string())
}

fn restore() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen);
}

/// A full-screen TUI session. Raw mode and the alternate screen last as long
/// as the value does, and keys are read only while it is alive so plain
/// stdin prompts between screens never lose input.
pub(super) struct Screen {
    pub(super) terminal: Terminal<CrosstermBackend<Stdout>>,
    pub(super) keys: mpsc::Receiver<Event>,
    stop: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
}

impl Screen {
    pub(super) fn enter() -> Result<Self> {
        // Without this a panic leaves the shell in raw mode.
        PANIC_HOOK.call_once(|| {
            let original_hook = std::panic::take_hook();
            std::panic::set_hook(Box::new(move |info| {
                restore();
                original_hook(info);
            }));
        });

        enable_raw_mode().map_err(term_err)?;
        let terminal = execute!(io::stdout(), EnterAlternateScreen)
            .and_then(|()| Terminal::new(CrosstermBackend::new(io::stdout())))
            .and_then(|mut t| t.clear().map(|()| t));
        let terminal = match terminal {
            Ok(t) => t,
            Err(e) => {
                restore();
                return Err(term_err(e));
            }
        };

        let stop = Arc::new(AtomicBool::new(false));
        let (key_tx, keys) = mpsc::channel::<Event>(32);
        let flag = Arc::clone(&stop);
        let reader = tokio::task::spawn_blocking(move || {
            while !flag.load(Ordering::Relaxed) {
                if event::poll(Duration::from_millis(100)).unwrap_or(false) {
                    if let Ok(ev) = event::read() {
                        if key_tx.blocking_send(ev).is_err() {
                            break;
                        }
                    }
                }
            }
        });

        Ok(Self {
            terminal,
            keys,
            stop,
            reader: Some(reader),
        })
    }

    /// Stops the key reader and waits for it before handing the terminal
    /// back, so the next stdin reader starts clean.
    pub(super) async fn leave(mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(reader) = self.reader.take() {
            let _ = reader.await;
        }
        let _ = self.terminal.show_cursor();
    }
}

impl Drop for Screen {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        restore();
    }
}
