use std::time::Duration;

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use lamachat_core::{
    ChatDriver, Error, EventOutcome, ExitSignal, ModelDescriptor, Rejection, Result, SessionEvent,
    Submission,
};
use tracing::debug;

use super::app::App;
use super::picker::{Picker, PickerAction};
use super::render::{render_chat, render_picker};
use super::terminal::{term_err, Screen};
use super::types::ChatMsg;

fn input_closed() -> Error {
    Error::Terminal("keyboard input closed".into())
}

fn pressed(ev: Event) -> Option<KeyEvent> {
    match ev {
        Event::Key(key) if key.kind == KeyEventKind::Press => Some(key),
        _ => None,
    }
}

// ── model picker ─────────────────────────────────────────────────────────────

pub(super) async fn run_picker(
    screen: &mut Screen,
    models: &[ModelDescriptor],
) -> Result<Option<ModelDescriptor>> {
    let mut picker = Picker::new(models.len());
    loop {
        screen
            .terminal
            .draw(|f| render_picker(f, models, &picker))
            .map_err(term_err)?;

        let ev = screen.keys.recv().await.ok_or_else(input_closed)?;
        let Some(key) = pressed(ev) else { continue };
        match picker.handle_key(key) {
            PickerAction::Stay => {}
            PickerAction::Choose(i) => return Ok(models.get(i).cloned()),
            PickerAction::Quit => return Ok(None),
        }
    }
}

// ── chat screen ──────────────────────────────────────────────────────────────

/// Pushes the outcome of one submission onto the screen. The input line is
/// only cleared when the text was consumed.
fn show_submission(app: &mut App, outcome: Submission) {
    match outcome {
        Submission::Dispatched(request) => {
            app.commit_input();
            app.push(ChatMsg::User(request.prompt));
        }
        Submission::Exit(_) => app.clear_input(),
        Submission::Rejected(Rejection::Busy) => {
            debug!("input held while a reply is pending");
        }
        Submission::Rejected(Rejection::Empty | Rejection::Terminated) => {}
    }
}

/// Applies a completion and shows it, unless the session discarded it.
fn show_event(driver: &mut ChatDriver, app: &mut App, event: SessionEvent) {
    let shown = match &event {
        SessionEvent::ResponseArrived { text, .. } => ChatMsg::Assistant(text.clone()),
        SessionEvent::RequestFailed { error, .. } => ChatMsg::Error(error.clone()),
    };
    if driver.apply(event) == EventOutcome::Applied {
        app.push(shown);
    }
}

fn handle_key(driver: &mut ChatDriver, app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('c') if ctrl => driver.quit(),
        KeyCode::Esc => driver.leave(),
        KeyCode::Up => app.scroll_up(3),
        KeyCode::Down => app.scroll_down(3),
        KeyCode::PageUp => app.scroll_up(10),
        KeyCode::PageDown => app.scroll_down(10),
        KeyCode::Left => app.cursor_left(),
        KeyCode::Right => app.cursor_right(),
        KeyCode::Char('a') if ctrl => app.cursor = 0,
        KeyCode::Char('e') if ctrl => app.cursor = app.input.len(),
        KeyCode::Char('p') if ctrl => app.history_prev(),
        KeyCode::Char('n') if ctrl => app.history_next(),
        KeyCode::Backspace => app.backspace(),
        KeyCode::Enter => {
            let outcome = driver.submit(&app.input);
            show_submission(app, outcome);
        }
        KeyCode::Char(c) => app.insert_char(c),
        _ => {}
    }
}

pub(super) async fn run_chat(screen: &mut Screen, mut driver: ChatDriver) -> Result<ExitSignal> {
    let exit_command = driver.session().exit_command().to_string();
    let mut app = App::new(driver.session().model());
    app.push(ChatMsg::Info(format!(
        "Chatting with {}. Type {exit_command} to pick another model.",
        driver.session().model()
    )));

    loop {
        if let Some(signal) = driver.session().exit_signal() {
            return Ok(signal);
        }

        let busy = !driver.session().accepts_input();
        screen
            .terminal
            .draw(|f| render_chat(f, &mut app, busy, &exit_command))
            .map_err(term_err)?;

        tokio::select! {
            // ── keyboard ──
            key = screen.keys.recv() => {
                let Some(ev) = key else {
                    driver.quit();
                    continue;
                };
                if let Some(key) = pressed(ev) {
                    handle_key(&mut driver, &mut app, key);
                }
            }

            // ── completions ──
            Some(event) = driver.next_event() => {
                show_event(&mut driver, &mut app, event);
            }

            // ── spinner tick ──
            _ = tokio::time::sleep(Duration::from_millis(80)) => {
                if busy { app.spin_i += 1; }
            }
        }
    }
}
