use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use super::chat::{ChatSession, EventOutcome, GenerationRequest, SessionEvent, Submission};
use crate::api::InferenceApi;
use crate::error::Error;

/// Runs one generation request to completion and turns the result into the
/// event the session expects. A `deadline` turns a hung server into a
/// recoverable failure.
pub async fn execute(
    api: Arc<dyn InferenceApi>,
    request: GenerationRequest,
    deadline: Option<Duration>,
) -> SessionEvent {
    let call = api.generate(&request.model, &request.prompt);
    let result = match deadline {
        Some(limit) => match tokio::time::timeout(limit, call).await {
            Ok(r) => r,
            Err(_) => Err(Error::RequestFailed(format!(
                "no response within {}s",
                limit.as_secs()
            ))),
        },
        None => call.await,
    };
    match result {
        Ok(text) => SessionEvent::ResponseArrived {
            id: request.id,
            text,
        },
        Err(e) => SessionEvent::RequestFailed {
            id: request.id,
            error: e.to_string(),
        },
    }
}

/// Spawns `request` as an independent task that reports back over `tx`.
/// The task never touches session state.
pub fn spawn_generation(
    api: Arc<dyn InferenceApi>,
    request: GenerationRequest,
    deadline: Option<Duration>,
    tx: mpsc::Sender<SessionEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let id = request.id;
        let event = execute(api, request, deadline).await;
        if tx.send(event).await.is_err() {
            debug!(?id, "session closed before completion arrived");
        }
    })
}

/// Glue between a [`ChatSession`] and the event loop that owns it: starts
/// generation tasks for dispatched submissions and yields their completions
/// as events.
pub struct ChatDriver {
    session: ChatSession,
    api: Arc<dyn InferenceApi>,
    deadline: Option<Duration>,
    tx: mpsc::Sender<SessionEvent>,
    rx: mpsc::Receiver<SessionEvent>,
}

impl ChatDriver {
    pub fn new(
        session: ChatSession,
        api: Arc<dyn InferenceApi>,
        deadline: Option<Duration>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(8);
        Self {
            session,
            api,
            deadline,
            tx,
            rx,
        }
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    pub fn submit(&mut self, text: &str) -> Submission {
        let outcome = self.session.submit(text);
        if let Submission::Dispatched(request) = &outcome {
            debug!(id = ?request.id, model = %request.model, "dispatching generation");
            // Never cancelled; a late result is discarded by `handle`.
            drop(spawn_generation(
                Arc::clone(&self.api),
                request.clone(),
                self.deadline,
                self.tx.clone(),
            ));
        }
        outcome
    }

    pub fn leave(&mut self) {
        self.session.leave();
    }

    pub fn quit(&mut self) {
        self.session.quit();
    }

    /// Waits for the next completion. Pending forever when nothing is in
    /// flight, so it can sit in a `select!` next to input events.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.rx.recv().await
    }

    pub fn apply(&mut self, event: SessionEvent) -> EventOutcome {
        self.session.handle(event)
    }

    pub fn into_session(self) -> ChatSession {
        self.session
    }
}
