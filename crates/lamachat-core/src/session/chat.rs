use tracing::{debug, warn};

// ── conversation ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Assistant,
}

/// One turn of the conversation. Fields are read-only once appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    sender: Sender,
    content: String,
    index: usize,
}

impl Message {
    pub fn sender(&self) -> Sender {
        self.sender
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Position in the conversation, starting at 0.
    pub fn index(&self) -> usize {
        self.index
    }
}

/// Append-only history of one chat session.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    fn append(&mut self, sender: Sender, content: String) {
        let index = self.messages.len();
        self.messages.push(Message {
            sender,
            content,
            index,
        });
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

// ── state machine types ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingResponse,
    Terminated,
}

/// Tags a generation request so its completion can be matched to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

/// Work the caller must run off the event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub id: RequestId,
    pub model: String,
    pub prompt: String,
}

/// How a session hands control back to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitSignal {
    ReturnToSelection,
    Quit,
}

/// Completion of a generation request, delivered back into the loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    ResponseArrived { id: RequestId, text: String },
    RequestFailed { id: RequestId, error: String },
}

impl SessionEvent {
    pub fn id(&self) -> RequestId {
        match self {
            SessionEvent::ResponseArrived { id, .. }
            | SessionEvent::RequestFailed { id, .. } => *id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Input accepted; run this request and feed its result to `handle`.
    Dispatched(GenerationRequest),
    /// The exit command was typed.
    Exit(ExitSignal),
    Rejected(Rejection),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Empty,
    /// A request is already outstanding.
    Busy,
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Applied,
    Discarded,
}

// ── session ──────────────────────────────────────────────────────────────────

/// Conversation state for one selected model.
///
/// Performs no I/O: `submit` hands back a [`GenerationRequest`] for the
/// caller to run, and the result comes back through [`ChatSession::handle`].
/// At most one request is outstanding at a time; input is refused until it
/// resolves.
#[derive(Debug)]
pub struct ChatSession {
    model: String,
    exit_command: String,
    state: SessionState,
    conversation: Conversation,
    pending: Option<RequestId>,
    next_request: u64,
    last_error: Option<String>,
    exit: Option<ExitSignal>,
}

impl ChatSession {
    pub fn new(model: impl Into<String>, exit_command: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            exit_command: exit_command.into(),
            state: SessionState::Idle,
            conversation: Conversation::default(),
            pending: None,
            next_request: 1,
            last_error: None,
            exit: None,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn exit_command(&self) -> &str {
        &self.exit_command
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Most recent request failure, cleared by the next accepted submit.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn pending_request(&self) -> Option<RequestId> {
        self.pending
    }

    pub fn exit_signal(&self) -> Option<ExitSignal> {
        self.exit
    }

    pub fn accepts_input(&self) -> bool {
        self.state == SessionState::Idle
    }

    pub fn is_terminated(&self) -> bool {
        self.state == SessionState::Terminated
    }

    /// A blank exit command never matches, so an empty line cannot end the chat.
    pub fn is_exit_command(&self, text: &str) -> bool {
        let token = self.exit_command.trim();
        !token.is_empty() && text.trim().eq_ignore_ascii_case(token)
    }

    pub fn submit(&mut self, text: &str) -> Submission {
        if self.is_terminated() {
            return Submission::Rejected(Rejection::Terminated);
        }
        if self.is_exit_command(text) {
            self.terminate(ExitSignal::ReturnToSelection);
            return Submission::Exit(ExitSignal::ReturnToSelection);
        }
        if self.state == SessionState::AwaitingResponse {
            return Submission::Rejected(Rejection::Busy);
        }
        if text.trim().is_empty() {
            return Submission::Rejected(Rejection::Empty);
        }

        let id = RequestId(self.next_request);
        self.next_request += 1;
        self.conversation.append(Sender::User, text.to_string());
        self.last_error = None;
        self.pending = Some(id);
        self.state = SessionState::AwaitingResponse;
        Submission::Dispatched(GenerationRequest {
            id,
            model: self.model.clone(),
            prompt: text.to_string(),
        })
    }

    /// Ends the session and asks the controller to go back to model selection.
    pub fn leave(&mut self) {
        self.terminate(ExitSignal::ReturnToSelection);
    }

    /// Ends the session and asks the controller to exit.
    pub fn quit(&mut self) {
        self.terminate(ExitSignal::Quit);
    }

    fn terminate(&mut self, signal: ExitSignal) {
        if self.is_terminated() {
            return;
        }
        if let Some(id) = self.pending.take() {
            debug!(?id, "abandoning in-flight request");
        }
        self.state = SessionState::Terminated;
        self.exit = Some(signal);
    }

    pub fn handle(&mut self, event: SessionEvent) -> EventOutcome {
        let matches_pending =
            self.state == SessionState::AwaitingResponse && self.pending == Some(event.id());
        if !matches_pending {
            warn!(id = ?event.id(), state = ?self.state, "discarding stale completion");
            return EventOutcome::Discarded;
        }

        self.pending = None;
        self.state = SessionState::Idle;
        match event {
            SessionEvent::ResponseArrived { text, .. } => {
                self.conversation.append(Sender::Assistant, text);
            }
            SessionEvent::RequestFailed { error, .. } => {
                self.last_error = Some(error);
            }
        }
        EventOutcome::Applied
    }
}
