pub mod chat;
pub mod driver;

pub use chat::{
    ChatSession, Conversation, EventOutcome, ExitSignal, GenerationRequest, Message, Rejection,
    RequestId, Sender, SessionEvent, SessionState, Submission,
};
pub use driver::{execute, spawn_generation, ChatDriver};
