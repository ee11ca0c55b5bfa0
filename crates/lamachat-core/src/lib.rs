pub mod api;
pub mod config;
pub mod controller;
pub mod error;
pub mod server;
pub mod session;

pub use api::{InferenceApi, ModelDescriptor, OllamaClient};
pub use config::LamaConfig;
pub use controller::{stop_command, AppContext, Frontend, SessionController};
pub use error::{Error, Result};
pub use server::{ServerControl, ServerManager};
pub use session::{
    ChatDriver, ChatSession, EventOutcome, ExitSignal, Message, Rejection, Sender, SessionEvent,
    SessionState, Submission,
};
