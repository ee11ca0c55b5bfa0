mod app;
mod picker;
mod render;
mod run;
mod terminal;
mod types;

use async_trait::async_trait;
use lamachat_core::{ChatDriver, Error, ExitSignal, Frontend, ModelDescriptor, Result};

use crate::prompt;
use terminal::Screen;

/// Terminal frontend: line prompts for yes/no questions, full-screen views
/// for model selection and chat. Status lines go to stdout between screens.
pub struct TuiFrontend;

async fn ask(question: &'static str) -> Result<bool> {
    tokio::task::spawn_blocking(move || prompt::confirm(question))
        .await
        .map_err(|e| Error::Terminal(e.to_string()))?
        .map_err(Error::from)
}

#[async_trait]
impl Frontend for TuiFrontend {
    fn notify(&mut self, message: &str) {
        println!("{message}");
    }

    async fn confirm_start(&mut self) -> Result<bool> {
        ask("Ollama server is not running. Would you like to start it?").await
    }

    async fn confirm_stop_by_name(&mut self) -> Result<bool> {
        ask("This stops every running Ollama server, including ones not started by lamachat. \
             Continue?")
        .await
    }

    async fn select_model(
        &mut self,
        models: &[ModelDescriptor],
    ) -> Result<Option<ModelDescriptor>> {
        let mut screen = Screen::enter()?;
        let choice = run::run_picker(&mut screen, models).await;
        screen.leave().await;
        choice
    }

    async fn run_chat(&mut self, driver: ChatDriver) -> Result<ExitSignal> {
        let mut screen = Screen::enter()?;
        let signal = run::run_chat(&mut screen, driver).await;
        screen.leave().await;
        signal
    }
}
