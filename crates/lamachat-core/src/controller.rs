use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::api::{InferenceApi, ModelDescriptor, OllamaClient};
use crate::config::LamaConfig;
use crate::error::{Error, Result};
use crate::server::{ServerControl, ServerManager};
use crate::session::{ChatDriver, ChatSession, ExitSignal};

/// Everything one run needs, built once and passed down explicitly.
pub struct AppContext {
    pub config: LamaConfig,
    pub server: Box<dyn ServerControl>,
    pub api: Arc<dyn InferenceApi>,
}

impl AppContext {
    pub fn new(config: LamaConfig) -> Self {
        let server = Box::new(ServerManager::new(&config));
        let api = Arc::new(OllamaClient::new(config.base_url.clone()));
        Self {
            config,
            server,
            api,
        }
    }
}

/// The user-facing side of a run: prompts, model picker and chat screen.
#[async_trait]
pub trait Frontend: Send {
    /// Plain status line for the user.
    fn notify(&mut self, message: &str);

    /// Asked when the server is installed but not running.
    async fn confirm_start(&mut self) -> Result<bool>;

    /// Asked before the `stop` command kills the server by process name.
    async fn confirm_stop_by_name(&mut self) -> Result<bool>;

    /// `None` means the user backed out of selection.
    async fn select_model(&mut self, models: &[ModelDescriptor]) -> Result<Option<ModelDescriptor>>;

    /// Drives the chat until the session terminates.
    async fn run_chat(&mut self, driver: ChatDriver) -> Result<ExitSignal>;
}

pub struct SessionController<F: Frontend> {
    ctx: AppContext,
    frontend: F,
}

impl<F: Frontend> SessionController<F> {
    pub fn new(ctx: AppContext, frontend: F) -> Self {
        Self { ctx, frontend }
    }

    pub fn context(&self) -> &AppContext {
        &self.ctx
    }

    pub fn frontend(&self) -> &F {
        &self.frontend
    }

    /// One full run: server checks, the select/chat loop, then cleanup of a
    /// server this run started. Backing out of model selection or declining
    /// to start the server is a normal exit.
    pub async fn run(&mut self) -> Result<()> {
        let outcome = match self.ensure_server().await {
            Ok(()) => {
                self.frontend.notify("Welcome to lamachat! Ollama server is running and ready.");
                self.chat_loop().await
            }
            Err(e) => Err(e),
        };
        self.shutdown().await;

        match outcome {
            Err(e) if e.is_user_quit() => {
                self.frontend.notify("Exiting lamachat. Goodbye!");
                Ok(())
            }
            Err(Error::ServerNotRunning) => {
                info!("server start declined");
                Ok(())
            }
            other => other,
        }
    }

    async fn ensure_server(&mut self) -> Result<()> {
        if !self.ctx.server.check_installed() {
            self.frontend
                .notify("Ollama is not installed. Installing Ollama is required to use lamachat.");
            let guidance = self.ctx.server.request_install()?;
            self.frontend.notify(&guidance);
            self.frontend.notify("Please install Ollama and run it before starting lamachat.");
            return Err(Error::NotInstalled);
        }

        if !self.ctx.server.is_running().await {
            if !self.frontend.confirm_start().await? {
                self.frontend.notify(
                    "You can start it manually by running 'ollama serve' in a separate terminal.",
                );
                return Err(Error::ServerNotRunning);
            }
            self.frontend.notify("Starting Ollama server...");
            self.ctx.server.start_server().await?;
            self.frontend.notify("Ollama server started successfully!");
        }
        Ok(())
    }

    async fn chat_loop(&mut self) -> Result<()> {
        loop {
            let models = self.ctx.api.list_models().await?;
            if models.is_empty() {
                return Err(Error::NoModels);
            }

            let Some(model) = self.frontend.select_model(&models).await? else {
                return Err(Error::UserQuit);
            };
            info!(model = %model.name, "model selected");
            self.frontend.notify(&format!("Selected model: {}", model.name));

            let session =
                ChatSession::new(model.name.clone(), self.ctx.config.exit_command.clone());
            let driver = ChatDriver::new(
                session,
                Arc::clone(&self.ctx.api),
                self.ctx.config.request_timeout(),
            );
            match self.frontend.run_chat(driver).await? {
                ExitSignal::ReturnToSelection => {
                    self.frontend.notify("Returning to model selection...");
                }
                ExitSignal::Quit => return Ok(()),
            }
        }
    }

    /// Best effort: a failed stop is reported, never escalated.
    async fn shutdown(&mut self) {
        if !self.ctx.server.owned_by_us() {
            return;
        }
        self.frontend.notify("Stopping Ollama server...");
        match self.ctx.server.stop_server().await {
            Ok(()) => {
                info!("server stopped");
                self.frontend.notify("Ollama server stopped successfully.");
            }
            Err(e) => {
                warn!("failed to stop server: {e}");
                self.frontend.notify(&format!("Failed to stop Ollama server: {e}"));
            }
        }
    }
}

/// The standalone `stop` command. Runs in a fresh process with no tracked
/// child, so it falls back to a name-based kill once the user agrees.
pub async fn stop_command<F: Frontend>(
    ctx: &mut AppContext,
    frontend: &mut F,
    assume_yes: bool,
) -> Result<()> {
    if !ctx.server.is_running().await {
        frontend.notify("Ollama server is not running.");
        return Ok(());
    }
    if !assume_yes && !frontend.confirm_stop_by_name().await? {
        frontend.notify("Leaving the Ollama server running.");
        return Ok(());
    }
    frontend.notify("Stopping Ollama server...");
    ctx.server.stop_by_name().await?;
    frontend.notify("Ollama server stopped successfully.");
    Ok(())
}
