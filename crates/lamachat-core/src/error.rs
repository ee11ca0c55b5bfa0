use thiserror::Error;

/// Everything that can go wrong while driving the inference server.
///
/// `UserQuit` is not a failure: it is how a cancelled model selection
/// travels back up to the binary, which maps it to a clean exit.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Ollama is not installed")]
    NotInstalled,

    #[error("unsupported operating system: {0}")]
    UnsupportedPlatform(String),

    #[error("Ollama server is not running")]
    ServerNotRunning,

    #[error("failed to start Ollama server: {0}")]
    ServerStartFailed(String),

    #[error("Ollama server did not start within {attempts} health checks")]
    ServerStartTimeout { attempts: u32 },

    #[error("failed to stop Ollama server: {0}")]
    ServerStopFailed(String),

    /// A stop was requested but this process never started the server.
    #[error("no server process was started by this session")]
    NoTrackedServer,

    #[error("failed to get available models: {0}")]
    CatalogUnavailable(String),

    #[error("no models installed; pull one with `ollama pull <model>`")]
    NoModels,

    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("user quit")]
    UserQuit,

    #[error("config error: {0}")]
    Config(String),

    #[error("terminal error: {0}")]
    Terminal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn is_user_quit(&self) -> bool {
        matches!(self, Error::UserQuit)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_quit_is_flagged() {
        assert!(Error::UserQuit.is_user_quit());
        assert!(!Error::NotInstalled.is_user_quit());
    }

    #[test]
    fn start_timeout_mentions_attempts() {
        let err = Error::ServerStartTimeout { attempts: 10 };
        assert!(err.to_string().contains("10 health checks"));
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io.into();
        assert!(err.to_string().starts_with("IO error"));
    }
}
