use crate::error::{Error, Result};
use async_trait::async_trait;

/// Lifecycle operations the controller needs from the local server.
#[async_trait]
pub trait ServerControl: Send + Sync {
    fn check_installed(&self) -> bool;

    /// Platform-specific install instructions. Never installs anything.
    fn request_install(&self) -> Result<String> {
        install_guidance(std::env::consts::OS)
    }

    /// Bounded reachability probe; unreachable or slow means `false`.
    async fn is_running(&self) -> bool;

    async fn start_server(&mut self) -> Result<()>;

    /// Stops the server this process started. Clears ownership whether or
    /// not the stop succeeded.
    async fn stop_server(&mut self) -> Result<()>;

    /// Kills every process matching the server binary's name. Only for the
    /// standalone `stop` command, after the user confirmed.
    async fn stop_by_name(&mut self) -> Result<()>;

    fn owned_by_us(&self) -> bool;
}

pub fn install_guidance(os: &str) -> Result<String> {
    match os {
        "macos" | "linux" => Ok("To install Ollama, run the following command in your terminal:\n\
             curl -fsSL https://ollama.com/install.sh | sh"
            .to_string()),
        "windows" => Ok(
            "To install Ollama on Windows, download the installer from https://ollama.com/download"
                .to_string(),
        ),
        other => Err(Error::UnsupportedPlatform(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unix_guidance_has_install_script() {
        for os in ["linux", "macos"] {
            let text = install_guidance(os).unwrap();
            assert!(text.contains("install.sh"), "{os}: {text}");
        }
    }

    #[test]
    fn windows_guidance_points_to_download() {
        assert!(install_guidance("windows").unwrap().contains("ollama.com/download"));
    }

    #[test]
    fn unknown_os_is_unsupported() {
        let err = install_guidance("plan9").unwrap_err();
        assert!(matches!(err, Error::UnsupportedPlatform(ref os) if os == "plan9"));
    }
}
