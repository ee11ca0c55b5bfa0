use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Runtime settings for talking to (and babysitting) the Ollama server.
///
/// Example `~/.lamachat/config.json`:
/// ```json
/// {
///   "base_url": "http://localhost:11434",
///   "start_attempts": 20,
///   "request_timeout_secs": 600
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LamaConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Executable looked up on `PATH` and spawned with `serve`.
    #[serde(default = "default_binary")]
    pub binary: String,
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    #[serde(default = "default_start_attempts")]
    pub start_attempts: u32,
    #[serde(default = "default_start_interval_ms")]
    pub start_interval_ms: u64,
    /// Deadline for a single generation request. 0 disables it.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// In-band chat command that ends the session (matched case-insensitively).
    #[serde(default = "default_exit_command")]
    pub exit_command: String,
}

fn default_base_url() -> String {
    std::env::var("LAMACHAT_HOST")
        .or_else(|_| std::env::var("OLLAMA_HOST"))
        .map(|h| normalize_base_url(&h))
        .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string())
}

fn default_binary() -> String {
    if cfg!(windows) {
        "ollama.exe".to_string()
    } else {
        "ollama".to_string()
    }
}

fn default_probe_timeout_ms() -> u64 {
    2_000
}

fn default_start_attempts() -> u32 {
    10
}

fn default_start_interval_ms() -> u64 {
    1_000
}

fn default_request_timeout_secs() -> u64 {
    300
}

fn default_exit_command() -> String {
    "/exit".to_string()
}

impl Default for LamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            binary: default_binary(),
            probe_timeout_ms: default_probe_timeout_ms(),
            start_attempts: default_start_attempts(),
            start_interval_ms: default_start_interval_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            exit_command: default_exit_command(),
        }
    }
}

const DEFAULT_PORT: u16 = 11434;

/// `OLLAMA_HOST` is commonly set as a bare `host` or `host:port`; give it a
/// scheme and Ollama's port when missing, and drop any trailing slash so
/// paths can be appended directly.
pub fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    let (scheme, rest) = match trimmed.split_once("://") {
        Some((scheme, rest)) => (scheme, rest),
        None => ("http", trimmed),
    };
    let (authority, path) = match rest.find('/') {
        Some(i) => rest.split_at(i),
        None => (rest, ""),
    };
    // IPv6 literals carry colons of their own; only look past the bracket.
    let host_tail = authority.rsplit_once(']').map_or(authority, |(_, tail)| tail);
    if authority.is_empty() || host_tail.contains(':') {
        format!("{scheme}://{authority}{path}")
    } else {
        format!("{scheme}://{authority}:{DEFAULT_PORT}{path}")
    }
}

impl LamaConfig {
    pub fn load() -> Result<Self> {
        let local = std::env::current_dir()
            .ok()
            .map(|d| d.join(".lamachat.json"));
        Self::load_from(&Self::resolve_path("config.json"), local.as_deref())
    }

    /// Reads the global file (or defaults), then shallow-merges the keys of
    /// the local override file on top of it.
    pub fn load_from(global: &Path, local: Option<&Path>) -> Result<Self> {
        let mut config = if global.exists() {
            let data = std::fs::read_to_string(global)?;
            serde_json::from_str::<LamaConfig>(&data)?
        } else {
            LamaConfig::default()
        };

        if let Some(local) = local.filter(|p| p.exists()) {
            let data = std::fs::read_to_string(local)?;
            let override_val: serde_json::Value = serde_json::from_str(&data)?;
            let mut base = serde_json::to_value(&config)?;
            if let (Some(base_obj), Some(over_obj)) =
                (base.as_object_mut(), override_val.as_object())
            {
                for (k, v) in over_obj {
                    base_obj.insert(k.clone(), v.clone());
                }
            }
            config = serde_json::from_value(base)?;
        }

        config.base_url = normalize_base_url(&config.base_url);
        if config.exit_command.trim().is_empty() {
            warn!("blank exit_command in config, using {}", default_exit_command());
            config.exit_command = default_exit_command();
        }
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = normalize_base_url(base_url);
        self
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn start_interval(&self) -> Duration {
        Duration::from_millis(self.start_interval_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }

    pub fn resolve_path(relative: &str) -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".lamachat")
            .join(relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_files_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = LamaConfig::load_from(&dir.path().join("nope.json"), None).unwrap();
        assert_eq!(cfg.start_attempts, 10);
        assert_eq!(cfg.probe_timeout(), Duration::from_secs(2));
        assert_eq!(cfg.exit_command, "/exit");
    }

    #[test]
    fn local_file_overrides_global_keys() {
        let dir = tempfile::tempdir().unwrap();
        let global = dir.path().join("config.json");
        let local = dir.path().join(".lamachat.json");
        std::fs::write(
            &global,
            r#"{"base_url": "http://gpu-box:11434/", "start_attempts": 3}"#,
        )
        .unwrap();
        std::fs::write(&local, r#"{"start_attempts": 7}"#).unwrap();

        let cfg = LamaConfig::load_from(&global, Some(&local)).unwrap();
        assert_eq!(cfg.base_url, "http://gpu-box:11434");
        assert_eq!(cfg.start_attempts, 7);
        assert_eq!(cfg.start_interval_ms, 1_000);
    }

    #[test]
    fn invalid_json_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let global = dir.path().join("config.json");
        std::fs::write(&global, "{not json").unwrap();
        let err = LamaConfig::load_from(&global, None).unwrap_err();
        assert!(err.to_string().starts_with("config error"));
    }

    #[test]
    fn bare_host_gets_scheme() {
        assert_eq!(normalize_base_url("127.0.0.1:11434"), "http://127.0.0.1:11434");
        assert_eq!(normalize_base_url("https://x.local:8443/"), "https://x.local:8443");
    }

    #[test]
    fn missing_port_defaults_to_ollama_port() {
        assert_eq!(normalize_base_url("0.0.0.0"), "http://0.0.0.0:11434");
        assert_eq!(normalize_base_url("https://host"), "https://host:11434");
        assert_eq!(normalize_base_url("http://host/ollama/"), "http://host:11434/ollama");
        assert_eq!(normalize_base_url("[::1]"), "http://[::1]:11434");
        assert_eq!(normalize_base_url("[::1]:9000"), "http://[::1]:9000");
    }

    #[test]
    fn blank_exit_command_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let global = dir.path().join("config.json");
        std::fs::write(&global, r#"{"exit_command": "   "}"#).unwrap();
        let cfg = LamaConfig::load_from(&global, None).unwrap();
        assert_eq!(cfg.exit_command, "/exit");
    }

    #[test]
    fn zero_request_timeout_disables_deadline() {
        let cfg = LamaConfig {
            request_timeout_secs: 0,
            ..LamaConfig::default()
        };
        assert!(cfg.request_timeout().is_none());
    }
}
