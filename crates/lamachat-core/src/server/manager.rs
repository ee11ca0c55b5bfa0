use super::control::ServerControl;
use crate::api::probe;
use crate::config::LamaConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

/// How long the server gets to shut its runners down after SIGTERM.
#[cfg(unix)]
const STOP_GRACE: Duration = Duration::from_secs(5);

/// Owns the `ollama serve` child this process spawned, if any.
pub struct ServerManager {
    binary: String,
    base_url: String,
    probe_client: Client,
    probe_timeout: Duration,
    start_attempts: u32,
    start_interval: Duration,
    child: Option<Child>,
    owned_by_us: bool,
}

impl ServerManager {
    pub fn new(config: &LamaConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            base_url: config.base_url.clone(),
            probe_client: Client::new(),
            probe_timeout: config.probe_timeout(),
            start_attempts: config.start_attempts.max(1),
            start_interval: config.start_interval(),
            child: None,
            owned_by_us: false,
        }
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(|c| c.id())
    }

    fn spawn_serve(&self) -> Result<Child> {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("serve")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(false);
        // Own process group so terminal signals aimed at us don't reach it.
        #[cfg(unix)]
        cmd.process_group(0);
        cmd.spawn()
            .map_err(|e| Error::ServerStartFailed(format!("{}: {e}", self.binary)))
    }

    fn kill_by_name_command(&self) -> Command {
        let name = Path::new(&self.binary)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.binary.clone());
        if cfg!(windows) {
            let mut cmd = Command::new("taskkill");
            cmd.args(["/F", "/IM", name.as_str()]);
            cmd
        } else {
            let mut cmd = Command::new("pkill");
            cmd.arg("-x").arg(name);
            cmd
        }
    }
}

/// Sends `signal` to every process in the group led by `pid`. A group that
/// is already gone counts as delivered.
#[cfg(unix)]
fn signal_group(pid: u32, signal: libc::c_int) -> std::io::Result<()> {
    let pgid = libc::pid_t::try_from(pid).map_err(|_| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "pid out of range")
    })?;
    // A negative pid addresses the whole process group.
    if unsafe { libc::kill(-pgid, signal) } == 0 {
        return Ok(());
    }
    let err = std::io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::ESRCH) {
        Ok(())
    } else {
        Err(err)
    }
}

/// Stops `child` together with every process it started, then reaps it.
async fn terminate(mut child: Child) -> Result<()> {
    let stop_err = |e: std::io::Error| Error::ServerStopFailed(e.to_string());
    let Some(pid) = child.id() else {
        // Already reaped.
        return Ok(());
    };

    #[cfg(unix)]
    {
        signal_group(pid, libc::SIGTERM).map_err(stop_err)?;
        match tokio::time::timeout(STOP_GRACE, child.wait()).await {
            Ok(status) => {
                let status = status.map_err(stop_err)?;
                debug!(pid, %status, "server exited");
            }
            Err(_) => {
                warn!(pid, "server ignored SIGTERM, killing its process group");
                signal_group(pid, libc::SIGKILL).map_err(stop_err)?;
                child.wait().await.map_err(stop_err)?;
            }
        }
        // Runners may outlive the leader; sweep whatever is left in the group.
        signal_group(pid, libc::SIGKILL).map_err(stop_err)?;
    }

    #[cfg(not(unix))]
    {
        let pid = pid.to_string();
        let tree = Command::new("taskkill")
            .args(["/T", "/F", "/PID", pid.as_str()])
            .status()
            .await;
        if !matches!(tree, Ok(status) if status.success()) {
            child.kill().await.map_err(stop_err)?;
        }
        child.wait().await.map_err(stop_err)?;
    }

    Ok(())
}

/// Resolves `binary` the way a shell would: paths are checked directly,
/// bare names are searched for in every `PATH` entry.
pub fn find_on_path(binary: &str) -> Option<PathBuf> {
    let candidate = Path::new(binary);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path).find_map(|dir| {
        let full = dir.join(binary);
        if full.is_file() {
            return Some(full);
        }
        if cfg!(windows) && candidate.extension().is_none() {
            let exe = dir.join(format!("{binary}.exe"));
            if exe.is_file() {
                return Some(exe);
            }
        }
        None
    })
}

#[async_trait]
impl ServerControl for ServerManager {
    fn check_installed(&self) -> bool {
        let found = find_on_path(&self.binary);
        debug!(binary = %self.binary, ?found, "install check");
        found.is_some()
    }

    async fn is_running(&self) -> bool {
        probe(&self.probe_client, &self.base_url, self.probe_timeout).await
    }

    async fn start_server(&mut self) -> Result<()> {
        let child = self.spawn_serve()?;
        info!(pid = ?child.id(), binary = %self.binary, "spawned server");
        self.child = Some(child);

        for attempt in 1..=self.start_attempts {
            if self.is_running().await {
                self.owned_by_us = true;
                info!(attempt, "server is up");
                return Ok(());
            }
            if let Some(child) = self.child.as_mut() {
                if let Ok(Some(status)) = child.try_wait() {
                    self.child = None;
                    return Err(Error::ServerStartFailed(format!(
                        "server exited early with {status}"
                    )));
                }
            }
            debug!(attempt, "server not ready yet");
            tokio::time::sleep(self.start_interval).await;
        }

        if let Some(child) = self.child.take() {
            if let Err(e) = terminate(child).await {
                warn!(error = %e, "could not clean up unhealthy server");
            }
        }
        Err(Error::ServerStartTimeout {
            attempts: self.start_attempts,
        })
    }

    async fn stop_server(&mut self) -> Result<()> {
        let result = match self.child.take() {
            Some(child) => {
                info!(pid = ?child.id(), "stopping server");
                terminate(child).await
            }
            None => Err(Error::NoTrackedServer),
        };
        self.owned_by_us = false;
        result
    }

    async fn stop_by_name(&mut self) -> Result<()> {
        let mut cmd = self.kill_by_name_command();
        warn!(binary = %self.binary, "stopping server by process name");
        let result = match cmd.status().await {
            Ok(status) if status.success() => Ok(()),
            Ok(status) => Err(Error::ServerStopFailed(format!(
                "kill command exited with {status}"
            ))),
            Err(e) => Err(Error::ServerStopFailed(e.to_string())),
        };
        self.child = None;
        self.owned_by_us = false;
        result
    }

    fn owned_by_us(&self) -> bool {
        self.owned_by_us
    }
}
