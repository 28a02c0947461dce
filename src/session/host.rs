use crate::config::{SessionSettings, SupervisorConfig};
use crate::error::{Error, Result};
use crate::ledger::{Clock, SystemClock};
use crate::profile::ServerProfile;
use crate::session::backend::{SessionBackend, TmuxBackend};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, sleep};

/// Interval between checks while waiting for a new session to appear.
const STARTUP_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Timing and messages used by `SessionHost`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub stop_timeout: Duration,
    pub grace_delay: Duration,
    pub poll_interval: Duration,
    pub startup_timeout: Duration,
    pub warning_message: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from(&SessionSettings::default())
    }
}

impl From<&SessionSettings> for SessionConfig {
    fn from(settings: &SessionSettings) -> Self {
        Self {
            stop_timeout: Duration::from_secs(settings.stop_timeout_seconds),
            grace_delay: Duration::from_secs(settings.grace_delay_seconds),
            poll_interval: Duration::from_millis(settings.poll_interval_millis.max(1)),
            startup_timeout: Duration::from_millis(settings.startup_timeout_millis),
            warning_message: settings.warning_message.clone(),
        }
    }
}

/// Command line that runs the supervisor inside a session.
///
/// The policy travels as flags so the detached supervisor needs nothing but
/// the materialized profile in the instance directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorCommand {
    program: PathBuf,
    config: SupervisorConfig,
}

impl SupervisorCommand {
    pub fn new(program: impl Into<PathBuf>, config: SupervisorConfig) -> Self {
        Self {
            program: program.into(),
            config,
        }
    }

    /// Command re-invoking the currently running executable.
    pub fn current_exe(config: SupervisorConfig) -> Result<Self> {
        let program = std::env::current_exe()
            .map_err(|e| Error::Other(format!("Failed to locate current executable: {}", e)))?;
        Ok(Self::new(program, config))
    }

    /// Full argv for supervising `profile`.
    pub fn argv(&self, profile: &ServerProfile) -> Vec<String> {
        vec![
            self.program.to_string_lossy().into_owned(),
            "supervise".to_string(),
            "--max-crashes".to_string(),
            self.config.max_crashes.to_string(),
            "--crash-window".to_string(),
            self.config.crash_window_seconds.to_string(),
            "--restart-delay".to_string(),
            self.config.restart_delay_seconds.to_string(),
            profile.working_dir.to_string_lossy().into_owned(),
        ]
    }
}

/// Whether a server's session is up, and for how long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStatus {
    pub running: bool,
    pub pid: Option<u32>,
    pub started_at: Option<i64>,
    pub uptime: Option<Duration>,
}

impl SessionStatus {
    fn stopped() -> Self {
        Self {
            running: false,
            pid: None,
            started_at: None,
            uptime: None,
        }
    }
}

/// How `stop` ended the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The server shut down on its own after the stop command.
    Graceful,
    /// The session outlived the stop timeout and was killed.
    Forced,
}

/// Maps server names to detached sessions and offers the operator verbs.
///
/// The existence of a session named after the instance is the only record
/// of whether that instance is running; there is no in-memory state shared
/// with the supervisor inside it.
pub struct SessionHost<B = TmuxBackend> {
    backend: B,
    config: SessionConfig,
    command: SupervisorCommand,
    clock: Arc<dyn Clock>,
}

impl<B: SessionBackend> SessionHost<B> {
    pub fn new(backend: B, config: SessionConfig, command: SupervisorCommand) -> Self {
        Self {
            backend,
            config,
            command,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the clock used for uptime.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Starts a detached session supervising `profile`.
    ///
    /// Returns once the session exists; the server inside may still be
    /// booting.
    #[tracing::instrument(skip(self, profile))]
    pub async fn start(&self, name: &str, profile: &ServerProfile) -> Result<()> {
        if self.backend.has_session(name).await? {
            tracing::warn!("Session already exists");
            return Err(Error::AlreadyRunning(name.to_string()));
        }

        profile.materialize()?;
        let argv = self.command.argv(profile);
        self.backend
            .new_session(name, &profile.working_dir, &argv)
            .await?;

        let deadline = Instant::now() + self.config.startup_timeout;
        loop {
            if self.backend.has_session(name).await? {
                tracing::info!("Session started");
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(Error::Timeout(format!(
                    "Session '{}' did not appear within {:?}",
                    name, self.config.startup_timeout
                )));
            }
            sleep(STARTUP_POLL_INTERVAL).await;
        }
    }

    /// Stops a running server: warning broadcast, grace delay, `stop`, then
    /// a bounded wait before the session is killed.
    #[tracing::instrument(skip(self))]
    pub async fn stop(&self, name: &str) -> Result<StopOutcome> {
        if !self.backend.has_session(name).await? {
            return Err(Error::NotRunning(name.to_string()));
        }

        tracing::info!("Broadcasting shutdown warning");
        let warning = format!("say {}", self.config.warning_message);
        if !self.send_while_present(name, &warning).await? {
            return Ok(StopOutcome::Graceful);
        }
        sleep(self.config.grace_delay).await;

        tracing::info!("Sending stop command");
        if !self.send_while_present(name, "stop").await? {
            return Ok(StopOutcome::Graceful);
        }

        let deadline = Instant::now() + self.config.stop_timeout;
        while Instant::now() < deadline {
            sleep(self.config.poll_interval).await;
            if !self.backend.has_session(name).await? {
                tracing::info!("Server stopped gracefully");
                return Ok(StopOutcome::Graceful);
            }
        }

        tracing::warn!(timeout = ?self.config.stop_timeout, "Server did not stop in time; killing session");
        match self.backend.kill_session(name).await {
            Ok(()) => Ok(StopOutcome::Forced),
            // Went away between the last poll and the kill.
            Err(Error::NotRunning(_)) => Ok(StopOutcome::Graceful),
            Err(e) => Err(e),
        }
    }

    /// Sends a console line; `false` if the session ended before it arrived.
    async fn send_while_present(&self, name: &str, line: &str) -> Result<bool> {
        match self.backend.send_line(name, line).await {
            Ok(()) => Ok(true),
            Err(Error::NotRunning(_)) => {
                tracing::info!("Session ended before shutdown completed");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Whether the server's session exists, with its pid and uptime.
    pub async fn status(&self, name: &str) -> Result<SessionStatus> {
        if !self.backend.has_session(name).await? {
            return Ok(SessionStatus::stopped());
        }

        let Some(info) = self.backend.session_info(name).await? else {
            return Ok(SessionStatus::stopped());
        };

        let now = self.clock.now();
        let uptime = info
            .created_at
            .and_then(|created| u64::try_from(now.saturating_sub(created)).ok())
            .map(Duration::from_secs);

        Ok(SessionStatus {
            running: true,
            pid: info.pid,
            started_at: info.created_at,
            uptime,
        })
    }

    /// Hands the terminal to the server's live console.
    #[tracing::instrument(skip(self))]
    pub async fn attach(&self, name: &str) -> Result<()> {
        if !self.backend.has_session(name).await? {
            return Err(Error::NotRunning(name.to_string()));
        }
        self.backend.attach(name).await
    }
}
