use crate::config::SupervisorConfig;
use crate::error::{Error, Result};
use crate::ledger::CrashLedger;
use crate::profile::ServerProfile;
use crate::supervisor::launcher::{Launcher, ProcessLauncher};
use crate::supervisor::lifecycle::TransitionLog;
use crate::supervisor::{RunId, SupervisorState, TerminalState};
use std::sync::Arc;

/// Runs one server instance until it stops cleanly or its crash budget is spent.
///
/// The loop is single-threaded: it only ever waits on the child process or on
/// the restart delay. Each run checks the persisted ledger first, so a server
/// whose auto-restart was disabled stays down across supervisor restarts and
/// host reboots until an operator resets the ledger.
pub struct ProcessSupervisor<L = ProcessLauncher> {
    name: String,
    profile: ServerProfile,
    config: SupervisorConfig,
    ledger: CrashLedger,
    launcher: L,
    transitions: Arc<TransitionLog>,
    run_id: RunId,
}

impl ProcessSupervisor<ProcessLauncher> {
    /// Supervisor for `profile` with its ledger in the profile's working directory.
    pub fn new(profile: ServerProfile, config: SupervisorConfig) -> Self {
        let ledger = CrashLedger::new(&profile.working_dir);
        Self::with_parts(profile, config, ledger, ProcessLauncher)
    }
}

impl<L: Launcher> ProcessSupervisor<L> {
    /// Supervisor with an explicit ledger and launcher.
    pub fn with_parts(
        profile: ServerProfile,
        config: SupervisorConfig,
        ledger: CrashLedger,
        launcher: L,
    ) -> Self {
        let name = profile.session_name().unwrap_or("server").to_string();
        Self {
            name,
            profile,
            config,
            ledger,
            launcher,
            transitions: Arc::new(TransitionLog::new()),
            run_id: RunId::new(),
        }
    }

    /// Id of this supervisor run.
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Transition history of this supervisor.
    pub fn transitions(&self) -> Arc<TransitionLog> {
        Arc::clone(&self.transitions)
    }

    /// The crash ledger this supervisor writes to.
    pub fn ledger(&self) -> &CrashLedger {
        &self.ledger
    }

    fn transition(&self, state: SupervisorState, details: Option<String>) -> Result<()> {
        self.transitions
            .record(self.run_id, &self.name, state, details)
    }

    /// Runs the restart loop.
    ///
    /// Returns the terminal state on a clean exit or when auto-restart is
    /// disabled. A process that cannot be launched ends the loop with
    /// `Error::Setup` and leaves the ledger untouched.
    #[tracing::instrument(skip(self), fields(run_id = %self.run_id, server = %self.name))]
    pub async fn run(&self) -> Result<TerminalState> {
        if self.ledger.is_auto_restart_disabled() {
            self.transition(
                SupervisorState::Disabled,
                Some(format!(
                    "Auto-restart is disabled after repeated crashes. Run `mc-runner reset {}` to clear it, then start the server again.",
                    self.name
                )),
            )?;
            return Ok(TerminalState::Disabled);
        }

        let policy = self.config.crash_policy();
        tracing::info!(
            max_crashes = policy.max_crashes,
            window_seconds = policy.window_seconds,
            restart_delay_seconds = self.config.restart_delay_seconds,
            "Supervisor started"
        );

        loop {
            self.transition(
                SupervisorState::Starting,
                Some(self.profile.command_line()),
            )?;

            let mut server = match self.launcher.spawn(&self.profile).await {
                Ok(server) => server,
                Err(e) => {
                    let e = match e {
                        Error::Setup(_) => e,
                        other => Error::Setup(other.to_string()),
                    };
                    self.transition(SupervisorState::SetupFailed, Some(e.to_string()))?;
                    return Err(e);
                }
            };

            let pid = server
                .pid()
                .map_or_else(|| "pid unknown".to_string(), |pid| format!("pid {}", pid));
            self.transition(SupervisorState::Running, Some(pid))?;

            let outcome = server.wait().await?;

            if outcome.is_clean() {
                self.transition(
                    SupervisorState::ExitedClean,
                    Some("Server stopped cleanly; not restarting".to_string()),
                )?;
                return Ok(TerminalState::ExitedClean);
            }

            self.transition(
                SupervisorState::ExitedCrash,
                Some(format!("Server crashed ({})", outcome)),
            )?;

            let decision = self.ledger.record_crash(&policy)?;
            let tally = format!(
                "crash {} of {} within a {}s window",
                decision.crash_count, policy.max_crashes, policy.window_seconds
            );

            if !decision.continue_allowed {
                self.transition(
                    SupervisorState::Disabled,
                    Some(format!(
                        "Too many crashes ({}); auto-restart disabled. Run `mc-runner reset {}` to clear it.",
                        tally, self.name
                    )),
                )?;
                return Ok(TerminalState::Disabled);
            }

            self.transition(
                SupervisorState::RestartPending,
                Some(format!(
                    "Restarting in {}s ({})",
                    self.config.restart_delay_seconds, tally
                )),
            )?;
            tokio::time::sleep(self.config.restart_delay()).await;
        }
    }
}
