/*!
 # MC Runner

 A Rust library and CLI for supervising Minecraft server processes on a single host.

 ## Overview

 MC Runner provides functionality to:
 - Validate server profiles (Java executable, server JAR, memory arguments, Java version)
 - Run each server inside a detached tmux session that survives the operator's logout
 - Restart crashed servers, counting crashes in a sliding time window
 - Disable auto-restart permanently once the crash limit is hit, until an operator resets it
 - Stop servers gracefully through their own console, killing them only as a last resort

 ## Basic Usage

 ```no_run
 use mc_runner::{McRunner, Result};

 #[tokio::main]
 async fn main() -> Result<()> {
     // Create a runner from config file
     let runner = McRunner::from_config_file("mc-runner.json")?;

     // Start a server in its own detached session
     runner.start_server("survival").await?;

     // Inspect it
     let status = runner.server_status("survival").await?;
     println!("running: {}, crashes: {}", status.session.running, status.ledger.crash_count);

     // Stop it gracefully
     runner.stop_server("survival").await?;

     Ok(())
 }
 ```

 ## Features

 - **Crash Ledger**: Crash count, last crash time and the disabled flag persist in the instance directory
 - **Supervision**: Exit code 0 stops the loop, anything else is a crash subject to the window/limit policy
 - **Sessions**: One tmux session per instance, named after the instance directory
 - **Configuration**: JSON or YAML config files; runtime version requirements are data, not code

 ## License

 This project is licensed under the terms in the LICENSE file.
*/

pub mod cli;
pub mod config;
pub mod error;
pub mod ledger;
pub mod profile;
pub mod runtime;
pub mod session;
pub mod supervisor;

pub use config::Config;
pub use error::{Error, Result};
pub use ledger::{CrashLedger, LedgerStatus};
pub use profile::ServerProfile;
pub use session::{SessionHost, SessionStatus, StopOutcome};
pub use supervisor::{ProcessSupervisor, SupervisorState, TerminalState};

use config::SupervisorConfig;
use session::{SessionBackend, SessionConfig, SupervisorCommand, TmuxBackend};
use std::path::Path;

/// Combined view of one instance: its session and its crash ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceStatus {
    /// Instance name
    pub name: String,
    /// Session state
    pub session: SessionStatus,
    /// Crash ledger snapshot
    pub ledger: LedgerStatus,
}

/// Configure, start and control supervised Minecraft servers
///
/// This struct is the main entry point for operator tooling. It validates
/// profiles, hands them to the session host and reads the crash ledgers.
/// All public methods are instrumented with `tracing` spans.
pub struct McRunner<B = TmuxBackend> {
    /// Configuration
    config: Config,
    /// Session host running the supervisors
    host: SessionHost<B>,
}

impl McRunner<TmuxBackend> {
    /// Create a new runner from a configuration file path
    #[tracing::instrument(skip(path), fields(config_path = ?path.as_ref()))]
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self> {
        tracing::info!("Loading configuration from file");
        let config = Config::from_file(path)?;
        Self::new(config)
    }

    /// Create a new runner from a JSON configuration string
    #[tracing::instrument(skip(config))]
    pub fn from_config_str(config: &str) -> Result<Self> {
        tracing::info!("Loading configuration from string");
        let config = Config::parse_from_str(config)?;
        Self::new(config)
    }

    /// Create a new runner using tmux and the current executable as supervisor
    #[tracing::instrument(skip(config), fields(num_instances = config.instances.len()))]
    pub fn new(config: Config) -> Result<Self> {
        let backend = TmuxBackend::new(config.session.tmux_binary.clone());
        let command = SupervisorCommand::current_exe(config.supervisor)?;
        Ok(Self::with_backend(config, backend, command))
    }
}

impl<B: SessionBackend> McRunner<B> {
    /// Create a runner with an explicit session backend and supervisor command
    pub fn with_backend(config: Config, backend: B, command: SupervisorCommand) -> Self {
        let session_config = SessionConfig::from(&config.session);
        Self {
            host: SessionHost::new(backend, session_config, command),
            config,
        }
    }

    /// Create a runner around an already configured session host
    pub fn with_host(config: Config, host: SessionHost<B>) -> Self {
        Self { config, host }
    }

    /// The loaded configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The session host
    pub fn host(&self) -> &SessionHost<B> {
        &self.host
    }

    /// Configured instance names, sorted
    pub fn instance_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.config.instances.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Validate an instance's profile, including its Java runtime version
    #[tracing::instrument(skip(self))]
    pub async fn validate_instance(&self, name: &str) -> Result<&ServerProfile> {
        let profile = self.config.instance(name)?;
        config::validate_profile(name, profile)?;
        runtime::check_runtime(profile, &self.config.runtimes).await?;
        Ok(profile)
    }

    /// Validate and start an instance in a detached session
    #[tracing::instrument(skip(self), fields(server_name = %name))]
    pub async fn start_server(&self, name: &str) -> Result<()> {
        let profile = self.validate_instance(name).await.map_err(|e| {
            tracing::error!(error = %e, "Profile validation failed");
            e
        })?;

        if self.ledger(name)?.is_auto_restart_disabled() {
            tracing::error!("Auto-restart disabled; not starting");
            return Err(Error::AutoRestartDisabled(name.to_string()));
        }

        self.host.start(name, profile).await
    }

    /// Gracefully stop an instance, forcing it if it does not stop in time
    #[tracing::instrument(skip(self), fields(server_name = %name))]
    pub async fn stop_server(&self, name: &str) -> Result<StopOutcome> {
        self.config.instance(name)?;
        self.host.stop(name).await
    }

    /// Session state and crash ledger of an instance
    #[tracing::instrument(skip(self), fields(server_name = %name))]
    pub async fn server_status(&self, name: &str) -> Result<InstanceStatus> {
        let ledger = self.ledger(name)?;
        let session = self.host.status(name).await?;
        Ok(InstanceStatus {
            name: name.to_string(),
            session,
            ledger: ledger.status(),
        })
    }

    /// Attach the terminal to an instance's console
    #[tracing::instrument(skip(self), fields(server_name = %name))]
    pub async fn attach(&self, name: &str) -> Result<()> {
        self.config.instance(name)?;
        self.host.attach(name).await
    }

    /// Clear an instance's crash ledger, re-enabling auto-restart
    #[tracing::instrument(skip(self), fields(server_name = %name))]
    pub fn reset_crashes(&self, name: &str) -> Result<()> {
        self.ledger(name)?.reset()
    }

    /// Crash ledger of an instance
    pub fn ledger(&self, name: &str) -> Result<CrashLedger> {
        let profile = self.config.instance(name)?;
        Ok(CrashLedger::new(&profile.working_dir))
    }
}

/// Run the supervisor loop for the profile materialized in `dir`.
///
/// This is what a detached session executes.
#[tracing::instrument(skip_all, fields(dir = %dir.as_ref().display()))]
pub async fn supervise(dir: impl AsRef<Path>, config: SupervisorConfig) -> Result<TerminalState> {
    let profile = ServerProfile::load(dir.as_ref())?;
    ProcessSupervisor::new(profile, config).run().await
}
