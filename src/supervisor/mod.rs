/// Process supervision for MC Runner.
///
/// This module runs a server process, classifies how it ended and decides,
/// with the crash ledger, whether to launch it again.
///
/// # Components
///
/// * `launcher` - Spawning the server with its console passed through
/// * `lifecycle` - Transition history written to the instance log
/// * `state` - Supervisor states and run identifiers
/// * `supervisor` - The restart loop
///
/// # State machine
///
/// ```text
/// STARTING -> RUNNING -> EXITED_CLEAN                     (terminal)
/// STARTING -> RUNNING -> EXITED_CRASH -> RESTART_PENDING -> STARTING
///                        EXITED_CRASH -> DISABLED         (terminal)
/// STARTING -> SETUP_FAILED                                (terminal, not a crash)
/// ```
///
/// # Examples
///
/// ```no_run
/// use mc_runner::config::SupervisorConfig;
/// use mc_runner::profile::ServerProfile;
/// use mc_runner::supervisor::{ProcessSupervisor, TerminalState};
///
/// # async fn run() -> mc_runner::Result<()> {
/// let profile = ServerProfile::load("/srv/minecraft/survival")?;
/// let supervisor = ProcessSupervisor::new(profile, SupervisorConfig::default());
///
/// match supervisor.run().await? {
///     TerminalState::ExitedClean => println!("server stopped"),
///     TerminalState::Disabled => println!("auto-restart disabled"),
/// }
/// # Ok(())
/// # }
/// ```
pub mod launcher;
pub mod lifecycle;
mod state;
#[allow(clippy::module_inception)]
mod supervisor;

pub use launcher::{ExitOutcome, Launcher, ProcessLauncher, RunningServer};
pub use lifecycle::{Transition, TransitionLog};
pub use state::{RunId, SupervisorState, TerminalState};
pub use supervisor::ProcessSupervisor;
