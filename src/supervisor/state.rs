use std::fmt;
use uuid::Uuid;

/// Unique identifier for one supervisor invocation.
///
/// Every line the supervisor logs carries this id, so restarts of the
/// supervisor itself can be told apart in the instance log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunId(Uuid);

impl RunId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// State of the supervisor loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    /// Launching the server process
    Starting,
    /// Server process is running
    Running,
    /// Server exited with code 0
    ExitedClean,
    /// Server exited with any other code or a signal
    ExitedCrash,
    /// Waiting out the restart delay
    RestartPending,
    /// Crash limit reached, or already reached before this run
    Disabled,
    /// Server process could not be launched
    SetupFailed,
}

impl SupervisorState {
    /// Whether the loop stops in this state.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::ExitedClean | Self::Disabled | Self::SetupFailed)
    }
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Starting => "STARTING",
            Self::Running => "RUNNING",
            Self::ExitedClean => "EXITED_CLEAN",
            Self::ExitedCrash => "EXITED_CRASH",
            Self::RestartPending => "RESTART_PENDING",
            Self::Disabled => "DISABLED",
            Self::SetupFailed => "SETUP_FAILED",
        };
        f.write_str(name)
    }
}

/// How a supervisor run ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalState {
    /// The server stopped itself cleanly; no restart.
    ExitedClean,
    /// Auto-restart is disabled until an operator resets the ledger.
    Disabled,
}
