use crate::error::{Error, Result};
use crate::profile::ServerProfile;
use async_process::{Child, Command, Stdio};
use async_trait::async_trait;
use std::fmt;
use std::process::ExitStatus;

/// How a server process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitOutcome {
    /// Exit code, if the process exited normally
    pub code: Option<i32>,
    /// Terminating signal, if the process was killed by one
    pub signal: Option<i32>,
}

impl ExitOutcome {
    /// Outcome of a process that exited with `code`.
    pub fn code(code: i32) -> Self {
        Self {
            code: Some(code),
            signal: None,
        }
    }

    /// Outcome of a process killed by `signal`.
    pub fn signal(signal: i32) -> Self {
        Self {
            code: None,
            signal: Some(signal),
        }
    }

    /// Code 0 is the server's own orderly stop; everything else is a crash.
    pub fn is_clean(&self) -> bool {
        self.code == Some(0)
    }

    fn from_status(status: ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = {
            use std::os::unix::process::ExitStatusExt;
            status.signal()
        };
        #[cfg(not(unix))]
        let signal = None;

        Self {
            code: status.code(),
            signal,
        }
    }
}

impl fmt::Display for ExitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code, self.signal) {
            (Some(code), _) => write!(f, "exit code {}", code),
            (None, Some(signal)) => write!(f, "signal {}", signal),
            (None, None) => f.write_str("unknown exit status"),
        }
    }
}

/// A launched server process.
#[async_trait]
pub trait RunningServer: Send {
    /// OS process id, when known
    fn pid(&self) -> Option<u32>;

    /// Blocks until the process exits
    async fn wait(&mut self) -> Result<ExitOutcome>;
}

/// Launches server processes for the supervisor.
///
/// A failure to launch must be reported as `Error::Setup`; it is never
/// counted as a crash.
#[async_trait]
pub trait Launcher: Send + Sync {
    async fn spawn(&self, profile: &ServerProfile) -> Result<Box<dyn RunningServer>>;
}

/// Launches the profile's Java command with the console passed through.
///
/// stdin, stdout and stderr are inherited so the server console stays
/// interactive inside the session.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessLauncher;

struct ChildServer {
    child: Child,
}

#[async_trait]
impl RunningServer for ChildServer {
    fn pid(&self) -> Option<u32> {
        Some(self.child.id())
    }

    async fn wait(&mut self) -> Result<ExitOutcome> {
        let status = self
            .child
            .status()
            .await
            .map_err(|e| Error::Process(format!("Failed to wait for server process: {}", e)))?;
        Ok(ExitOutcome::from_status(status))
    }
}

#[async_trait]
impl Launcher for ProcessLauncher {
    async fn spawn(&self, profile: &ServerProfile) -> Result<Box<dyn RunningServer>> {
        let mut command = Command::new(&profile.java_path);
        command
            .args(profile.args())
            .current_dir(&profile.working_dir)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let child = command.spawn().map_err(|e| {
            Error::Setup(format!(
                "Failed to start {}: {}",
                profile.java_path.display(),
                e
            ))
        })?;

        Ok(Box::new(ChildServer { child }))
    }
}
