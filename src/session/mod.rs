//! Detached session hosting for supervised servers.
//!
//! Each running instance lives in one tmux session named after its
//! directory. Starting an instance whose session already exists is refused,
//! which is what keeps two supervisors off the same instance.
//!
//! # Examples
//!
//! ```no_run
//! use mc_runner::config::SupervisorConfig;
//! use mc_runner::profile::ServerProfile;
//! use mc_runner::session::{SessionConfig, SessionHost, SupervisorCommand, TmuxBackend};
//!
//! # async fn run() -> mc_runner::Result<()> {
//! let command = SupervisorCommand::current_exe(SupervisorConfig::default())?;
//! let host = SessionHost::new(TmuxBackend::default(), SessionConfig::default(), command);
//!
//! let profile = ServerProfile::load("/srv/minecraft/survival")?;
//! host.start("survival", &profile).await?;
//! println!("{:?}", host.status("survival").await?);
//! host.stop("survival").await?;
//! # Ok(())
//! # }
//! ```
pub mod backend;
mod host;

pub use backend::{SessionBackend, SessionInfo, TmuxBackend};
pub use host::{SessionConfig, SessionHost, SessionStatus, StopOutcome, SupervisorCommand};
