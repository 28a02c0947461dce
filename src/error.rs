/// Error handling module for MC Runner.
///
/// This module defines the error types used throughout the library.
/// Each variant maps onto one failure class of the supervision system:
/// setup problems that must be fixed before a server can start, session
/// conflicts between operator commands, and I/O on the persisted crash ledger.
///
/// # Example
///
/// ```
/// use mc_runner::error::{Error, Result};
///
/// fn handle_error(result: Result<()>) {
///     match result {
///         Ok(_) => println!("Operation succeeded"),
///         Err(Error::AlreadyRunning(name)) => println!("'{}' is already running", name),
///         Err(Error::NotRunning(name)) => println!("'{}' is not running", name),
///         Err(Error::ConfigValidation(msg)) => println!("Fix the profile first: {}", msg),
///         Err(e) => println!("Other error: {}", e),
///     }
/// }
/// ```
use thiserror::Error;

/// Errors that can occur in the mc-runner library.
///
/// None of these are fatal to the process running the management tool;
/// they are reported to the operator and only ever affect a single server
/// instance.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to parse configuration from a file or string.
    ///
    /// This error occurs when:
    /// - The configuration JSON or YAML is malformed
    /// - Required fields are missing
    /// - Field types are incorrect
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(String),

    /// Configuration parses but contains values that cannot work.
    ///
    /// This error occurs when:
    /// - No instances are configured
    /// - The crash limit is zero
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    /// A server profile failed validation before start.
    ///
    /// This error occurs when:
    /// - The Java executable or the server JAR does not exist
    /// - Memory arguments are malformed
    /// - The instance name cannot be used as a session name
    /// - The installed Java runtime is older than the server requires
    #[error("Config validation error: {0}")]
    ConfigValidation(String),

    /// The server process could not be launched at all.
    ///
    /// This is a setup failure, not a crash: it never counts against the
    /// crash ledger.
    #[error("Setup error: {0}")]
    Setup(String),

    /// Reading or writing the persisted crash ledger failed.
    #[error("Crash ledger error: {0}")]
    Ledger(String),

    /// Error while waiting on or inspecting a server process.
    #[error("Server process error: {0}")]
    Process(String),

    /// The detached session facility (tmux) failed or misbehaved.
    #[error("Session error: {0}")]
    Session(String),

    /// A session with this name already exists.
    ///
    /// Starting an instance twice is rejected without touching the ledger or
    /// spawning a second process.
    #[error("Server '{0}' is already running")]
    AlreadyRunning(String),

    /// No session with this name exists.
    ///
    /// Returned by stop and attach when the instance is not running.
    #[error("Server '{0}' is not running")]
    NotRunning(String),

    /// The crash limit was reached and auto-restart stays off until an
    /// operator resets the ledger.
    #[error("Auto-restart for '{0}' is disabled after repeated crashes; run `mc-runner reset {0}` to re-enable it")]
    AutoRestartDisabled(String),

    /// Requested instance was not found in the configuration.
    #[error("Instance not found: {0}")]
    InstanceNotFound(String),

    /// Operation timed out.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Any other error not covered by the above categories.
    #[error("Other error: {0}")]
    Other(String),
}

/// Result type for mc-runner operations.
///
/// This is a convenience type alias for `std::result::Result` with the `Error` type
/// from this module.
pub type Result<T> = std::result::Result<T, Error>;
