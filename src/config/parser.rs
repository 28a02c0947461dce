use crate::error::{Error, Result};
use crate::ledger::CrashPolicy;
use crate::profile::ServerProfile;
use crate::runtime::RuntimePolicy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Crash and restart policy applied by the supervisor loop.
///
/// This is an immutable record handed to `ProcessSupervisor` and
/// `CrashLedger` at construction.
///
/// # Examples
///
/// ```
/// use mc_runner::config::SupervisorConfig;
///
/// let config = SupervisorConfig::default();
/// assert_eq!(config.max_crashes, 3);
/// assert_eq!(config.crash_window_seconds, 300);
/// assert_eq!(config.restart_delay_seconds, 10);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SupervisorConfig {
    /// Crashes inside one window that permanently disable auto-restart.
    pub max_crashes: u32,
    /// Width of the crash window in seconds.
    pub crash_window_seconds: u64,
    /// Pause between a crash and the next launch, in seconds.
    pub restart_delay_seconds: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            max_crashes: 3,
            crash_window_seconds: 300,
            restart_delay_seconds: 10,
        }
    }
}

impl SupervisorConfig {
    /// The ledger half of this configuration.
    pub fn crash_policy(&self) -> CrashPolicy {
        CrashPolicy {
            window_seconds: i64::try_from(self.crash_window_seconds).unwrap_or(i64::MAX),
            max_crashes: self.max_crashes,
        }
    }

    /// Restart delay as a `Duration`.
    pub fn restart_delay(&self) -> Duration {
        Duration::from_secs(self.restart_delay_seconds)
    }
}

/// Settings for the detached session that hosts a supervisor.
///
/// Converted into a `SessionConfig` by the session module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionSettings {
    /// How long `stop` waits for the session to disappear before killing it.
    pub stop_timeout_seconds: u64,
    /// Pause between the shutdown broadcast and the `stop` command.
    pub grace_delay_seconds: u64,
    /// Interval between session existence checks.
    pub poll_interval_millis: u64,
    /// How long `start` waits for the new session to show up.
    pub startup_timeout_millis: u64,
    /// Message broadcast in-game before a graceful stop.
    pub warning_message: String,
    /// tmux executable used for the session facility.
    pub tmux_binary: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            stop_timeout_seconds: 30,
            grace_delay_seconds: 10,
            poll_interval_millis: 1000,
            startup_timeout_millis: 2000,
            warning_message: "Server is shutting down in 10 seconds...".to_string(),
            tmux_binary: "tmux".to_string(),
        }
    }
}

/// Main configuration for MC Runner.
///
/// Holds every supervised server instance, keyed by instance name, plus the
/// supervisor, session and runtime policies shared by all of them.
///
/// # JSON Schema
///
/// ```json
/// {
///   "instances": {
///     "survival": {
///       "javaPath": "/usr/lib/jvm/java-21/bin/java",
///       "jvmArgs": ["-Xms1G", "-Xmx4G"],
///       "jar": "server.jar",
///       "workingDir": "/srv/minecraft/survival",
///       "minecraftVersion": "1.21.1"
///     }
///   },
///   "supervisor": { "maxCrashes": 3, "crashWindowSeconds": 300, "restartDelaySeconds": 10 },
///   "session": { "stopTimeoutSeconds": 30 },
///   "runtimes": [ { "minecraft": "1.20.5", "java": 21 } ]
/// }
/// ```
///
/// # Examples
///
/// ```
/// use mc_runner::config::Config;
///
/// let config = Config::parse_from_str(r#"{
///     "instances": {
///         "lobby": {
///             "javaPath": "/usr/bin/java",
///             "jvmArgs": ["-Xmx2G"],
///             "jar": "paper.jar",
///             "workingDir": "/srv/minecraft/lobby"
///         }
///     }
/// }"#).unwrap();
///
/// assert_eq!(config.instances["lobby"].jar, "paper.jar");
/// assert_eq!(config.supervisor.max_crashes, 3);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Map of instance names to their server profiles.
    /// The name doubles as the session name and must equal the base name
    /// of the profile's working directory.
    pub instances: HashMap<String, ServerProfile>,

    /// Crash/restart policy.
    #[serde(default)]
    pub supervisor: SupervisorConfig,

    /// Detached session behaviour.
    #[serde(default)]
    pub session: SessionSettings,

    /// Minimum Java major version per Minecraft version.
    #[serde(default)]
    pub runtimes: RuntimePolicy,
}

impl Config {
    /// Loads a configuration from a file path.
    ///
    /// Files ending in `.yaml` or `.yml` are parsed as YAML, everything else
    /// as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// * The file cannot be read
    /// * The file contents are not valid JSON/YAML
    /// * The document does not conform to the expected schema
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigParse(format!("Failed to read config file: {}", e)))?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Self::parse_from_yaml_str(&content),
            _ => Self::parse_from_str(&content),
        }
    }

    /// Parses a configuration from a JSON string.
    pub fn parse_from_str(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| Error::ConfigParse(format!("Failed to parse JSON config: {}", e)))
    }

    /// Parses a configuration from a YAML string.
    pub fn parse_from_yaml_str(content: &str) -> Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| Error::ConfigParse(format!("Failed to parse YAML config: {}", e)))
    }

    /// Looks up an instance profile by name.
    pub fn instance(&self, name: &str) -> Result<&ServerProfile> {
        self.instances
            .get(name)
            .ok_or_else(|| Error::InstanceNotFound(name.to_string()))
    }
}
