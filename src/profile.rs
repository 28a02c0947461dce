//! Server profile: the static launch descriptor for one server instance.
//!
//! A profile is produced by whatever installs or updates the server and is
//! read-only to the supervisor. It is materialized into the instance directory
//! twice: as `mc-runner.profile.json`, which the detached supervisor loads, and
//! as `start.sh`, the literal launch command kept for transparency.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File the detached supervisor reads its profile from.
pub const PROFILE_FILE: &str = "mc-runner.profile.json";

/// Human-readable launch script written next to the profile.
pub const LAUNCH_SCRIPT: &str = "start.sh";

fn default_server_args() -> Vec<String> {
    vec!["nogui".to_string()]
}

/// Launch descriptor for a Minecraft server.
///
/// # Examples
///
/// ```
/// use mc_runner::profile::ServerProfile;
/// use std::path::PathBuf;
///
/// let profile = ServerProfile {
///     java_path: PathBuf::from("/usr/bin/java"),
///     jvm_args: vec!["-Xms1G".to_string(), "-Xmx4G".to_string()],
///     jar: "server.jar".to_string(),
///     working_dir: PathBuf::from("/srv/minecraft/survival"),
///     server_args: vec!["nogui".to_string()],
///     minecraft_version: None,
/// };
///
/// assert_eq!(profile.session_name(), Some("survival"));
/// assert_eq!(
///     profile.args(),
///     vec!["-Xms1G", "-Xmx4G", "-jar", "server.jar", "nogui"]
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerProfile {
    /// Absolute path to the Java executable.
    pub java_path: PathBuf,

    /// JVM arguments placed before `-jar`, memory flags included.
    #[serde(default)]
    pub jvm_args: Vec<String>,

    /// File name of the server JAR inside `working_dir`.
    pub jar: String,

    /// Instance directory; the server runs with this as its current directory.
    pub working_dir: PathBuf,

    /// Arguments passed to the server after the JAR.
    #[serde(default = "default_server_args")]
    pub server_args: Vec<String>,

    /// Minecraft version, when known. Enables runtime version checks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minecraft_version: Option<String>,
}

impl ServerProfile {
    /// Full argument vector passed to the Java executable.
    pub fn args(&self) -> Vec<String> {
        let mut args = self.jvm_args.clone();
        args.push("-jar".to_string());
        args.push(self.jar.clone());
        args.extend(self.server_args.iter().cloned());
        args
    }

    /// Path of the server JAR.
    pub fn jar_path(&self) -> PathBuf {
        self.working_dir.join(&self.jar)
    }

    /// Session name for this instance: the working directory's base name.
    pub fn session_name(&self) -> Option<&str> {
        self.working_dir.file_name().and_then(|name| name.to_str())
    }

    /// The launch command as a single shell line.
    pub fn command_line(&self) -> String {
        std::iter::once(self.java_path.to_string_lossy().into_owned())
            .chain(self.args())
            .map(|part| shell_quote(&part))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Writes `mc-runner.profile.json` and `start.sh` into the working directory.
    #[tracing::instrument(skip(self), fields(working_dir = %self.working_dir.display()))]
    pub fn materialize(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Other(format!("Failed to serialize profile: {}", e)))?;
        std::fs::write(self.working_dir.join(PROFILE_FILE), json)
            .map_err(|e| Error::Setup(format!("Failed to write {}: {}", PROFILE_FILE, e)))?;

        let script_path = self.working_dir.join(LAUNCH_SCRIPT);
        let script = format!(
            "#!/bin/sh\n# Generated by mc-runner; edit the instance profile instead.\ncd {} || exit 1\nexec {}\n",
            shell_quote(&self.working_dir.to_string_lossy()),
            self.command_line()
        );
        std::fs::write(&script_path, script)
            .map_err(|e| Error::Setup(format!("Failed to write {}: {}", LAUNCH_SCRIPT, e)))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&script_path, std::fs::Permissions::from_mode(0o755))
                .map_err(|e| Error::Setup(format!("Failed to mark {} executable: {}", LAUNCH_SCRIPT, e)))?;
        }

        tracing::debug!("Materialized server profile");
        Ok(())
    }

    /// Loads the profile previously materialized into `dir`.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let path = dir.as_ref().join(PROFILE_FILE);
        let content = std::fs::read_to_string(&path).map_err(|e| {
            Error::Setup(format!("Failed to read profile {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content)
            .map_err(|e| Error::ConfigParse(format!("Failed to parse profile {}: {}", path.display(), e)))
    }
}

/// Quotes a word for POSIX `sh`, leaving plain words untouched.
fn shell_quote(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./=:,+@%".contains(c));
    if plain {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}
