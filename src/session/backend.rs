use crate::error::{Error, Result};
use async_process::{Command, Output};
use async_trait::async_trait;
use std::path::Path;

/// Identity of the process running inside a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionInfo {
    /// Pid of the session's first pane (the supervisor process)
    pub pid: Option<u32>,
    /// Session creation time in unix seconds
    pub created_at: Option<i64>,
}

/// Host-level detached terminal sessions.
///
/// Names are matched exactly: a session called `lobby` must never match a
/// request for `lob`.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// Names of all existing sessions.
    async fn list_sessions(&self) -> Result<Vec<String>>;

    /// Whether a session with exactly this name exists.
    async fn has_session(&self, name: &str) -> Result<bool>;

    /// Creates a detached session running `command` in `working_dir`.
    async fn new_session(&self, name: &str, working_dir: &Path, command: &[String]) -> Result<()>;

    /// Types `line` into the session followed by a carriage return.
    async fn send_line(&self, name: &str, line: &str) -> Result<()>;

    /// Forcibly destroys the session and everything running in it.
    async fn kill_session(&self, name: &str) -> Result<()>;

    /// Process identity of the session, or `None` if it does not exist.
    async fn session_info(&self, name: &str) -> Result<Option<SessionInfo>>;

    /// Hands the caller's terminal to the session.
    async fn attach(&self, name: &str) -> Result<()>;
}

/// `SessionBackend` on top of tmux.
///
/// Every target is written as `=name` so tmux resolves it by exact session
/// name instead of by prefix or pattern.
#[derive(Debug, Clone)]
pub struct TmuxBackend {
    binary: String,
}

impl Default for TmuxBackend {
    fn default() -> Self {
        Self::new("tmux")
    }
}

fn session_target(name: &str) -> String {
    format!("={}", name)
}

fn pane_target(name: &str) -> String {
    format!("={}:", name)
}

/// tmux reports a missing server or session on stderr with these phrases.
fn is_absent(stderr: &str) -> bool {
    stderr.contains("no server running")
        || stderr.contains("error connecting")
        || stderr.contains("can't find session")
        || stderr.contains("session not found")
}

impl TmuxBackend {
    /// Backend invoking the given tmux executable.
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    async fn run<I, S>(&self, args: I) -> Result<Output>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        Command::new(&self.binary)
            .args(args)
            .output()
            .await
            .map_err(|e| Error::Session(format!("Failed to run {}: {}", self.binary, e)))
    }

    fn failure(&self, action: &str, output: &Output) -> Error {
        Error::Session(format!(
            "{} {} failed: {}",
            self.binary,
            action,
            String::from_utf8_lossy(&output.stderr).trim()
        ))
    }
}

/// Parses `#{pane_pid} #{session_created}` as printed by `display-message`.
/// Session names from `list-sessions -F #{session_name}` output.
fn parse_session_list(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim_end)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Whole-name match only; `lobby` never matches `lobby2` or `mylobby`.
fn is_listed(sessions: &[String], name: &str) -> bool {
    sessions.iter().any(|session| session == name)
}

/// Parses `#{pane_pid} #{session_created}`. tmux can answer a query for a
/// vanished session with an empty line and a zero status, so a reply without
/// a pid means the session is gone.
fn parse_session_info(line: &str) -> Option<SessionInfo> {
    let mut fields = line.split_whitespace();
    let pid = fields.next()?.parse().ok()?;
    Some(SessionInfo {
        pid: Some(pid),
        created_at: fields.next().and_then(|created| created.parse().ok()),
    })
}

#[async_trait]
impl SessionBackend for TmuxBackend {
    async fn list_sessions(&self) -> Result<Vec<String>> {
        let output = self.run(["list-sessions", "-F", "#{session_name}"]).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if is_absent(&stderr) {
                return Ok(Vec::new());
            }
            return Err(self.failure("list-sessions", &output));
        }

        Ok(parse_session_list(&String::from_utf8_lossy(&output.stdout)))
    }

    async fn has_session(&self, name: &str) -> Result<bool> {
        Ok(is_listed(&self.list_sessions().await?, name))
    }

    async fn new_session(&self, name: &str, working_dir: &Path, command: &[String]) -> Result<()> {
        let mut args = vec![
            "new-session".to_string(),
            "-d".to_string(),
            "-s".to_string(),
            name.to_string(),
            "-c".to_string(),
            working_dir.to_string_lossy().into_owned(),
        ];
        args.extend(command.iter().cloned());

        let output = self.run(&args).await?;
        if !output.status.success() {
            if String::from_utf8_lossy(&output.stderr).contains("duplicate session") {
                return Err(Error::AlreadyRunning(name.to_string()));
            }
            return Err(self.failure("new-session", &output));
        }

        tracing::debug!(session = name, "Created tmux session");
        Ok(())
    }

    async fn send_line(&self, name: &str, line: &str) -> Result<()> {
        let target = pane_target(name);
        for args in [
            ["send-keys", "-t", target.as_str(), "-l", line].as_slice(),
            ["send-keys", "-t", target.as_str(), "C-m"].as_slice(),
        ] {
            let output = self.run(args).await?;
            if !output.status.success() {
                if is_absent(&String::from_utf8_lossy(&output.stderr)) {
                    return Err(Error::NotRunning(name.to_string()));
                }
                return Err(self.failure("send-keys", &output));
            }
        }
        Ok(())
    }

    async fn kill_session(&self, name: &str) -> Result<()> {
        let output = self
            .run(["kill-session", "-t", session_target(name).as_str()])
            .await?;
        if !output.status.success() {
            if is_absent(&String::from_utf8_lossy(&output.stderr)) {
                return Err(Error::NotRunning(name.to_string()));
            }
            return Err(self.failure("kill-session", &output));
        }
        Ok(())
    }

    async fn session_info(&self, name: &str) -> Result<Option<SessionInfo>> {
        let output = self
            .run([
                "display-message",
                "-p",
                "-t",
                pane_target(name).as_str(),
                "#{pane_pid} #{session_created}",
            ])
            .await?;
        if !output.status.success() {
            if is_absent(&String::from_utf8_lossy(&output.stderr)) {
                return Ok(None);
            }
            return Err(self.failure("display-message", &output));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(parse_session_info(stdout.trim()))
    }

    async fn attach(&self, name: &str) -> Result<()> {
        let target = session_target(name);

        // Already inside tmux: nesting clients is refused, switch instead.
        if std::env::var_os("TMUX").is_some() {
            let output = self.run(["switch-client", "-t", target.as_str()]).await?;
            if !output.status.success() {
                return Err(self.failure("switch-client", &output));
            }
            return Ok(());
        }

        let mut command = std::process::Command::new(&self.binary);
        command.args(["attach-session", "-t", target.as_str()]);

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            // exec only returns on failure.
            let e = command.exec();
            Err(Error::Session(format!("Failed to attach to '{}': {}", name, e)))
        }

        #[cfg(not(unix))]
        {
            let status = command
                .status()
                .map_err(|e| Error::Session(format!("Failed to attach to '{}': {}", name, e)))?;
            if !status.success() {
                return Err(Error::Session(format!("Attach to '{}' exited with {}", name, status)));
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_targets_are_exact() {
        assert_eq!(session_target("lobby"), "=lobby");
        assert_eq!(pane_target("lobby"), "=lobby:");
    }

    #[test]
    fn test_session_names_match_exactly() {
        let sessions = parse_session_list("lobby2\nmylobby\n\n");
        assert_eq!(sessions, vec!["lobby2", "mylobby"]);

        assert!(!is_listed(&sessions, "lobby"));
        assert!(!is_listed(&sessions, "lobby2x"));
        assert!(!is_listed(&sessions, ""));
        assert!(is_listed(&sessions, "lobby2"));
        assert!(is_listed(&sessions, "mylobby"));
    }

    #[test]
    fn test_parse_session_info() {
        assert_eq!(
            parse_session_info("4242 1700000000"),
            Some(SessionInfo {
                pid: Some(4242),
                created_at: Some(1_700_000_000),
            })
        );
        assert_eq!(
            parse_session_info("4242"),
            Some(SessionInfo {
                pid: Some(4242),
                created_at: None,
            })
        );
    }

    #[test]
    fn test_empty_session_info_means_gone() {
        assert_eq!(parse_session_info(""), None);
        assert_eq!(parse_session_info("garbage 17"), None);
    }

    #[test]
    fn test_absent_messages() {
        assert!(is_absent("no server running on /tmp/tmux-1000/default"));
        assert!(is_absent("can't find session: =lobby"));
        assert!(!is_absent("unknown option -- z"));
    }

    #[tokio::test]
    async fn test_missing_binary_is_session_error() {
        let backend = TmuxBackend::new("/nonexistent/tmux-binary");
        let err = backend.list_sessions().await.unwrap_err();
        assert!(matches!(err, Error::Session(_)));
    }
}
