//! Persisted crash ledger for one server instance.
//!
//! The ledger lives in the instance directory as three small files:
//!
//! ```text
//! .crash_count            <crashes inside the current window>
//! .last_crash_time        <unix seconds of the most recent crash>
//! .auto_restart_disabled  (presence only)
//! ```
//!
//! Only the supervisor loop writes the count and time; operator tooling reads
//! them for status and removes them on reset. Reads tolerate missing or
//! garbled files and fall back to zero, so a status query racing a write sees
//! at worst a slightly stale value.

use crate::error::{Error, Result};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

pub const CRASH_COUNT_FILE: &str = ".crash_count";
pub const LAST_CRASH_TIME_FILE: &str = ".last_crash_time";
pub const AUTO_RESTART_DISABLED_FILE: &str = ".auto_restart_disabled";

/// Source of "now" in unix seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
            .unwrap_or(0)
    }
}

/// Window and limit used when recording a crash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrashPolicy {
    /// Crashes further apart than this start a new window.
    pub window_seconds: i64,
    /// Crash count at which auto-restart is disabled.
    pub max_crashes: u32,
}

/// Outcome of recording one crash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrashDecision {
    /// Whether the supervisor may restart the server.
    pub continue_allowed: bool,
    /// Crash count after this crash.
    pub crash_count: u32,
    /// Whether this crash opened a new window, discarding earlier crashes.
    pub window_reset: bool,
}

/// Snapshot of the ledger for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerStatus {
    pub crash_count: u32,
    pub last_crash_time: i64,
    pub auto_restart_disabled: bool,
}

/// Crash-count/time-window state for one instance directory.
///
/// # Examples
///
/// ```no_run
/// use mc_runner::ledger::{CrashLedger, CrashPolicy};
///
/// let ledger = CrashLedger::new("/srv/minecraft/survival");
/// let policy = CrashPolicy { window_seconds: 300, max_crashes: 3 };
///
/// let decision = ledger.record_crash(&policy)?;
/// if !decision.continue_allowed {
///     println!("auto-restart disabled after {} crashes", decision.crash_count);
/// }
/// # Ok::<(), mc_runner::Error>(())
/// ```
#[derive(Clone)]
pub struct CrashLedger {
    dir: PathBuf,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for CrashLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrashLedger").field("dir", &self.dir).finish()
    }
}

impl CrashLedger {
    /// Ledger in `dir`, using the wall clock.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_clock(dir, Arc::new(SystemClock))
    }

    /// Ledger in `dir` with an explicit clock.
    pub fn with_clock(dir: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            dir: dir.into(),
            clock,
        }
    }

    /// Instance directory holding the ledger files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Records a crash at the clock's current time.
    pub fn record_crash(&self, policy: &CrashPolicy) -> Result<CrashDecision> {
        self.record_crash_at(self.clock.now(), policy)
    }

    /// Records a crash that happened at `now` (unix seconds).
    ///
    /// The count restarts at 1 when `now - lastCrashTime` is strictly greater
    /// than the window. A clock that went backwards yields a negative
    /// difference and keeps the current window. All files are durably written
    /// before this returns.
    #[tracing::instrument(skip(self), fields(dir = %self.dir.display()))]
    pub fn record_crash_at(&self, now: i64, policy: &CrashPolicy) -> Result<CrashDecision> {
        let count_path = self.path(CRASH_COUNT_FILE);
        let time_path = self.path(LAST_CRASH_TIME_FILE);

        if !count_path.exists() {
            write_durable(&count_path, "0").map_err(|e| ledger_io("create", &count_path, e))?;
        }
        if !time_path.exists() {
            write_durable(&time_path, "0").map_err(|e| ledger_io("create", &time_path, e))?;
        }

        let previous_count = read_number::<u32>(&count_path);
        let last_crash_time = read_number::<i64>(&time_path);

        let elapsed = now.saturating_sub(last_crash_time);
        let window_reset = previous_count > 0 && elapsed > policy.window_seconds;
        let base = if elapsed > policy.window_seconds {
            0
        } else {
            previous_count
        };
        let crash_count = base.saturating_add(1);

        write_durable(&time_path, &now.to_string()).map_err(|e| ledger_io("write", &time_path, e))?;
        write_durable(&count_path, &crash_count.to_string())
            .map_err(|e| ledger_io("write", &count_path, e))?;

        let continue_allowed = crash_count < policy.max_crashes;
        if !continue_allowed {
            let flag_path = self.path(AUTO_RESTART_DISABLED_FILE);
            write_durable(&flag_path, "").map_err(|e| ledger_io("write", &flag_path, e))?;
            tracing::warn!(
                crash_count,
                max_crashes = policy.max_crashes,
                window_seconds = policy.window_seconds,
                "Crash limit reached; auto-restart disabled"
            );
        } else {
            tracing::info!(
                crash_count,
                max_crashes = policy.max_crashes,
                window_seconds = policy.window_seconds,
                window_reset,
                "Crash recorded"
            );
        }

        Ok(CrashDecision {
            continue_allowed,
            crash_count,
            window_reset,
        })
    }

    /// Whether auto-restart has been disabled. A missing flag means enabled.
    pub fn is_auto_restart_disabled(&self) -> bool {
        self.path(AUTO_RESTART_DISABLED_FILE).exists()
    }

    /// Removes all ledger records. Calling it on an empty ledger is a no-op.
    #[tracing::instrument(skip(self), fields(dir = %self.dir.display()))]
    pub fn reset(&self) -> Result<()> {
        for name in [CRASH_COUNT_FILE, LAST_CRASH_TIME_FILE, AUTO_RESTART_DISABLED_FILE] {
            let path = self.path(name);
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(ledger_io("remove", &path, e)),
            }
        }
        tracing::info!("Crash ledger reset; auto-restart enabled");
        Ok(())
    }

    /// Current ledger contents. Never fails; missing fields read as zero/false.
    pub fn status(&self) -> LedgerStatus {
        LedgerStatus {
            crash_count: read_number(&self.path(CRASH_COUNT_FILE)),
            last_crash_time: read_number(&self.path(LAST_CRASH_TIME_FILE)),
            auto_restart_disabled: self.is_auto_restart_disabled(),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

fn ledger_io(action: &str, path: &Path, e: io::Error) -> Error {
    Error::Ledger(format!("Failed to {} {}: {}", action, path.display(), e))
}

/// Reads a plain-text integer, treating anything unreadable as zero.
fn read_number<T>(path: &Path) -> T
where
    T: std::str::FromStr + Default,
{
    fs::read_to_string(path)
        .ok()
        .and_then(|content| content.trim().parse().ok())
        .unwrap_or_default()
}

/// Writes via temp file + fsync + rename so a crash or reboot right after
/// leaves either the old or the new value on disk.
fn write_durable(path: &Path, content: &str) -> io::Result<()> {
    let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    let mut file = File::create(&temp_path)?;
    file.write_all(content.as_bytes())?;
    file.sync_all()?;
    fs::rename(&temp_path, path)?;

    #[cfg(unix)]
    {
        if let Some(parent) = path.parent()
            && let Err(e) = File::open(parent).and_then(|dir| dir.sync_all())
        {
            tracing::debug!(error = %e, "Directory fsync failed");
        }
    }

    Ok(())
}
