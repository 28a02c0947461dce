use mc_runner::error::Result;
use mc_runner::ledger::{
    AUTO_RESTART_DISABLED_FILE, CRASH_COUNT_FILE, Clock, CrashLedger, CrashPolicy,
    LAST_CRASH_TIME_FILE, LedgerStatus,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use tempfile::tempdir;

// Clock the tests move by hand
struct ManualClock(AtomicI64);

impl ManualClock {
    fn at(now: i64) -> Arc<Self> {
        Arc::new(Self(AtomicI64::new(now)))
    }

    fn set(&self, now: i64) {
        self.0.store(now, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

const POLICY: CrashPolicy = CrashPolicy {
    window_seconds: 300,
    max_crashes: 3,
};

#[test]
fn test_three_crashes_inside_window_disable_restart() -> Result<()> {
    let dir = tempdir().unwrap();
    let clock = ManualClock::at(1_000_000);
    let ledger = CrashLedger::with_clock(dir.path(), clock.clone());

    let first = ledger.record_crash(&POLICY)?;
    assert_eq!(first.crash_count, 1);
    assert!(first.continue_allowed);

    clock.set(1_000_100);
    let second = ledger.record_crash(&POLICY)?;
    assert_eq!(second.crash_count, 2);
    assert!(second.continue_allowed);

    clock.set(1_000_200);
    let third = ledger.record_crash(&POLICY)?;
    assert_eq!(third.crash_count, 3);
    assert!(!third.continue_allowed);

    let status = ledger.status();
    assert_eq!(status.crash_count, 3);
    assert_eq!(status.last_crash_time, 1_000_200);
    assert!(status.auto_restart_disabled);
    assert!(ledger.is_auto_restart_disabled());

    Ok(())
}

#[test]
fn test_crash_outside_window_resets_count() -> Result<()> {
    let dir = tempdir().unwrap();
    let clock = ManualClock::at(5_000);
    let ledger = CrashLedger::with_clock(dir.path(), clock.clone());

    ledger.record_crash(&POLICY)?;
    clock.set(5_350);
    let decision = ledger.record_crash(&POLICY)?;

    assert_eq!(decision.crash_count, 1);
    assert!(decision.window_reset);
    assert!(decision.continue_allowed);
    assert!(!ledger.is_auto_restart_disabled());

    Ok(())
}

#[test]
fn test_count_strictly_increases_inside_window() -> Result<()> {
    let dir = tempdir().unwrap();
    let ledger = CrashLedger::new(dir.path());
    let policy = CrashPolicy {
        window_seconds: 60,
        max_crashes: 6,
    };

    let mut previous = 0;
    for (i, now) in [100, 150, 200, 250, 300].into_iter().enumerate() {
        let decision = ledger.record_crash_at(now, &policy)?;
        assert!(decision.crash_count > previous);
        assert!(decision.continue_allowed, "crash {} should allow restart", i + 1);
        previous = decision.crash_count;
    }

    let decision = ledger.record_crash_at(350, &policy)?;
    assert_eq!(decision.crash_count, 6);
    assert!(!decision.continue_allowed);

    Ok(())
}

#[test]
fn test_disabled_flag_survives_window_expiry() -> Result<()> {
    let dir = tempdir().unwrap();
    let ledger = CrashLedger::new(dir.path());

    for now in [0, 10, 20] {
        ledger.record_crash_at(now, &POLICY)?;
    }
    assert!(ledger.is_auto_restart_disabled());

    // A much later crash opens a new window but never clears the flag.
    let decision = ledger.record_crash_at(100_000, &POLICY)?;
    assert_eq!(decision.crash_count, 1);
    assert!(ledger.is_auto_restart_disabled());

    // A fresh handle on the same directory sees the same state.
    assert!(CrashLedger::new(dir.path()).is_auto_restart_disabled());

    Ok(())
}

#[test]
fn test_reset_is_idempotent() -> Result<()> {
    let dir = tempdir().unwrap();
    let ledger = CrashLedger::new(dir.path());

    for now in [0, 10, 20] {
        ledger.record_crash_at(now, &POLICY)?;
    }

    ledger.reset()?;
    let once = ledger.status();
    ledger.reset()?;
    let twice = ledger.status();

    assert_eq!(once, LedgerStatus::default());
    assert_eq!(once, twice);
    for name in [CRASH_COUNT_FILE, LAST_CRASH_TIME_FILE, AUTO_RESTART_DISABLED_FILE] {
        assert!(!dir.path().join(name).exists(), "{} should be removed", name);
    }

    // The next crash starts from a clean ledger.
    let decision = ledger.record_crash_at(30, &POLICY)?;
    assert_eq!(decision.crash_count, 1);

    Ok(())
}

#[test]
fn test_status_of_empty_directory() {
    let dir = tempdir().unwrap();
    let ledger = CrashLedger::new(dir.path());

    assert_eq!(ledger.status(), LedgerStatus::default());
    assert!(!ledger.is_auto_restart_disabled());
}

#[test]
fn test_files_are_plain_text_integers() -> Result<()> {
    let dir = tempdir().unwrap();
    let ledger = CrashLedger::new(dir.path());

    ledger.record_crash_at(1_700_000_000, &POLICY)?;

    let count = std::fs::read_to_string(dir.path().join(CRASH_COUNT_FILE)).unwrap();
    let time = std::fs::read_to_string(dir.path().join(LAST_CRASH_TIME_FILE)).unwrap();
    assert_eq!(count.trim(), "1");
    assert_eq!(time.trim(), "1700000000");

    Ok(())
}
