use assert_fs::TempDir;
use assert_fs::prelude::*;
use async_trait::async_trait;
use mc_runner::config::{Config, SupervisorConfig};
use mc_runner::error::{Error, Result};
use mc_runner::profile::ServerProfile;
use mc_runner::session::{SessionBackend, SessionInfo, SupervisorCommand};
use mc_runner::{McRunner, StopOutcome};
use mockall::mock;
use mockall::predicate::*;
use std::collections::HashMap;
use std::path::Path;

mock! {
    pub Backend {}

    #[async_trait]
    impl SessionBackend for Backend {
        async fn list_sessions(&self) -> Result<Vec<String>>;
        async fn has_session(&self, name: &str) -> Result<bool>;
        async fn new_session(&self, name: &str, working_dir: &Path, command: &[String]) -> Result<()>;
        async fn send_line(&self, name: &str, line: &str) -> Result<()>;
        async fn kill_session(&self, name: &str) -> Result<()>;
        async fn session_info(&self, name: &str) -> Result<Option<SessionInfo>>;
        async fn attach(&self, name: &str) -> Result<()>;
    }
}

fn fixture() -> (TempDir, Config) {
    let root = TempDir::new().unwrap();
    root.child("jdk/bin/java").touch().unwrap();
    root.child("survival/server.jar").touch().unwrap();

    let profile = ServerProfile {
        java_path: root.child("jdk/bin/java").path().to_path_buf(),
        jvm_args: vec!["-Xmx1G".to_string()],
        jar: "server.jar".to_string(),
        working_dir: root.child("survival").path().to_path_buf(),
        server_args: vec!["nogui".to_string()],
        minecraft_version: None,
    };

    let mut instances = HashMap::new();
    instances.insert("survival".to_string(), profile);
    let mut config = Config {
        instances,
        supervisor: SupervisorConfig::default(),
        session: Default::default(),
        runtimes: Default::default(),
    };
    config.session.stop_timeout_seconds = 0;
    config.session.grace_delay_seconds = 0;
    config.session.poll_interval_millis = 1;
    (root, config)
}

fn runner(config: Config, backend: MockBackend) -> McRunner<MockBackend> {
    let command = SupervisorCommand::new("/usr/local/bin/mc-runner", config.supervisor);
    McRunner::with_backend(config, backend, command)
}

#[tokio::test]
async fn test_start_rejects_invalid_profile_before_session() {
    let (root, config) = fixture();
    std::fs::remove_file(root.child("survival/server.jar").path()).unwrap();

    let mut backend = MockBackend::new();
    backend.expect_has_session().times(0);
    backend.expect_new_session().times(0);

    let err = runner(config, backend)
        .start_server("survival")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ConfigValidation(_)));
}

#[tokio::test]
async fn test_start_refuses_disabled_instance() -> Result<()> {
    let (root, config) = fixture();
    let policy = config.supervisor.crash_policy();

    let mut backend = MockBackend::new();
    backend.expect_has_session().times(0);
    backend.expect_new_session().times(0);

    let runner = runner(config, backend);
    let ledger = runner.ledger("survival")?;
    for now in [10, 20, 30] {
        ledger.record_crash_at(now, &policy)?;
    }
    let before = ledger.status();

    let err = runner.start_server("survival").await.unwrap_err();

    assert!(matches!(err, Error::AutoRestartDisabled(ref name) if name == "survival"));
    assert!(err.to_string().contains("mc-runner reset survival"));
    assert_eq!(ledger.status(), before);
    assert!(!root.child("survival/start.sh").path().exists());

    Ok(())
}

#[tokio::test]
async fn test_start_after_reset_creates_session() -> Result<()> {
    let (_root, config) = fixture();
    let policy = config.supervisor.crash_policy();

    let mut backend = MockBackend::new();
    let mut seq = mockall::Sequence::new();
    backend
        .expect_has_session()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(false));
    backend
        .expect_new_session()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _, _| Ok(()));
    backend
        .expect_has_session()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(true));

    let runner = runner(config, backend);
    let ledger = runner.ledger("survival")?;
    ledger.record_crash_at(10, &mc_runner::ledger::CrashPolicy { max_crashes: 1, ..policy })?;
    runner.reset_crashes("survival")?;

    runner.start_server("survival").await?;

    Ok(())
}

#[tokio::test]
async fn test_start_unknown_instance() {
    let (_root, config) = fixture();
    let backend = MockBackend::new();

    let err = runner(config, backend)
        .start_server("creative")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InstanceNotFound(_)));
}

#[tokio::test]
async fn test_start_then_status() -> Result<()> {
    let (root, config) = fixture();
    let created = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
    let created_in_new = std::sync::Arc::clone(&created);
    let created_in_has = std::sync::Arc::clone(&created);

    let mut backend = MockBackend::new();
    backend
        .expect_has_session()
        .with(eq("survival"))
        .returning(move |_| Ok(created_in_has.load(std::sync::atomic::Ordering::SeqCst)));
    backend
        .expect_new_session()
        .times(1)
        .returning(move |_, _, _| {
            created_in_new.store(true, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        });
    backend.expect_session_info().returning(|_| {
        Ok(Some(SessionInfo {
            pid: Some(77),
            created_at: None,
        }))
    });

    let runner = runner(config, backend);
    runner.start_server("survival").await?;

    let status = runner.server_status("survival").await?;
    assert!(status.session.running);
    assert_eq!(status.session.pid, Some(77));
    assert_eq!(status.session.uptime, None);
    assert_eq!(status.ledger.crash_count, 0);
    assert!(root.child("survival/start.sh").path().exists());

    Ok(())
}

#[tokio::test]
async fn test_stop_with_zero_timeout_forces() -> Result<()> {
    let (_root, config) = fixture();

    let mut backend = MockBackend::new();
    backend.expect_has_session().returning(|_| Ok(true));
    backend.expect_send_line().times(2).returning(|_, _| Ok(()));
    backend.expect_kill_session().times(1).returning(|_| Ok(()));

    let outcome = runner(config, backend).stop_server("survival").await?;
    assert_eq!(outcome, StopOutcome::Forced);

    Ok(())
}

#[tokio::test]
async fn test_reset_clears_disabled_ledger() -> Result<()> {
    let (_root, config) = fixture();
    let runner = runner(config, MockBackend::new());

    let ledger = runner.ledger("survival")?;
    let policy = runner.config().supervisor.crash_policy();
    for now in [10, 20, 30] {
        ledger.record_crash_at(now, &policy)?;
    }
    assert!(ledger.is_auto_restart_disabled());

    runner.reset_crashes("survival")?;
    runner.reset_crashes("survival")?;

    let status = ledger.status();
    assert_eq!(status.crash_count, 0);
    assert!(!status.auto_restart_disabled);

    Ok(())
}

#[test]
fn test_instance_names_sorted() {
    let (_root, mut config) = fixture();
    let profile = config.instances["survival"].clone();
    config.instances.insert("creative".to_string(), profile);

    let runner = runner(config, MockBackend::new());
    assert_eq!(runner.instance_names(), vec!["creative", "survival"]);
}
