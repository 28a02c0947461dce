//! `mc-runner` entry point.
//!
//! Operator verbs load the configuration and go through `McRunner`; the
//! `supervise` verb is what runs inside each detached session and needs only
//! the instance directory.

use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use mc_runner::cli::{Cli, Commands};
use mc_runner::config::{SupervisorConfig, validate_config};
use mc_runner::{Error, InstanceStatus, McRunner, StopOutcome, TerminalState};

/// Log file written by the supervisor inside each instance directory.
const SUPERVISOR_LOG_DIR: &str = "logs";
const SUPERVISOR_LOG_FILE: &str = "mc-runner.log";

/// Sets up logging to stdout, plus the instance log file when supervising.
fn init_tracing(verbose: bool, instance_dir: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let (file_layer, guard) = match instance_dir {
        Some(dir) => {
            let log_dir = dir.join(SUPERVISOR_LOG_DIR);
            std::fs::create_dir_all(&log_dir)
                .with_context(|| format!("creating log directory {}", log_dir.display()))?;
            let appender = tracing_appender::rolling::never(log_dir, SUPERVISOR_LOG_FILE);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(verbose))
        .with(file_layer)
        .init();

    Ok(guard)
}

fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
}

fn print_status(status: &InstanceStatus, max_crashes: u32) {
    let session = &status.session;
    if session.running {
        let pid = session
            .pid
            .map_or_else(|| "unknown".to_string(), |pid| pid.to_string());
        let uptime = session
            .uptime
            .map_or_else(|| "unknown".to_string(), format_uptime);
        println!("{}: running (pid {}, up {})", status.name, pid, uptime);
    } else {
        println!("{}: stopped", status.name);
    }

    let ledger = &status.ledger;
    println!(
        "  crashes: {}/{} in current window, last crash at {}",
        ledger.crash_count,
        max_crashes,
        if ledger.last_crash_time > 0 {
            ledger.last_crash_time.to_string()
        } else {
            "never".to_string()
        }
    );
    if ledger.auto_restart_disabled {
        println!(
            "  auto-restart: DISABLED (run `mc-runner reset {}` to re-enable)",
            status.name
        );
    } else {
        println!("  auto-restart: enabled");
    }
}

async fn supervise(dir: &Path, config: SupervisorConfig) -> anyhow::Result<ExitCode> {
    // Ctrl-C in the console is meant for the server; the supervisor stays up
    // and treats the resulting exit like any other.
    tokio::spawn(async {
        while tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received; leaving shutdown to the server");
        }
    });

    match mc_runner::supervise(dir, config).await {
        Ok(TerminalState::ExitedClean) => Ok(ExitCode::SUCCESS),
        Ok(TerminalState::Disabled) => Ok(ExitCode::from(2)),
        Err(Error::Setup(message)) => {
            tracing::error!("{}", message);
            Ok(ExitCode::from(3))
        }
        Err(e) => Err(e).context("supervisor failed"),
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    if let Commands::Supervise { policy, dir } = &cli.command {
        return supervise(dir, (*policy).into()).await;
    }

    let runner = McRunner::from_config_file(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    match cli.command {
        Commands::Start { name } => {
            runner.start_server(&name).await?;
            println!("Started {} in a detached session; `mc-runner attach {}` to view the console", name, name);
        }
        Commands::Stop { name } => match runner.stop_server(&name).await? {
            StopOutcome::Graceful => println!("{} stopped", name),
            StopOutcome::Forced => println!("{} did not stop in time and was killed", name),
        },
        Commands::Status { name } => {
            let names = match name {
                Some(name) => vec![name],
                None => runner.instance_names().into_iter().map(str::to_string).collect(),
            };
            for name in names {
                let status = runner.server_status(&name).await?;
                print_status(&status, runner.config().supervisor.max_crashes);
            }
        }
        Commands::Attach { name } => runner.attach(&name).await?,
        Commands::Reset { name } => {
            runner.reset_crashes(&name)?;
            println!("Crash ledger for {} reset; auto-restart enabled", name);
        }
        Commands::Validate { name } => match name {
            Some(name) => {
                runner.validate_instance(&name).await?;
                println!("{}: ok", name);
            }
            None => {
                validate_config(runner.config())?;
                for name in runner.instance_names() {
                    runner.validate_instance(name).await?;
                    println!("{}: ok", name);
                }
            }
        },
        Commands::Supervise { .. } => {}
    }

    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let instance_dir = match &cli.command {
        Commands::Supervise { dir, .. } => Some(dir.as_path()),
        _ => None,
    };
    let _guard = init_tracing(cli.verbose, instance_dir)?;

    run(cli).await
}
