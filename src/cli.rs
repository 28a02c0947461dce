//! Command-line interface definition for the `mc-runner` binary.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::SupervisorConfig;

/// Supervise Minecraft servers in detached tmux sessions.
#[derive(Parser, Debug)]
#[command(name = "mc-runner")]
#[command(about = "Run Minecraft servers with crash-limited auto-restart")]
#[command(version)]
pub struct Cli {
    /// Configuration file (JSON, or YAML with a .yaml/.yml extension)
    #[arg(
        short = 'c',
        long = "config",
        env = "MC_RUNNER_CONFIG",
        default_value = "mc-runner.json",
        global = true
    )]
    pub config: PathBuf,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Operator verbs and the in-session supervisor entry point.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate an instance and start it in a detached session
    Start {
        /// Instance name
        name: String,
    },
    /// Gracefully stop a running instance
    Stop {
        /// Instance name
        name: String,
    },
    /// Show session and crash ledger state
    Status {
        /// Instance name; all instances when omitted
        name: Option<String>,
    },
    /// Attach this terminal to an instance's console
    Attach {
        /// Instance name
        name: String,
    },
    /// Clear the crash ledger and re-enable auto-restart
    Reset {
        /// Instance name
        name: String,
    },
    /// Check instance profiles without starting anything
    Validate {
        /// Instance name; all instances when omitted
        name: Option<String>,
    },
    /// Run the restart loop in the foreground (what a session executes)
    Supervise {
        #[command(flatten)]
        policy: PolicyArgs,

        /// Instance directory holding the materialized profile
        dir: PathBuf,
    },
}

/// Crash policy flags for `supervise`.
#[derive(clap::Args, Debug, Clone, Copy)]
pub struct PolicyArgs {
    /// Crashes inside one window that disable auto-restart
    #[arg(long = "max-crashes", default_value_t = 3, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_crashes: u32,

    /// Crash window in seconds
    #[arg(long = "crash-window", default_value_t = 300)]
    pub crash_window_seconds: u64,

    /// Delay before restarting after a crash, in seconds
    #[arg(long = "restart-delay", default_value_t = 10)]
    pub restart_delay_seconds: u64,
}

impl From<PolicyArgs> for SupervisorConfig {
    fn from(args: PolicyArgs) -> Self {
        Self {
            max_crashes: args.max_crashes,
            crash_window_seconds: args.crash_window_seconds,
            restart_delay_seconds: args.restart_delay_seconds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SupervisorCommand;
    use crate::profile::ServerProfile;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parser_builds() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_args() {
        let cli = Cli::parse_from(["mc-runner", "--verbose", "-c", "/etc/mc.yaml", "stop", "lobby"]);
        assert!(cli.verbose);
        assert_eq!(cli.config, PathBuf::from("/etc/mc.yaml"));
        assert!(matches!(cli.command, Commands::Stop { ref name } if name == "lobby"));
    }

    #[test]
    fn test_supervise_parses_generated_command() {
        let config = SupervisorConfig {
            max_crashes: 5,
            crash_window_seconds: 600,
            restart_delay_seconds: 2,
        };
        let profile = ServerProfile {
            java_path: PathBuf::from("/usr/bin/java"),
            jvm_args: vec![],
            jar: "server.jar".to_string(),
            working_dir: PathBuf::from("/srv/minecraft/lobby"),
            server_args: vec![],
            minecraft_version: None,
        };
        let argv = SupervisorCommand::new("/usr/local/bin/mc-runner", config).argv(&profile);

        let cli = Cli::parse_from(argv);
        match cli.command {
            Commands::Supervise { policy, dir } => {
                assert_eq!(SupervisorConfig::from(policy), config);
                assert_eq!(dir, PathBuf::from("/srv/minecraft/lobby"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_zero_max_crashes_rejected() {
        let result = Cli::try_parse_from(["mc-runner", "supervise", "--max-crashes", "0", "/srv/x"]);
        assert!(result.is_err());
    }
}
