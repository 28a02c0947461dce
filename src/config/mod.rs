//! Configuration module for MC Runner.
//!
//! This module handles parsing, validation, and access to configuration
//! settings for supervised Minecraft servers. Configurations are loaded from
//! JSON or YAML files.
//!
//! # Examples
//!
//! Loading a configuration from a file:
//!
//! ```no_run
//! use mc_runner::config::Config;
//!
//! let config = Config::from_file("mc-runner.json").unwrap();
//! println!("Loaded configuration with {} instances", config.instances.len());
//! ```
//!
//! Validating a profile before starting it:
//!
//! ```no_run
//! use mc_runner::config::{Config, validate_profile};
//!
//! let config = Config::from_file("mc-runner.yaml").unwrap();
//! let profile = config.instance("survival").unwrap();
//! validate_profile("survival", profile).unwrap();
//! ```
mod parser;
pub mod validator;

pub use parser::{Config, SessionSettings, SupervisorConfig};
pub use validator::{validate_config, validate_profile};
