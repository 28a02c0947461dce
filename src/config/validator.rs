use crate::config::Config;
use crate::error::{Error, Result};
use crate::profile::ServerProfile;

/// Validates that a string is a well-formed `-Xmx`/`-Xms` flag.
fn is_memory_flag_well_formed(value: &str) -> bool {
    let digits_end = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (digits, unit) = value.split_at(digits_end);
    !digits.is_empty()
        && digits.parse::<u64>().is_ok_and(|n| n > 0)
        && matches!(unit, "" | "k" | "K" | "m" | "M" | "g" | "G")
}

/// Converts a validated memory flag value to bytes for comparison.
fn memory_bytes(value: &str) -> Option<u64> {
    let digits_end = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (digits, unit) = value.split_at(digits_end);
    let n = digits.parse::<u64>().ok()?;
    let scale: u64 = match unit {
        "" => 1,
        "k" | "K" => 1 << 10,
        "m" | "M" => 1 << 20,
        "g" | "G" => 1 << 30,
        _ => return None,
    };
    n.checked_mul(scale)
}

/// Validates the JVM memory arguments of a profile.
pub fn validate_memory_args(name: &str, jvm_args: &[String]) -> Result<()> {
    let mut min_heap = None;
    let mut max_heap = None;

    for arg in jvm_args {
        let (slot, value) = if let Some(value) = arg.strip_prefix("-Xms") {
            (&mut min_heap, value)
        } else if let Some(value) = arg.strip_prefix("-Xmx") {
            (&mut max_heap, value)
        } else {
            if arg == "-jar" {
                return Err(Error::ConfigValidation(format!(
                    "Server '{}' lists -jar in jvmArgs; set the jar field instead",
                    name
                )));
            }
            continue;
        };

        if !is_memory_flag_well_formed(value) {
            return Err(Error::ConfigValidation(format!(
                "Server '{}' has malformed memory argument '{}'",
                name, arg
            )));
        }
        *slot = memory_bytes(value);
    }

    if let (Some(min), Some(max)) = (min_heap, max_heap)
        && min > max
    {
        return Err(Error::ConfigValidation(format!(
            "Server '{}' has -Xms larger than -Xmx",
            name
        )));
    }

    Ok(())
}

/// Validates that `name` can be used as the instance's session name.
pub fn validate_instance_name(name: &str, profile: &ServerProfile) -> Result<()> {
    if name.is_empty() || name.contains(['.', ':']) || name.chars().any(char::is_whitespace) {
        return Err(Error::ConfigValidation(format!(
            "Server name '{}' cannot be used as a session name",
            name
        )));
    }

    match profile.session_name() {
        Some(session) if session == name => Ok(()),
        _ => Err(Error::ConfigValidation(format!(
            "Server '{}' must live in a directory named '{}', found {}",
            name,
            name,
            profile.working_dir.display()
        ))),
    }
}

/// Validates a server profile before it is handed to the session host.
///
/// Checks the Java executable, the working directory, the JAR inside it,
/// memory arguments and the session name. Nothing here launches a process.
pub fn validate_profile(name: &str, profile: &ServerProfile) -> Result<()> {
    validate_instance_name(name, profile)?;

    if !profile.java_path.is_absolute() {
        return Err(Error::ConfigValidation(format!(
            "Server '{}' needs an absolute Java path, got {}",
            name,
            profile.java_path.display()
        )));
    }
    if !profile.java_path.is_file() {
        return Err(Error::ConfigValidation(format!(
            "Server '{}' Java executable not found at {}",
            name,
            profile.java_path.display()
        )));
    }

    if !profile.working_dir.is_dir() {
        return Err(Error::ConfigValidation(format!(
            "Server '{}' working directory {} does not exist",
            name,
            profile.working_dir.display()
        )));
    }

    let jar = std::path::Path::new(&profile.jar);
    if profile.jar.is_empty() || jar.components().count() != 1 {
        return Err(Error::ConfigValidation(format!(
            "Server '{}' jar must be a file name inside the working directory, got '{}'",
            name, profile.jar
        )));
    }
    if !profile.jar_path().is_file() {
        return Err(Error::ConfigValidation(format!(
            "Server '{}' jar {} not found",
            name,
            profile.jar_path().display()
        )));
    }

    validate_memory_args(name, &profile.jvm_args)
}

/// Full configuration validation
pub fn validate_config(config: &Config) -> Result<()> {
    if config.instances.is_empty() {
        return Err(Error::ConfigInvalid("No instances configured".to_string()));
    }
    if config.supervisor.max_crashes == 0 {
        return Err(Error::ConfigInvalid(
            "maxCrashes must be at least 1".to_string(),
        ));
    }

    for (name, profile) in &config.instances {
        validate_profile(name, profile)?;
    }

    Ok(())
}
