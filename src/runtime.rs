//! Java runtime requirements.
//!
//! Which Java major version a Minecraft release needs is kept as data
//! (`RuntimePolicy`) rather than as thresholds in code, so the table can be
//! adjusted per deployment from the configuration file.

use crate::error::{Error, Result};
use crate::profile::ServerProfile;
use async_process::Command;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::Path;

/// "Minecraft `minecraft` and newer need Java `java`."
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeRule {
    pub minecraft: String,
    pub java: u32,
}

/// Ordered set of runtime rules. The rule with the highest `minecraft`
/// version not above the server's version wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuntimePolicy {
    pub rules: Vec<RuntimeRule>,
}

impl Default for RuntimePolicy {
    fn default() -> Self {
        let rule = |minecraft: &str, java| RuntimeRule {
            minecraft: minecraft.to_string(),
            java,
        };
        Self {
            rules: vec![
                rule("1.20.5", 21),
                rule("1.18", 17),
                rule("1.17", 16),
                rule("1.0", 8),
            ],
        }
    }
}

impl RuntimePolicy {
    /// Java major version required by `minecraft_version`.
    ///
    /// # Examples
    ///
    /// ```
    /// use mc_runner::runtime::RuntimePolicy;
    ///
    /// let policy = RuntimePolicy::default();
    /// assert_eq!(policy.required_java("1.21.1").unwrap(), 21);
    /// assert_eq!(policy.required_java("1.20.4").unwrap(), 17);
    /// assert_eq!(policy.required_java("1.12.2").unwrap(), 8);
    /// ```
    pub fn required_java(&self, minecraft_version: &str) -> Result<u32> {
        let version = parse_release(minecraft_version).ok_or_else(|| {
            Error::ConfigValidation(format!(
                "Unrecognised Minecraft version '{}'",
                minecraft_version
            ))
        })?;

        let mut best: Option<(Vec<u32>, u32)> = None;
        for rule in &self.rules {
            let Some(min) = parse_release(&rule.minecraft) else {
                tracing::warn!(rule = %rule.minecraft, "Ignoring unparseable runtime rule");
                continue;
            };
            if compare_release(&min, &version) == Ordering::Greater {
                continue;
            }
            let better = best
                .as_ref()
                .is_none_or(|(current, _)| compare_release(&min, current) == Ordering::Greater);
            if better {
                best = Some((min, rule.java));
            }
        }

        best.map(|(_, java)| java).ok_or_else(|| {
            Error::ConfigValidation(format!(
                "No runtime rule covers Minecraft {}",
                minecraft_version
            ))
        })
    }
}

/// Parses "1.20.5" into `[1, 20, 5]`. Snapshots and other shapes yield `None`.
fn parse_release(version: &str) -> Option<Vec<u32>> {
    version
        .trim()
        .split('.')
        .map(|part| part.parse::<u32>().ok())
        .collect()
}

/// Compares release numbers with missing trailing components as zero.
fn compare_release(a: &[u32], b: &[u32]) -> Ordering {
    let len = a.len().max(b.len());
    (0..len)
        .map(|i| {
            let left = a.get(i).copied().unwrap_or(0);
            let right = b.get(i).copied().unwrap_or(0);
            left.cmp(&right)
        })
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Extracts the major version from the first line of `java -version`.
///
/// Handles both `openjdk version "21.0.2"` and the legacy `"1.8.0_402"` form.
pub fn parse_java_major(first_line: &str) -> Result<u32> {
    let unparseable =
        || Error::ConfigValidation(format!("Failed to parse java version output: {}", first_line));

    let version = match first_line.split('"').nth(1) {
        Some(quoted) => quoted,
        None => first_line
            .split_whitespace()
            .find(|token| token.starts_with(|c: char| c.is_ascii_digit()))
            .ok_or_else(unparseable)?,
    };

    let mut parts = version.split(['.', '_', '-', '+']);
    let first = parts.next().unwrap_or_default();
    let major = if first == "1" {
        parts.next().unwrap_or_default()
    } else {
        first
    };

    major.parse::<u32>().map_err(|_| unparseable())
}

/// Runs `<java> -version` and returns its major version.
pub async fn detect_java_major(java_path: &Path) -> Result<u32> {
    let output = Command::new(java_path)
        .arg("-version")
        .output()
        .await
        .map_err(|e| {
            Error::ConfigValidation(format!("Failed to run {} -version: {}", java_path.display(), e))
        })?;

    // java prints its version banner to stderr.
    let text = String::from_utf8_lossy(&output.stderr);
    let first = text.lines().next().unwrap_or_default();
    parse_java_major(first)
}

/// Checks that the profile's Java is new enough for its Minecraft version.
///
/// Profiles without a `minecraft_version` pass without running Java.
#[tracing::instrument(skip_all, fields(java = %profile.java_path.display()))]
pub async fn check_runtime(profile: &ServerProfile, policy: &RuntimePolicy) -> Result<()> {
    let Some(version) = profile.minecraft_version.as_deref() else {
        return Ok(());
    };

    let required = policy.required_java(version)?;
    let installed = detect_java_major(&profile.java_path).await?;
    tracing::debug!(required, installed, minecraft = version, "Checked Java runtime");

    if installed < required {
        return Err(Error::ConfigValidation(format!(
            "Minecraft {} needs Java {} but {} is Java {}",
            version,
            required,
            profile.java_path.display(),
            installed
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_java_major_modern() {
        assert_eq!(parse_java_major("openjdk version \"21.0.2\" 2024-01-16").unwrap(), 21);
        assert_eq!(parse_java_major("openjdk 17.0.9 2023-10-17").unwrap(), 17);
        assert_eq!(parse_java_major("openjdk version \"22\" 2024-03-19").unwrap(), 22);
    }

    #[test]
    fn test_parse_java_major_legacy() {
        assert_eq!(parse_java_major("java version \"1.8.0_402\"").unwrap(), 8);
    }

    #[test]
    fn test_parse_java_major_rejects_garbage() {
        assert!(parse_java_major("not java").is_err());
        assert!(parse_java_major("openjdk version \"abc\"").is_err());
    }

    #[test]
    fn test_required_java_boundaries() {
        let policy = RuntimePolicy::default();
        assert_eq!(policy.required_java("1.20.5").unwrap(), 21);
        assert_eq!(policy.required_java("1.18").unwrap(), 17);
        assert_eq!(policy.required_java("1.18.2").unwrap(), 17);
        assert_eq!(policy.required_java("1.17.1").unwrap(), 16);
        assert_eq!(policy.required_java("1.16.5").unwrap(), 8);
    }

    #[test]
    fn test_required_java_custom_table() {
        let policy: RuntimePolicy = serde_json::from_str(
            r#"[{"minecraft": "1.21", "java": 21}, {"minecraft": "1.0", "java": 17}]"#,
        )
        .unwrap();
        assert_eq!(policy.required_java("1.20.6").unwrap(), 17);
        assert_eq!(policy.required_java("1.21").unwrap(), 21);
    }

    #[test]
    fn test_required_java_rejects_snapshots_and_uncovered() {
        let policy = RuntimePolicy::default();
        assert!(policy.required_java("24w14a").is_err());

        let narrow = RuntimePolicy {
            rules: vec![RuntimeRule {
                minecraft: "1.20".to_string(),
                java: 17,
            }],
        };
        assert!(narrow.required_java("1.19.4").is_err());
    }
}
