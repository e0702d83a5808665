//! Configuration loading from duel.toml
//!
//! DuelBench configuration can be specified in a `duel.toml` file in the project root.
//! The configuration is automatically discovered by walking up from the current directory.
//! Command-line flags take precedence over file values.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name looked up during discovery
pub const CONFIG_FILE: &str = "duel.toml";

/// DuelBench configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DuelConfig {
    /// Runner configuration
    #[serde(default)]
    pub runner: RunnerConfig,
    /// Which registered systems to compare
    #[serde(default)]
    pub systems: SystemsConfig,
    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,
}

/// Runner configuration for worker execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Iterations each worker runs
    #[serde(default = "default_iterations")]
    pub iterations: u64,
    /// Bound on a single worker run (e.g., "300s", "5m"); "0" waits indefinitely
    #[serde(default = "default_timeout")]
    pub timeout: String,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            iterations: default_iterations(),
            timeout: default_timeout(),
        }
    }
}

fn default_iterations() -> u64 {
    5
}
fn default_timeout() -> String {
    "0".to_string()
}

/// System selection; unset entries fall back to registration order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemsConfig {
    /// Reference system id
    #[serde(default)]
    pub baseline: Option<String>,
    /// Evaluated system id
    #[serde(default)]
    pub candidate: Option<String>,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Default output format: "human" or "json"
    #[serde(default = "default_format")]
    pub format: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
        }
    }
}

fn default_format() -> String {
    "human".to_string()
}

impl DuelConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Find `duel.toml` in `start` or any of its ancestors
    pub fn find_from(start: impl Into<PathBuf>) -> Option<PathBuf> {
        let mut dir = start.into();
        loop {
            let config_path = dir.join(CONFIG_FILE);
            if config_path.is_file() {
                return Some(config_path);
            }
            if !dir.pop() {
                return None;
            }
        }
    }

    /// Try to discover and load configuration by walking up from current directory
    pub fn discover() -> Option<Self> {
        let dir = std::env::current_dir().ok()?;
        let path = Self::find_from(dir)?;
        match Self::load(&path) {
            Ok(config) => {
                tracing::debug!(path = %path.display(), "loaded configuration");
                Some(config)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable configuration");
                None
            }
        }
    }

    /// Worker timeout, `None` when disabled
    pub fn timeout(&self) -> anyhow::Result<Option<Duration>> {
        parse_timeout(&self.runner.timeout)
    }

    /// Generate a default configuration as TOML string
    pub fn default_toml() -> String {
        r#"# DuelBench Configuration
# https://github.com/ml-rust/duelbench

[runner]
# Iterations each worker runs
iterations = 5
# Bound on a single worker run ("0" waits indefinitely)
timeout = "0"

[systems]
# Reference and evaluated system ids (default: first two registered)
# baseline = "btree"
# candidate = "hash"

[output]
# Output format: human or json
format = "human"
"#
        .to_string()
    }
}

/// Parse duration string (e.g., "3s", "500ms", "2m") to nanoseconds
pub fn parse_duration(s: &str) -> anyhow::Result<u64> {
    let s = s.trim();
    if s.is_empty() {
        return Err(anyhow::anyhow!("Empty duration string"));
    }

    // Find where the number ends and unit begins
    let (num_part, unit_part) = s
        .char_indices()
        .find(|(_, c)| c.is_alphabetic())
        .map(|(i, _)| s.split_at(i))
        .unwrap_or((s, "s"));

    let value: f64 = num_part
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid duration number: {}", num_part))?;
    if !value.is_finite() || value < 0.0 {
        return Err(anyhow::anyhow!("Invalid duration number: {}", num_part));
    }

    let multiplier: u64 = match unit_part.to_lowercase().as_str() {
        "ns" => 1,
        "us" | "µs" => 1_000,
        "ms" => 1_000_000,
        "s" | "" => 1_000_000_000,
        "m" | "min" => 60_000_000_000,
        _ => return Err(anyhow::anyhow!("Unknown duration unit: {}", unit_part)),
    };

    Ok((value * multiplier as f64) as u64)
}

/// Parse a timeout where zero disables the bound
pub fn parse_timeout(s: &str) -> anyhow::Result<Option<Duration>> {
    let nanos = parse_duration(s)?;
    Ok((nanos > 0).then(|| Duration::from_nanos(nanos)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DuelConfig::default();
        assert_eq!(config.runner.iterations, 5);
        assert_eq!(config.output.format, "human");
        assert!(config.systems.baseline.is_none());
        assert_eq!(config.timeout().unwrap(), None);
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("3s").unwrap(), 3_000_000_000);
        assert_eq!(parse_duration("500ms").unwrap(), 500_000_000);
        assert_eq!(parse_duration("100us").unwrap(), 100_000);
        assert_eq!(parse_duration("1000ns").unwrap(), 1000);
        assert_eq!(parse_duration("2m").unwrap(), 120_000_000_000);
        assert_eq!(parse_duration("1.5s").unwrap(), 1_500_000_000);
        assert_eq!(parse_duration("30").unwrap(), 30_000_000_000);
        assert!(parse_duration("").is_err());
        assert!(parse_duration("5 fortnights").is_err());
        assert!(parse_duration("-1s").is_err());
    }

    #[test]
    fn test_parse_timeout() {
        assert_eq!(parse_timeout("0").unwrap(), None);
        assert_eq!(parse_timeout("0s").unwrap(), None);
        assert_eq!(
            parse_timeout("300s").unwrap(),
            Some(Duration::from_secs(300))
        );
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
            [runner]
            iterations = 12
            timeout = "60s"

            [systems]
            baseline = "btree"
        "#;

        let config: DuelConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.runner.iterations, 12);
        assert_eq!(config.timeout().unwrap(), Some(Duration::from_secs(60)));
        assert_eq!(config.systems.baseline.as_deref(), Some("btree"));
        assert!(config.systems.candidate.is_none());
        // Defaults should still apply
        assert_eq!(config.output.format, "human");
    }

    #[test]
    fn test_default_toml_parses() {
        let config: DuelConfig = toml::from_str(&DuelConfig::default_toml()).unwrap();
        assert_eq!(config.runner.iterations, 5);
        assert_eq!(config.output.format, "human");
    }

    #[test]
    fn test_find_from_walks_up() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(root.path().join(CONFIG_FILE), "[runner]\niterations = 9\n").unwrap();

        let found = DuelConfig::find_from(&nested).unwrap();
        assert_eq!(found, root.path().join(CONFIG_FILE));
        assert_eq!(DuelConfig::load(&found).unwrap().runner.iterations, 9);
    }

    #[test]
    fn test_find_from_prefers_nearest() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("inner");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(root.path().join(CONFIG_FILE), "").unwrap();
        std::fs::write(nested.join(CONFIG_FILE), "").unwrap();

        assert_eq!(
            DuelConfig::find_from(&nested).unwrap(),
            nested.join(CONFIG_FILE)
        );
    }

    #[test]
    fn test_load_rejects_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[runner\niterations = ").unwrap();
        assert!(DuelConfig::load(&path).is_err());
    }
}
