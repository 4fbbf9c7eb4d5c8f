//! TOML configuration for the `keel` tool.
//!
//! ```toml
//! [placement]
//! partition_count = 271
//! replication_factor = 20
//! load = 1.25
//!
//! [[members]]
//! id = "cache-1"
//! weight = 2
//!
//! [[members]]
//! id = "cache-2"
//!
//! [log]
//! level = "debug"
//! ```

use std::path::Path;

use anyhow::{Context, bail};
use keel_placement::{Node, PlacementConfig};
use serde::Deserialize;

/// Top-level configuration, parsed from TOML.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Ring tuning.
    pub placement: PlacementConfig,
    /// Initial ring members.
    pub members: Vec<Node>,
    /// Logging configuration.
    pub log: LogSection,
}

/// `[log]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LogSection {
    /// Log level filter (e.g. `"info"`, `"debug"`, `"warn"`).
    pub level: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl CliConfig {
    /// Load config from a TOML file, or use defaults if no path is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(p) => {
                let content = std::fs::read_to_string(p)
                    .with_context(|| format!("reading {}", p.display()))?;
                Self::from_toml(&content)
            }
            None => Ok(Self::default()),
        }
    }

    /// Parse config from a TOML string.
    pub fn from_toml(s: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(s)?)
    }
}

/// Parse a member given on the command line as `id` or `id=weight`.
pub fn parse_member(s: &str) -> anyhow::Result<Node> {
    let (id, weight) = match s.rsplit_once('=') {
        Some((id, weight)) => {
            let weight = weight
                .trim()
                .parse::<i64>()
                .with_context(|| format!("invalid weight in {s:?}"))?;
            (id.trim(), weight)
        }
        None => (s.trim(), 1),
    };
    if id.is_empty() {
        bail!("member identity is empty in {s:?}");
    }
    Ok(Node::new(id, weight))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[placement]
partition_count = 101
replication_factor = 10
load = 1.5

[[members]]
id = "cache-1"
weight = 2

[[members]]
id = "cache-2"

[log]
level = "debug"
"#;

        let config = CliConfig::from_toml(toml).unwrap();
        assert_eq!(config.placement.partition_count, 101);
        assert_eq!(config.placement.replication_factor, 10);
        assert_eq!(config.placement.load, 1.5);
        assert_eq!(
            config.members,
            vec![Node::new("cache-1", 2), Node::new("cache-2", 1)]
        );
        assert_eq!(config.log.level, "debug");
    }

    #[test]
    fn test_parse_minimal_config() {
        let config = CliConfig::from_toml("").unwrap();
        assert_eq!(config.placement, PlacementConfig::default());
        assert!(config.members.is_empty());
        assert_eq!(config.log.level, "warn");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keel.toml");
        std::fs::write(
            &path,
            r#"
[placement]
partition_count = 71

[[members]]
id = "a"
weight = 3
"#,
        )
        .unwrap();

        let config = CliConfig::load(Some(&path)).unwrap();
        assert_eq!(config.placement.partition_count, 71);
        assert_eq!(config.members, vec![Node::new("a", 3)]);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(CliConfig::load(Some(&dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn test_parse_member() {
        assert_eq!(parse_member("cache-1").unwrap(), Node::new("cache-1", 1));
        assert_eq!(parse_member("cache-1=4").unwrap(), Node::new("cache-1", 4));
        assert_eq!(
            parse_member("10.0.0.7:11211=2").unwrap(),
            Node::new("10.0.0.7:11211", 2)
        );
        assert!(parse_member("cache-1=heavy").is_err());
        assert!(parse_member("=2").is_err());
    }
}
