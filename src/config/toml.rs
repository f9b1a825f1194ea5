//! TOML configuration file support
//!
//! Every field is optional; a file value applies only when the matching CLI
//! flag was not passed explicitly. Unknown keys are rejected so typos fail
//! loudly instead of silently running with defaults.
//!
//! ```toml
//! input = "problems/run1.txt"
//! output = "results/run1.txt"
//! local-workers = 4
//! search-threads = 8
//! devices = 2
//! matcher = "cpu"
//! json-summary = "results/run1.json"
//! ```

use crate::config::MatcherKind;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct TomlConfig {
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub local_workers: Option<usize>,
    pub search_threads: Option<usize>,
    pub devices: Option<usize>,
    pub matcher: Option<MatcherKind>,
    pub json_summary: Option<PathBuf>,
}

impl TomlConfig {
    /// Load and parse a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_full_config_parses() {
        let file = write_config(
            "input = \"in.txt\"\n\
             output = \"out.txt\"\n\
             local-workers = 3\n\
             search-threads = 8\n\
             devices = 2\n\
             matcher = \"cpu\"\n\
             json-summary = \"run.json\"\n",
        );

        let config = TomlConfig::load(file.path()).unwrap();
        assert_eq!(config.input, Some(PathBuf::from("in.txt")));
        assert_eq!(config.local_workers, Some(3));
        assert_eq!(config.search_threads, Some(8));
        assert_eq!(config.devices, Some(2));
        assert_eq!(config.matcher, Some(MatcherKind::Cpu));
    }

    #[test]
    fn test_empty_config_is_all_defaults() {
        let file = write_config("");
        let config = TomlConfig::load(file.path()).unwrap();
        assert!(config.input.is_none());
        assert!(config.matcher.is_none());
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let file = write_config("worker-threads = 4\n");
        assert!(TomlConfig::load(file.path()).is_err());
    }
}
