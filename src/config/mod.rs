//! Configuration module
//!
//! Handles CLI argument parsing, TOML configuration files, and the merge into
//! a resolved `Config`. Precedence: explicit CLI flag > config file > default.

pub mod cli;
pub mod toml;

use crate::Result;
use cli::Cli;
use self::toml::TomlConfig;
use std::path::PathBuf;

pub use cli::{ExecutionMode, MatcherKind};

/// Resolved run configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Problem description file
    pub input: PathBuf,
    /// Result file
    pub output: PathBuf,
    /// Optional machine-readable summary
    pub json_summary: Option<PathBuf>,
    /// Worker service processes to launch in standalone mode
    pub local_workers: usize,
    pub search: SearchConfig,
    pub runtime: RuntimeConfig,
}

/// Worker-local search tuning
#[derive(Debug, Clone, Copy)]
pub struct SearchConfig {
    /// Concurrent comparison tasks per worker
    pub threads: usize,
    /// Accelerator device count for per-task device hints
    pub devices: usize,
    /// Comparison backend
    pub matcher: MatcherKind,
}

/// Runtime behavior
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeConfig {
    pub debug: bool,
}

impl Config {
    /// Merge the CLI with an optional config file into a resolved Config.
    pub fn resolve(cli: &Cli) -> Result<Self> {
        let file = match &cli.config {
            Some(path) => TomlConfig::load(path)?,
            None => TomlConfig::default(),
        };

        Ok(Self {
            input: cli
                .input
                .clone()
                .or(file.input)
                .unwrap_or_else(|| PathBuf::from("input.txt")),
            output: cli
                .output
                .clone()
                .or(file.output)
                .unwrap_or_else(|| PathBuf::from("output.txt")),
            json_summary: cli.json_summary.clone().or(file.json_summary),
            local_workers: cli.local_workers.or(file.local_workers).unwrap_or(1),
            search: SearchConfig {
                threads: cli
                    .search_threads
                    .or(file.search_threads)
                    .unwrap_or_else(num_cpus::get),
                devices: cli.devices.or(file.devices).unwrap_or(1),
                matcher: cli.matcher.or(file.matcher).unwrap_or(MatcherKind::Cpu),
            },
            runtime: RuntimeConfig { debug: cli.debug },
        })
    }
}
