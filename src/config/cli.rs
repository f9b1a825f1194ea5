//! CLI argument parsing using clap

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Execution mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExecutionMode {
    /// Standalone mode (default) - coordinator plus local worker services
    Standalone,
    /// Coordinator mode - orchestrate remote worker services
    Coordinator,
    /// Service mode - run a worker service (accepts coordinator commands)
    Service,
}

/// Matcher backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatcherKind {
    /// Sliding-window comparison on the local CPU
    Cpu,
}

/// gridmatch - Distributed template matching for square integer grids
#[derive(Parser, Debug)]
#[command(name = "gridmatch")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Execution mode: standalone, coordinator, or service
    #[arg(long, value_enum, default_value = "standalone")]
    pub mode: ExecutionMode,

    /// Port for the worker service to listen on (service mode only)
    #[arg(long, default_value = "9900")]
    pub listen_port: u16,

    /// Comma-separated worker addresses for coordinator mode (e.g., "10.0.1.10:9900,10.0.1.11:9900")
    #[arg(long)]
    pub host_list: Option<String>,

    /// File containing worker addresses (one per line, '#' comments; coordinator mode)
    #[arg(long)]
    pub workers_file: Option<PathBuf>,

    /// Port to connect to on workers when an address omits one (coordinator mode)
    #[arg(long, default_value = "9900")]
    pub worker_port: u16,

    /// Problem description file
    ///
    /// Not used in service mode (the coordinator broadcasts the object set)
    #[arg(value_name = "INPUT")]
    pub input: Option<PathBuf>,

    /// Result file, one line per picture in completion order
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Number of local worker service processes (standalone mode)
    #[arg(short = 'w', long)]
    pub local_workers: Option<usize>,

    /// Concurrent comparison tasks per worker (default: CPU count)
    #[arg(short = 't', long)]
    pub search_threads: Option<usize>,

    /// Accelerator device count used for per-task device hints
    #[arg(long)]
    pub devices: Option<usize>,

    /// Matcher backend
    #[arg(long, value_enum)]
    pub matcher: Option<MatcherKind>,

    /// Write a machine-readable run summary to this path
    #[arg(long)]
    pub json_summary: Option<PathBuf>,

    /// TOML configuration file; explicit flags take precedence over it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Mode-specific sanity checks, before anything is opened or spawned.
    pub fn validate(&self) -> anyhow::Result<()> {
        match self.mode {
            ExecutionMode::Standalone => {
                if self.local_workers == Some(0) {
                    anyhow::bail!(
                        "At least one worker is required (--local-workers must be >= 1)"
                    );
                }
                if self.host_list.is_some() || self.workers_file.is_some() {
                    anyhow::bail!(
                        "--host-list/--workers-file apply to coordinator mode; \
                         use --mode coordinator"
                    );
                }
            }
            ExecutionMode::Coordinator => {
                if self.host_list.is_none() && self.workers_file.is_none() {
                    anyhow::bail!("Coordinator mode requires --host-list or --workers-file");
                }
            }
            ExecutionMode::Service => {
                if self.input.is_some() {
                    anyhow::bail!(
                        "Service mode takes no input file; the coordinator broadcasts the problem"
                    );
                }
            }
        }

        if self.devices == Some(0) {
            anyhow::bail!("--devices must be >= 1");
        }
        if self.search_threads == Some(0) {
            anyhow::bail!("--search-threads must be >= 1");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli_from(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("gridmatch").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let cli = cli_from(&[]);
        assert_eq!(cli.mode, ExecutionMode::Standalone);
        assert_eq!(cli.listen_port, 9900);
        assert!(cli.input.is_none());
        assert!(cli.local_workers.is_none());
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_zero_local_workers_is_rejected() {
        let cli = cli_from(&["--local-workers", "0"]);
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_coordinator_requires_worker_addresses() {
        let cli = cli_from(&["--mode", "coordinator"]);
        assert!(cli.validate().is_err());

        let cli = cli_from(&["--mode", "coordinator", "--host-list", "a:1"]);
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_service_rejects_input_file() {
        let cli = cli_from(&["--mode", "service", "input.txt"]);
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_zero_devices_is_rejected() {
        let cli = cli_from(&["--devices", "0"]);
        assert!(cli.validate().is_err());
    }
}
