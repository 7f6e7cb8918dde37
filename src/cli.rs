// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `collab`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "collab",
    version,
    about = "Run a dependency graph of stages concurrently.",
    long_about = None
)]
pub struct CliArgs {
    /// Pipeline file (TOML). Without it the built-in diamond pipeline runs.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Global timeout in milliseconds; overrides `[runner].timeout_ms`.
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `COLLAB_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Validate and print the pipeline without running it.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags() {
        let args = CliArgs::try_parse_from([
            "collab",
            "--config",
            "pipeline.toml",
            "--timeout-ms",
            "250",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(args.config.as_deref(), Some("pipeline.toml"));
        assert_eq!(args.timeout_ms, Some(250));
        assert!(matches!(args.log_level, Some(LogLevel::Debug)));
        assert!(!args.dry_run);
    }
}
