// src/logging.rs

//! Subscriber setup for the `collab` binary.
//!
//! The filter comes from the first source that yields one:
//! `--log-level`, then `COLLAB_LOG` (full `EnvFilter` directive syntax, so
//! `collab::dag=debug,warn` works), then plain `info`. An unparsable
//! `COLLAB_LOG` falls back to `info` with a warning once logging is up.
//!
//! Output goes to stderr; stdout is reserved for the stage report.

use anyhow::Result;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::cli::LogLevel;

const ENV_VAR: &str = "COLLAB_LOG";
const DEFAULT_DIRECTIVE: &str = "info";

/// Install the global subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env = std::env::var(ENV_VAR).ok();
    let (filter, rejected) = select_filter(cli_level, env.as_deref());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing tracing subscriber: {e}"))?;

    if let Some(bad) = rejected {
        warn!(value = %bad, "ignoring unparsable {ENV_VAR}; using {DEFAULT_DIRECTIVE}");
    }
    Ok(())
}

/// Pick the filter. The second value is an env setting that was present but
/// could not be parsed.
fn select_filter(cli_level: Option<LogLevel>, env: Option<&str>) -> (EnvFilter, Option<String>) {
    if let Some(level) = cli_level {
        return (EnvFilter::new(directive(level)), None);
    }

    match env.map(str::trim).filter(|s| !s.is_empty()) {
        None => (EnvFilter::new(DEFAULT_DIRECTIVE), None),
        Some(raw) => match EnvFilter::try_new(raw) {
            Ok(filter) => (filter, None),
            Err(_) => (EnvFilter::new(DEFAULT_DIRECTIVE), Some(raw.to_string())),
        },
    }
}

fn directive(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}
