//! Structured logging to stderr through `log` + `fern`.
//!
//! Lines look like:
//! `[2026-10-19T16:32:10+02:00][INFO][smokedb::harness] Running read case`

use crate::error::{Error, Result};
use log::LevelFilter;

/// Environment variable holding the default log level
pub const LOG_ENV: &str = "SMOKEDB_LOG";

/// Pick the log level: `-q` wins, then `-v`/`-vv`, then the environment,
/// then `info`. Unparseable environment values fall back to `info`.
pub fn level_from_flags(verbose: u8, quiet: bool, env_value: Option<&str>) -> LevelFilter {
    if quiet {
        return LevelFilter::Error;
    }
    match verbose {
        0 => env_value
            .and_then(|v| v.trim().parse::<LevelFilter>().ok())
            .unwrap_or(LevelFilter::Info),
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Install the global logger. Fails if one is already installed.
pub fn init(level: LevelFilter) -> Result<()> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}][{}] {}",
                chrono::Local::now().to_rfc3339(),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()
        .map_err(|e| Error::Config(format!("Failed to install logger: {e}")))
}
