//! Tracing subscriber setup for the `rowgen` binary.
//!
//! Events go to `$XDG_STATE_HOME/rowgen/rowgen.log`. The filter comes from
//! `ROWGEN_LOG`, then `RUST_LOG`, then [`DEFAULT_FILTER`].

use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a filter directive for rowgen's logs.
pub const LOG_ENV: &str = "ROWGEN_LOG";

pub const DEFAULT_FILTER: &str = "info,rowgen=debug,rowgen_core=debug";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Where [`init_logging`] appends.
pub fn log_file_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("rowgen")?;
    Ok(xdg_dirs.get_state_home().join("rowgen").join("rowgen.log"))
}

/// Installs a subscriber appending to [`log_file_path`] and returns that path.
///
/// Fails without installing anything when the file cannot be opened.
pub fn init_logging() -> Result<PathBuf> {
    let path = log_file_path()?;
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing subscriber: {}", e))?;

    tracing::info!(log = %path.display(), "rowgen logging initialized");
    Ok(path)
}

/// Installs a subscriber writing to stderr. Does nothing if one is already set.
pub fn init_logging_stderr() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}
