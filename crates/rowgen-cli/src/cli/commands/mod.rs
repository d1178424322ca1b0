//! CLI command handlers, one file per subcommand.

mod cache;
mod fetch;
mod inspect;
mod resolve;

pub use cache::{run_cache_path, run_clean_cache, run_nuke_cache};
pub use fetch::run_fetch;
pub use inspect::{run_enumerate, run_inspect};
pub use resolve::run_resolve;

use anyhow::{Context, Result};
use rowgen_core::config::RowgenConfig;
use rowgen_core::fetch::TransferSettings;
use rowgen_core::{Cache, Fetcher};

/// Disk cache at the configured root.
pub(crate) fn open_cache(cfg: &RowgenConfig) -> Result<Cache> {
    let root = cfg.cache_root()?;
    tracing::debug!(root = %root.display(), "using cache");
    Ok(Cache::open_dir(root))
}

/// Fetcher over the configured cache; relative locators resolve against the
/// current directory.
pub(crate) fn build_fetcher(cfg: &RowgenConfig) -> Result<Fetcher> {
    let cwd = std::env::current_dir().context("reading current directory")?;
    Ok(Fetcher::new(open_cache(cfg)?)
        .with_settings(TransferSettings::from(cfg))
        .with_working_dir(cwd))
}
