//! Cache maintenance: `cache-path`, `clean-cache` and `nuke-cache`.

use super::open_cache;
use anyhow::Result;
use rowgen_core::config::{self, RowgenConfig};
use rowgen_core::{cache_path_for, SourceSpec};
use std::time::Duration;

/// Print the cache-relative path for the resource `url` names.
pub fn run_cache_path(url: &str) -> Result<()> {
    let spec = SourceSpec::parse(url);
    println!("{}", cache_path_for(spec.resource_url())?);
    Ok(())
}

fn max_age(cfg: &RowgenConfig, max_age_hours: Option<u64>) -> Duration {
    max_age_hours.map_or_else(|| cfg.max_cache_age(), config::hours)
}

pub fn run_clean_cache(cfg: &RowgenConfig, max_age_hours: Option<u64>) -> Result<()> {
    let removed = open_cache(cfg)?.clean_cache(max_age(cfg, max_age_hours))?;
    println!("Removed {} cached file(s).", removed.len());
    Ok(())
}

pub fn run_nuke_cache(cfg: &RowgenConfig) -> Result<()> {
    let removed = open_cache(cfg)?.nuke_cache()?;
    println!("Removed {} cached file(s).", removed.len());
    Ok(())
}
