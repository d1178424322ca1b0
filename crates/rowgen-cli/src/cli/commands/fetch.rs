//! `rowgen fetch`: download a resource into the cache.

use super::build_fetcher;
use anyhow::Result;
use rowgen_core::checksum;
use rowgen_core::config::RowgenConfig;
use rowgen_core::{Overrides, SourceSpec};

pub fn run_fetch(
    cfg: &RowgenConfig,
    url: &str,
    overrides: Overrides,
    clean: bool,
    with_checksum: bool,
) -> Result<()> {
    let spec = SourceSpec::parse_with(url, overrides);
    let fetcher = build_fetcher(cfg)?;
    let fetched = fetcher.download_and_cache(&spec, clean)?;

    let Some(path) = fetched.sys_path.as_deref() else {
        println!("{}", fetched.cache_path.as_deref().unwrap_or(spec.resource_url()));
        return Ok(());
    };
    if with_checksum {
        let digest = checksum::sha256_path(path)?;
        println!("{}  {}", digest, path.display());
    } else {
        println!("{}", path.display());
    }
    if fetched.download_time.is_none() {
        tracing::info!(path = %path.display(), "served from cache");
    }
    Ok(())
}
