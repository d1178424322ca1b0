//! `rowgen inspect` and `rowgen enumerate`: list what a resource contains.

use super::build_fetcher;
use anyhow::Result;
use rowgen_core::config::RowgenConfig;
use rowgen_core::{enumerate_contents, inspect, Overrides, SourceSpec};

fn print_urls(specs: &[SourceSpec]) {
    for s in specs {
        println!("{}", s.rebuild_url());
    }
}

pub fn run_inspect(cfg: &RowgenConfig, url: &str, overrides: Overrides) -> Result<()> {
    let spec = SourceSpec::parse_with(url, overrides);
    let children = inspect(&build_fetcher(cfg)?, &spec)?;
    print_urls(&children);
    Ok(())
}

pub fn run_enumerate(cfg: &RowgenConfig, url: &str, overrides: Overrides) -> Result<()> {
    let spec = SourceSpec::parse_with(url, overrides);
    let targets = enumerate_contents(&build_fetcher(cfg)?, &spec)?;
    if targets.is_empty() {
        println!("No readable targets in {}.", spec.name());
    }
    print_urls(&targets);
    Ok(())
}
