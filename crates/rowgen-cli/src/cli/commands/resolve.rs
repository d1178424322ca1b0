//! `rowgen resolve`: print the descriptor a locator resolves to.

use anyhow::Result;
use rowgen_core::{Overrides, SourceSpec};

pub fn run_resolve(url: &str, overrides: Overrides) -> Result<()> {
    let spec = SourceSpec::parse_with(url, overrides);
    println!("{}", serde_json::to_string_pretty(&spec)?);
    Ok(())
}
