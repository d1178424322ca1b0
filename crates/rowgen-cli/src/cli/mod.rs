//! CLI for rowgen locator resolution and the resource cache.

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use rowgen_core::config;
use rowgen_core::Overrides;

use commands::{
    run_cache_path, run_clean_cache, run_enumerate, run_fetch, run_inspect, run_nuke_cache,
    run_resolve,
};

/// Top-level CLI for rowgen.
#[derive(Debug, Parser)]
#[command(name = "rowgen")]
#[command(about = "rowgen: resolve, fetch and cache tabular data sources", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

/// Explicit descriptor fields; anything set here wins over what the locator implies.
#[derive(Debug, Default, Args)]
pub struct OverrideArgs {
    /// Protocol to use instead of the URL scheme (e.g. `http`, `s3`).
    #[arg(long)]
    pub proto: Option<String>,
    /// Format of the fetched resource.
    #[arg(long)]
    pub resource_format: Option<String>,
    /// Archive entry to read (exact name or regular expression).
    #[arg(long)]
    pub target_file: Option<String>,
    /// Format of the target.
    #[arg(long)]
    pub target_format: Option<String>,
    /// Worksheet name or index within the target.
    #[arg(long)]
    pub target_segment: Option<String>,
    /// Text encoding of the target.
    #[arg(long)]
    pub encoding: Option<String>,
    /// Treat the resource as a zip archive whatever its extension.
    #[arg(long)]
    pub force_archive: bool,
}

impl From<OverrideArgs> for Overrides {
    fn from(a: OverrideArgs) -> Self {
        Overrides {
            proto: a.proto,
            resource_format: a.resource_format,
            target_file: a.target_file,
            target_format: a.target_format,
            target_segment: a.target_segment,
            encoding: a.encoding,
            force_archive: a.force_archive,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Resolve a locator and print its descriptor as JSON.
    Resolve {
        /// Locator (URL, path or reference).
        url: String,
        #[command(flatten)]
        overrides: OverrideArgs,
    },

    /// Download a resource into the cache and print where it landed.
    Fetch {
        url: String,
        /// Remove any cached copy and download again.
        #[arg(long)]
        clean: bool,
        /// Also print the SHA-256 of the fetched file.
        #[arg(long)]
        checksum: bool,
        #[command(flatten)]
        overrides: OverrideArgs,
    },

    /// List what a resource contains one level down (archive entries or worksheets).
    Inspect {
        url: String,
        #[command(flatten)]
        overrides: OverrideArgs,
    },

    /// List every directly readable target inside a resource.
    Enumerate {
        url: String,
        #[command(flatten)]
        overrides: OverrideArgs,
    },

    /// Print the cache-relative path a resource URL maps to.
    CachePath {
        url: String,
    },

    /// Remove cached files older than the given age.
    CleanCache {
        /// Maximum age in hours (default from config).
        #[arg(long, value_name = "N")]
        max_age_hours: Option<u64>,
    },

    /// Remove every cached file.
    NukeCache,
}

impl CliCommand {
    pub fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Resolve { url, overrides } => run_resolve(&url, overrides.into())?,
            CliCommand::Fetch {
                url,
                clean,
                checksum,
                overrides,
            } => run_fetch(&cfg, &url, overrides.into(), clean, checksum)?,
            CliCommand::Inspect { url, overrides } => run_inspect(&cfg, &url, overrides.into())?,
            CliCommand::Enumerate { url, overrides } => {
                run_enumerate(&cfg, &url, overrides.into())?
            }
            CliCommand::CachePath { url } => run_cache_path(&url)?,
            CliCommand::CleanCache { max_age_hours } => run_clean_cache(&cfg, max_age_hours)?,
            CliCommand::NukeCache => run_nuke_cache(&cfg)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
