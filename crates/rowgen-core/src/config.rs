use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable that overrides the cache root.
pub const CACHE_ENV: &str = "ROWGEN_CACHE";

/// Global configuration loaded from `~/.config/rowgen/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowgenConfig {
    /// Cache root; `ROWGEN_CACHE` wins over this, and the XDG cache dir is
    /// used when neither is set.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    /// Seconds allowed for establishing a connection.
    pub connect_timeout_secs: u64,
    /// Optional limit on a whole transfer in seconds (None = no limit).
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Transfer buffer size in bytes.
    pub buffer_bytes: usize,
    /// Cached files older than this are removed by `clean-cache`.
    pub max_cache_age_hours: u64,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for RowgenConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            connect_timeout_secs: 15,
            timeout_secs: None,
            buffer_bytes: 64 * 1024,
            max_cache_age_hours: 4,
            user_agent: None,
        }
    }
}

impl RowgenConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn max_cache_age(&self) -> Duration {
        hours(self.max_cache_age_hours)
    }

    /// Directory holding cached resources.
    pub fn cache_root(&self) -> Result<PathBuf> {
        let env = std::env::var_os(CACHE_ENV).map(PathBuf::from);
        pick_cache_root(env, self.cache_dir.clone())
    }
}

/// `n` hours, saturating instead of overflowing.
pub fn hours(n: u64) -> Duration {
    Duration::from_secs(n.saturating_mul(3600))
}

fn pick_cache_root(env: Option<PathBuf>, configured: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = env.filter(|p| !p.as_os_str().is_empty()) {
        return Ok(dir);
    }
    if let Some(dir) = configured {
        return Ok(dir);
    }
    let xdg_dirs = xdg::BaseDirectories::with_prefix("rowgen")?;
    Ok(xdg_dirs.get_cache_home().join("rowgen"))
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("rowgen")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<RowgenConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = RowgenConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml).with_context(|| format!("write {}", path.display()))?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    let cfg: RowgenConfig =
        toml::from_str(&data).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}
