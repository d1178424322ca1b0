//! Cache maintenance: age-based cleaning and full wipe.

use super::{Cache, LOCK_SUFFIX};
use crate::error::{Result, RowgenError};
use crate::fetch::PART_SUFFIX;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

impl Cache {
    /// Removes cached files last modified more than `max_age` ago.
    /// Lock files are left alone. Returns the removed cache paths.
    pub fn clean_cache(&self, max_age: Duration) -> Result<Vec<String>> {
        let now = SystemTime::now();
        self.remove_where(|modified| {
            now.duration_since(modified)
                .map(|age| age > max_age)
                .unwrap_or(false)
        })
    }

    /// Removes every cached file except lock files.
    pub fn nuke_cache(&self) -> Result<Vec<String>> {
        self.remove_where(|_| true)
    }

    fn remove_where(&self, expired: impl Fn(SystemTime) -> bool) -> Result<Vec<String>> {
        let files = self
            .fs
            .list_files()
            .map_err(|e| RowgenError::io(self.root_display(), e))?;
        let mut removed = Vec::new();
        for (path, modified) in files {
            if path.ends_with(LOCK_SUFFIX) || !expired(modified) {
                continue;
            }
            // wait out any writer of this entry
            let entry = path.strip_suffix(PART_SUFFIX).unwrap_or(&path);
            let _guard = self.acquire_lock(entry)?;
            if !self.fs.exists(&path) {
                continue;
            }
            self.remove(&path)?;
            tracing::debug!(cache_path = %path, "removed cached file");
            removed.push(path);
        }
        tracing::info!(count = removed.len(), "cache cleaned");
        Ok(removed)
    }

    fn root_display(&self) -> PathBuf {
        self.fs.native_path("").unwrap_or_else(|| PathBuf::from("<memory>"))
    }
}
