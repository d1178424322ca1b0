//! Cache key derivation and guarded access to cache entries.
//!
//! Layout: `{netloc}/{path}[/{sha224(query)}]` under the backend root, with a
//! sibling `{path}.lock` guarding writers when the backend has native paths.

mod fs;
mod lock;
mod maintenance;
mod mem;

pub use fs::{CacheFs, OsFs, ReadSeek};
pub use lock::{CacheLock, LOCK_SUFFIX};
pub use mem::MemFs;

use crate::checksum::sha224_hex;
use crate::error::{Result, RowgenError};
use crate::fetch::PART_SUFFIX;
use crate::url_model::{self, sanitize_cache_segment};
use std::path::PathBuf;
use std::sync::Arc;

/// Number of numbered alternates tried when a parent directory name is
/// already taken by a file.
const PARENT_ALTERNATES: usize = 10;

/// Deterministic cache path for a resource URL.
///
/// Userinfo is dropped from the netloc. A query string is hashed into an
/// extra path segment so parameterized endpoints sharing a path get distinct
/// entries. Segments never end in a sidecar suffix, so a resource cannot
/// land on another entry's lock or partial file.
pub fn cache_path_for(resource_url: &str) -> Result<String> {
    let parts = url_model::parse(resource_url);
    let host = parts.netloc.rsplit_once('@').map_or(parts.netloc.as_str(), |(_, h)| h);

    let mut segments: Vec<String> = Vec::new();
    segments.extend(sanitize_cache_segment(host));
    segments.extend(parts.path.split('/').filter_map(sanitize_cache_segment));
    if !parts.query.is_empty() {
        segments.push(sha224_hex(&parts.query));
    }
    if segments.is_empty() {
        return Err(RowgenError::resolution(
            resource_url,
            "locator has no host or path to cache under",
        ));
    }
    Ok(segments
        .into_iter()
        .map(escape_sidecar)
        .collect::<Vec<_>>()
        .join("/"))
}

/// Appends `_` to segments that could be mistaken for a `.lock` or `.part`
/// sidecar. Segments already ending in such a name plus underscores get one
/// more, so the mapping stays one-to-one.
fn escape_sidecar(seg: String) -> String {
    let stem = seg.trim_end_matches('_');
    if stem.ends_with(LOCK_SUFFIX) || stem.ends_with(PART_SUFFIX) {
        seg + "_"
    } else {
        seg
    }
}

fn parent_of(path: &str) -> Option<&str> {
    path.rsplit_once('/').map(|(dir, _)| dir)
}

fn lock_path(cache_path: &str) -> String {
    format!("{}{}", cache_path, LOCK_SUFFIX)
}

/// A cache rooted on some [`CacheFs`] backend.
#[derive(Debug, Clone)]
pub struct Cache {
    fs: Arc<dyn CacheFs>,
}

impl Cache {
    pub fn new(fs: Arc<dyn CacheFs>) -> Self {
        Self { fs }
    }

    /// Cache on local disk under `root`.
    pub fn open_dir(root: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(OsFs::new(root)))
    }

    /// Cache held entirely in memory.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemFs::new()))
    }

    pub fn fs(&self) -> &Arc<dyn CacheFs> {
        &self.fs
    }

    pub fn exists(&self, cache_path: &str) -> bool {
        self.fs.exists(cache_path)
    }

    pub fn native_path(&self, cache_path: &str) -> Option<PathBuf> {
        self.fs.native_path(cache_path)
    }

    /// Picks the final cache path for `resource_url` and creates its parent.
    ///
    /// When the parent directory name is already taken by a file (e.g.
    /// `host/api` cached before `host/api?x=1`), numbered alternates
    /// `host/api0` .. `host/api9` are tried in order. When the path itself is
    /// a directory, the same numbered names are used for the entry.
    pub fn prepare(&self, resource_url: &str) -> Result<String> {
        let cache_path = cache_path_for(resource_url)?;
        if self.fs.is_file(&cache_path) {
            return Ok(cache_path);
        }
        if self.fs.exists(&cache_path) {
            return self.alternate_leaf(&cache_path);
        }
        let Some(parent) = parent_of(&cache_path) else {
            return Ok(cache_path);
        };
        let first_err = match self.fs.makedirs(parent) {
            Ok(()) => return Ok(cache_path),
            Err(e) => e,
        };

        let name = &cache_path[parent.len() + 1..];
        for i in 0..PARENT_ALTERNATES {
            let alt = format!("{}{}/{}", parent, i, name);
            if self.fs.is_file(&alt) {
                return Ok(alt);
            }
            if let Some(alt_parent) = parent_of(&alt) {
                if self.fs.makedirs(alt_parent).is_ok() {
                    tracing::debug!(%cache_path, %alt, "using alternate cache path");
                    return Ok(alt);
                }
            }
        }
        Err(RowgenError::io(
            self.fs.native_path(parent).unwrap_or_else(|| PathBuf::from(parent)),
            first_err,
        ))
    }

    /// `cache_path` is a directory (e.g. `host/api` holding the entries of
    /// `host/api?x=1`); the entry goes to `host/api0` .. `host/api9` instead.
    fn alternate_leaf(&self, cache_path: &str) -> Result<String> {
        for i in 0..PARENT_ALTERNATES {
            let alt = format!("{}{}", cache_path, i);
            if self.fs.is_file(&alt) || !self.fs.exists(&alt) {
                tracing::debug!(%cache_path, %alt, "cache path is a directory; using alternate");
                return Ok(alt);
            }
        }
        Err(RowgenError::io(
            self.fs.native_path(cache_path).unwrap_or_else(|| PathBuf::from(cache_path)),
            std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                "cache path and all alternates are directories",
            ),
        ))
    }

    /// Blocks until this process holds exclusive access to `cache_path`.
    ///
    /// Uses a `.lock` file next to the entry when the backend has a native
    /// path; otherwise only other threads of this process are excluded.
    pub fn acquire_lock(&self, cache_path: &str) -> Result<CacheLock> {
        let lock_name = lock_path(cache_path);
        let native = self.fs.native_path(&lock_name);
        let key = match &native {
            Some(p) => p.to_string_lossy().into_owned(),
            None => format!("mem:{:p}:{}", Arc::as_ptr(&self.fs), lock_name),
        };
        tracing::debug!(%cache_path, native = native.is_some(), "acquiring cache lock");
        CacheLock::acquire(&key, native.as_deref()).map_err(|e| {
            RowgenError::io(native.unwrap_or_else(|| PathBuf::from(&lock_name)), e)
        })
    }

    /// Removes an entry, ignoring entries that are already gone.
    pub fn remove(&self, cache_path: &str) -> Result<()> {
        match self.fs.remove(cache_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(RowgenError::io(cache_path, e)),
        }
    }
}
