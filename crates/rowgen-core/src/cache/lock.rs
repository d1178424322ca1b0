//! Per-cache-path locking.
//!
//! Two layers: an in-process table keyed by lock name (threads block on a
//! condvar, the owning thread may re-enter), and an exclusive `fs2` lock on a
//! sibling `.lock` file when the backend has a native path. Backends without
//! native paths only get the in-process layer, which does not protect against
//! other processes.

use fs2::FileExt;
use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Condvar, Mutex, MutexGuard, OnceLock};
use std::thread::{self, ThreadId};

pub const LOCK_SUFFIX: &str = ".lock";

#[derive(Default)]
struct Table {
    held: Mutex<HashMap<String, (ThreadId, usize)>>,
    released: Condvar,
}

fn table() -> &'static Table {
    static TABLE: OnceLock<Table> = OnceLock::new();
    TABLE.get_or_init(Table::default)
}

fn held() -> MutexGuard<'static, HashMap<String, (ThreadId, usize)>> {
    table().held.lock().unwrap_or_else(|e| e.into_inner())
}

/// Scoped exclusive access to one cache path. Released on drop.
#[derive(Debug)]
pub struct CacheLock {
    key: String,
    file: Option<File>,
    path: Option<PathBuf>,
}

impl CacheLock {
    /// Blocks until the lock named `key` is free (or already held by this
    /// thread), then takes the file lock at `lock_file` if given.
    pub(crate) fn acquire(key: &str, lock_file: Option<&Path>) -> io::Result<CacheLock> {
        let me = thread::current().id();
        let reentered = {
            let mut map = held();
            loop {
                match map.get(key).map(|(owner, _)| *owner == me) {
                    Some(true) => {
                        if let Some(entry) = map.get_mut(key) {
                            entry.1 += 1;
                        }
                        break true;
                    }
                    Some(false) => {
                        map = table()
                            .released
                            .wait(map)
                            .unwrap_or_else(|e| e.into_inner());
                    }
                    None => {
                        map.insert(key.to_string(), (me, 1));
                        break false;
                    }
                }
            }
        };

        let mut guard = CacheLock {
            key: key.to_string(),
            file: None,
            path: None,
        };
        if reentered {
            return Ok(guard);
        }
        if let Some(path) = lock_file {
            // dropping `guard` on error releases the in-process entry
            let file = File::create(path)?;
            if file.try_lock_exclusive().is_err() {
                tracing::debug!(lock = %path.display(), "waiting for cache lock");
                file.lock_exclusive()?;
            }
            guard.file = Some(file);
            guard.path = Some(path.to_path_buf());
        }
        Ok(guard)
    }

    /// Lock file backing this guard, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl Drop for CacheLock {
    fn drop(&mut self) {
        if let Some(f) = self.file.take() {
            let _ = FileExt::unlock(&f);
        }
        let mut map = held();
        if let Some((_, depth)) = map.get_mut(&self.key) {
            *depth -= 1;
            if *depth == 0 {
                map.remove(&self.key);
                table().released.notify_all();
            }
        }
    }
}
