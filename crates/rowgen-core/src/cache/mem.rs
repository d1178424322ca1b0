//! In-memory cache backend. Has no native paths, so locking falls back to
//! the in-process guard only.

use super::fs::{CacheFs, ReadSeek};
use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Cursor, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::SystemTime;

#[derive(Debug, Default)]
struct State {
    files: BTreeMap<String, (Vec<u8>, SystemTime)>,
    dirs: BTreeSet<String>,
}

/// Cache backend holding everything in a shared map. Clones share contents.
#[derive(Debug, Clone, Default)]
pub struct MemFs {
    state: Arc<Mutex<State>>,
}

fn norm(path: &str) -> String {
    path.split('/')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Every proper ancestor of `path`, shortest first.
fn ancestors(path: &str) -> impl Iterator<Item = &str> {
    path.match_indices('/').map(move |(i, _)| &path[..i])
}

fn not_found(path: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("{} does not exist", path))
}

impl MemFs {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Sets a file's modification time; used to age entries in tests.
    pub fn set_modified(&self, path: &str, when: SystemTime) {
        if let Some(entry) = self.lock().files.get_mut(&norm(path)) {
            entry.1 = when;
        }
    }
}

struct MemWriter {
    fs: MemFs,
    path: String,
}

impl Write for MemWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut st = self.fs.lock();
        let entry = st
            .files
            .get_mut(&self.path)
            .ok_or_else(|| not_found(&self.path))?;
        entry.0.extend_from_slice(buf);
        entry.1 = SystemTime::now();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl CacheFs for MemFs {
    fn exists(&self, path: &str) -> bool {
        let p = norm(path);
        let st = self.lock();
        p.is_empty() || st.files.contains_key(&p) || st.dirs.contains(&p)
    }

    fn is_file(&self, path: &str) -> bool {
        self.lock().files.contains_key(&norm(path))
    }

    fn makedirs(&self, path: &str) -> io::Result<()> {
        let p = norm(path);
        if p.is_empty() {
            return Ok(());
        }
        let mut st = self.lock();
        for dir in ancestors(&p).chain(std::iter::once(p.as_str())) {
            if st.files.contains_key(dir) {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("{} is a file", dir),
                ));
            }
        }
        for dir in ancestors(&p).chain(std::iter::once(p.as_str())) {
            st.dirs.insert(dir.to_string());
        }
        Ok(())
    }

    fn create(&self, path: &str) -> io::Result<Box<dyn Write + Send>> {
        let p = norm(path);
        {
            let mut st = self.lock();
            if let Some(parent) = ancestors(&p).last() {
                if !st.dirs.contains(parent) {
                    return Err(not_found(parent));
                }
            }
            if st.dirs.contains(&p) {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("{} is a directory", p),
                ));
            }
            st.files.insert(p.clone(), (Vec::new(), SystemTime::now()));
        }
        Ok(Box::new(MemWriter {
            fs: self.clone(),
            path: p,
        }))
    }

    fn open_read(&self, path: &str) -> io::Result<Box<dyn ReadSeek>> {
        let p = norm(path);
        let data = self
            .lock()
            .files
            .get(&p)
            .map(|(d, _)| d.clone())
            .ok_or_else(|| not_found(&p))?;
        Ok(Box::new(Cursor::new(data)))
    }

    fn remove(&self, path: &str) -> io::Result<()> {
        let p = norm(path);
        self.lock()
            .files
            .remove(&p)
            .map(|_| ())
            .ok_or_else(|| not_found(&p))
    }

    fn rename(&self, from: &str, to: &str) -> io::Result<()> {
        let (from, to) = (norm(from), norm(to));
        let mut st = self.lock();
        let entry = st.files.remove(&from).ok_or_else(|| not_found(&from))?;
        st.files.insert(to, entry);
        Ok(())
    }

    fn native_path(&self, _path: &str) -> Option<PathBuf> {
        None
    }

    fn list_files(&self) -> io::Result<Vec<(String, SystemTime)>> {
        Ok(self
            .lock()
            .files
            .iter()
            .map(|(k, (_, t))| (k.clone(), *t))
            .collect())
    }
}
