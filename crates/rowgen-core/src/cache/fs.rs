//! Cache filesystem backends.
//!
//! Cache paths are `/`-separated strings relative to the backend root. The
//! fetcher and cache manager only talk to [`CacheFs`], so the same code runs
//! on local disk and on the in-memory backend used by tests.

use std::fmt;
use std::fs;
use std::io::{self, Read, Seek, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Readable and seekable byte stream (zip archives need both).
pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

/// Storage the cache lives on.
pub trait CacheFs: Send + Sync + fmt::Debug {
    fn exists(&self, path: &str) -> bool;

    fn is_file(&self, path: &str) -> bool;

    /// Creates `path` and any missing parents. Succeeds when the directory
    /// already exists; fails when `path` or an ancestor is a file.
    fn makedirs(&self, path: &str) -> io::Result<()>;

    /// Creates or truncates a file for writing.
    fn create(&self, path: &str) -> io::Result<Box<dyn Write + Send>>;

    fn open_read(&self, path: &str) -> io::Result<Box<dyn ReadSeek>>;

    fn remove(&self, path: &str) -> io::Result<()>;

    fn rename(&self, from: &str, to: &str) -> io::Result<()>;

    /// Real filesystem location of `path`, when the backend has one.
    fn native_path(&self, path: &str) -> Option<PathBuf>;

    /// Every file under the root with its modification time.
    fn list_files(&self) -> io::Result<Vec<(String, SystemTime)>>;
}

/// Local-disk backend rooted at a directory.
#[derive(Debug, Clone)]
pub struct OsFs {
    root: PathBuf,
}

impl OsFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let mut p = self.root.clone();
        for seg in path.split('/').filter(|s| !s.is_empty()) {
            p.push(seg);
        }
        p
    }
}

fn walk(root: &Path, dir: &Path, out: &mut Vec<(String, SystemTime)>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let ty = entry.file_type()?;
        let path = entry.path();
        if ty.is_dir() {
            walk(root, &path, out)?;
        } else if ty.is_file() {
            let modified = entry.metadata()?.modified()?;
            let rel = path
                .strip_prefix(root)
                .unwrap_or(&path)
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            out.push((rel, modified));
        }
    }
    Ok(())
}

impl CacheFs for OsFs {
    fn exists(&self, path: &str) -> bool {
        self.resolve(path).exists()
    }

    fn is_file(&self, path: &str) -> bool {
        self.resolve(path).is_file()
    }

    fn makedirs(&self, path: &str) -> io::Result<()> {
        let dir = self.resolve(path);
        match fs::create_dir_all(&dir) {
            Ok(()) => Ok(()),
            // another process won the race
            Err(_) if dir.is_dir() => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn create(&self, path: &str) -> io::Result<Box<dyn Write + Send>> {
        let f = fs::File::create(self.resolve(path))?;
        Ok(Box::new(f))
    }

    fn open_read(&self, path: &str) -> io::Result<Box<dyn ReadSeek>> {
        let f = fs::File::open(self.resolve(path))?;
        Ok(Box::new(f))
    }

    fn remove(&self, path: &str) -> io::Result<()> {
        fs::remove_file(self.resolve(path))
    }

    fn rename(&self, from: &str, to: &str) -> io::Result<()> {
        fs::rename(self.resolve(from), self.resolve(to))
    }

    fn native_path(&self, path: &str) -> Option<PathBuf> {
        Some(self.resolve(path))
    }

    fn list_files(&self) -> io::Result<Vec<(String, SystemTime)>> {
        let mut out = Vec::new();
        if self.root.is_dir() {
            walk(&self.root, &self.root, &mut out)?;
        }
        out.sort();
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_read_rename_remove() {
        let dir = tempfile::tempdir().unwrap();
        let fs = OsFs::new(dir.path());
        fs.makedirs("host/a").unwrap();
        {
            let mut w = fs.create("host/a/x.part").unwrap();
            w.write_all(b"abc").unwrap();
        }
        fs.rename("host/a/x.part", "host/a/x").unwrap();
        assert!(fs.is_file("host/a/x"));
        assert!(!fs.exists("host/a/x.part"));

        let mut s = String::new();
        fs.open_read("host/a/x").unwrap().read_to_string(&mut s).unwrap();
        assert_eq!(s, "abc");

        let files = fs.list_files().unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].0, "host/a/x");

        fs.remove("host/a/x").unwrap();
        assert!(!fs.exists("host/a/x"));
    }

    #[test]
    fn makedirs_through_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let fs = OsFs::new(dir.path());
        fs.makedirs("host").unwrap();
        fs.create("host/api").unwrap();
        assert!(fs.makedirs("host/api").is_err());
        assert!(fs.makedirs("host").is_ok());
    }

    #[test]
    fn native_path_joins_segments() {
        let fs = OsFs::new("/cache");
        assert_eq!(
            fs.native_path("example.com/a/b.csv"),
            Some(PathBuf::from("/cache/example.com/a/b.csv"))
        );
    }
}
