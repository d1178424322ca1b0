//! Opening a descriptor's target and handing it to a reader.
//!
//! Readers themselves live outside this crate; a [`Dispatcher`] maps target
//! formats to reader constructors and [`get_source`] ties fetch, archive
//! entry selection and dispatch together.

use crate::cache::ReadSeek;
use crate::error::{Result, RowgenError};
use crate::fetch::{Fetched, Fetcher, Location};
use crate::inspect::archive::{find_entry, open_archive, read_entry, real_files};
use crate::spec::SourceSpec;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

/// Opens the bytes of one target: a fetched file, or one entry inside a
/// fetched archive. Each `open` starts from the beginning.
#[derive(Debug, Clone)]
pub struct ByteOpener {
    location: Location,
    entry: Option<String>,
}

impl ByteOpener {
    /// Opener for `spec`'s target within `fetched`. For archives this picks
    /// the entry `spec` addresses.
    pub fn for_spec(fetched: &Fetched, spec: &SourceSpec) -> Result<Self> {
        let location = fetched.location.clone();
        if !spec.is_archive() {
            return Ok(Self {
                location,
                entry: None,
            });
        }
        let path = location.display_path();
        let mut archive = open_archive(location.open()?, &path)?;
        let names = real_files(&mut archive, &path)?;
        let entry = find_entry(&names, spec, &path)?;
        tracing::debug!(archive = %path.display(), %entry, "selected archive entry");
        Ok(Self {
            location,
            entry: Some(entry),
        })
    }

    /// Selected archive entry, if the target lives inside an archive.
    pub fn entry(&self) -> Option<&str> {
        self.entry.as_deref()
    }

    /// Path of the fetched file (the archive, for archive entries).
    pub fn container_path(&self) -> PathBuf {
        self.location.display_path()
    }

    pub fn open(&self) -> Result<Box<dyn ReadSeek>> {
        let reader = self.location.open()?;
        let Some(entry) = &self.entry else {
            return Ok(reader);
        };
        let path = self.location.display_path();
        let mut archive = open_archive(reader, &path)?;
        Ok(Box::new(read_entry(&mut archive, entry, &path)?))
    }
}

/// Fetches `spec` and returns an opener for its target.
pub fn open_target(fetcher: &Fetcher, spec: &SourceSpec) -> Result<ByteOpener> {
    let fetched = fetcher.fetch(spec)?;
    ByteOpener::for_spec(&fetched, spec)
}

type Constructor<R> = Box<dyn Fn(&SourceSpec, ByteOpener) -> Result<R> + Send + Sync>;

/// Target format to reader constructor table.
pub struct Dispatcher<R> {
    readers: HashMap<String, Constructor<R>>,
}

impl<R> Default for Dispatcher<R> {
    fn default() -> Self {
        Self {
            readers: HashMap::new(),
        }
    }
}

impl<R> fmt::Debug for Dispatcher<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut formats: Vec<_> = self.readers.keys().collect();
        formats.sort();
        f.debug_struct("Dispatcher").field("formats", &formats).finish()
    }
}

impl<R> Dispatcher<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `ctor` for `format` (case-insensitive), replacing any
    /// earlier registration.
    pub fn register<F>(&mut self, format: &str, ctor: F)
    where
        F: Fn(&SourceSpec, ByteOpener) -> Result<R> + Send + Sync + 'static,
    {
        self.readers.insert(format.to_lowercase(), Box::new(ctor));
    }

    pub fn with<F>(mut self, format: &str, ctor: F) -> Self
    where
        F: Fn(&SourceSpec, ByteOpener) -> Result<R> + Send + Sync + 'static,
    {
        self.register(format, ctor);
        self
    }

    pub fn supports(&self, format: &str) -> bool {
        self.readers.contains_key(&format.to_lowercase())
    }

    /// Builds the reader for `spec`'s target format.
    pub fn dispatch(&self, spec: &SourceSpec, opener: ByteOpener) -> Result<R> {
        let format = spec.target_format().unwrap_or_default();
        let ctor = self
            .readers
            .get(format)
            .ok_or_else(|| RowgenError::UnknownFormat {
                name: spec.name(),
                format: format.to_string(),
            })?;
        ctor(spec, opener)
    }
}

/// Fetches `spec`, pins its archive entry, and builds a reader for it.
///
/// The format is checked before anything is fetched.
pub fn get_source<R>(fetcher: &Fetcher, dispatcher: &Dispatcher<R>, spec: &SourceSpec) -> Result<R> {
    let format = spec.target_format().unwrap_or_default();
    if !dispatcher.supports(format) {
        return Err(RowgenError::UnknownFormat {
            name: spec.name(),
            format: format.to_string(),
        });
    }
    let opener = open_target(fetcher, spec)?;
    dispatcher.dispatch(spec, opener)
}
