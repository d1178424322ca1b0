//! Materializes a descriptor's resource bytes.
//!
//! `file:` resources are read in place. Everything else is streamed into the
//! cache under the entry's lock: bytes go to a `.part` sibling that is renamed
//! over the cache path only once the transfer completes. Any failure, a
//! cancellation, or a panic unwinding through the transfer removes both the
//! `.part` file and the cache path before the error reaches the caller.

mod s3;
mod transfer;

pub use s3::{get_credentials, Account, CredentialProvider, Credentials, ObjectStore};
pub use transfer::TransferSettings;

use crate::cache::{Cache, CacheFs, ReadSeek};
use crate::cancel::CancelToken;
use crate::error::{FetchCause, Result, RowgenError};
use crate::locator::Kind;
use crate::spec::SourceSpec;
use crate::url_model;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

/// Suffix of in-progress cache entries.
pub const PART_SUFFIX: &str = ".part";

/// Where fetched bytes can be read from.
#[derive(Debug, Clone)]
pub(crate) enum Location {
    Local(PathBuf),
    Cached { fs: Arc<dyn CacheFs>, path: String },
}

impl Location {
    pub(crate) fn open(&self) -> Result<Box<dyn ReadSeek>> {
        match self {
            Location::Local(p) => {
                let f = File::open(p).map_err(|e| RowgenError::io(p, e))?;
                Ok(Box::new(f))
            }
            Location::Cached { fs, path } => fs.open_read(path).map_err(|e| {
                RowgenError::io(fs.native_path(path).unwrap_or_else(|| PathBuf::from(path)), e)
            }),
        }
    }

    /// Path used in error messages.
    pub(crate) fn display_path(&self) -> PathBuf {
        match self {
            Location::Local(p) => p.clone(),
            Location::Cached { fs, path } => {
                fs.native_path(path).unwrap_or_else(|| PathBuf::from(path))
            }
        }
    }
}

/// Result of fetching one resource.
#[derive(Debug, Clone)]
pub struct Fetched {
    /// Cache-relative path; `None` for local files.
    pub cache_path: Option<String>,
    /// Real filesystem path, when there is one.
    pub sys_path: Option<PathBuf>,
    /// Set only when this call performed the transfer.
    pub download_time: Option<SystemTime>,
    pub(crate) location: Location,
}

impl Fetched {
    /// Opens the fetched bytes from the start.
    pub fn open(&self) -> Result<Box<dyn ReadSeek>> {
        self.location.open()
    }
}

/// Removes a half-written entry unless disarmed.
struct PartialEntry<'a> {
    fs: &'a dyn CacheFs,
    part: String,
    cache_path: &'a str,
    armed: bool,
}

impl Drop for PartialEntry<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        for p in [self.part.as_str(), self.cache_path] {
            if self.fs.exists(p) {
                if let Err(e) = self.fs.remove(p) {
                    tracing::warn!(cache_path = p, "failed to remove partial entry: {}", e);
                }
            }
        }
        tracing::debug!(cache_path = self.cache_path, "removed partial cache entry");
    }
}

enum Route<'a> {
    Curl(&'a str),
    Object { bucket: &'a str, key: &'a str },
}

/// Fetches resources into a [`Cache`].
#[derive(Clone)]
pub struct Fetcher {
    cache: Cache,
    settings: TransferSettings,
    working_dir: Option<PathBuf>,
    object_store: Option<Arc<dyn ObjectStore>>,
    credentials: Option<CredentialProvider>,
    cancel: Option<CancelToken>,
}

impl Fetcher {
    pub fn new(cache: Cache) -> Self {
        Self {
            cache,
            settings: TransferSettings::default(),
            working_dir: None,
            object_store: None,
            credentials: None,
            cancel: None,
        }
    }

    pub fn with_settings(mut self, settings: TransferSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Base for relative `file:` paths.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_object_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.object_store = Some(store);
        self
    }

    pub fn with_credentials(mut self, provider: CredentialProvider) -> Self {
        self.credentials = Some(provider);
        self
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    /// Fetches `spec`, reusing a cached copy when there is one.
    pub fn fetch(&self, spec: &SourceSpec) -> Result<Fetched> {
        self.download_and_cache(spec, false)
    }

    /// Fetches `spec` into the cache; with `clean`, an existing entry is
    /// removed and fetched again.
    pub fn download_and_cache(&self, spec: &SourceSpec, clean: bool) -> Result<Fetched> {
        if url_model::parse(spec.resource_url()).scheme == "file" {
            return self.fetch_local(spec);
        }

        let cache_path = self.cache.prepare(spec.resource_url())?;
        let _lock = self.cache.acquire_lock(&cache_path)?;

        if self.cache.fs().is_file(&cache_path) {
            if clean {
                tracing::debug!(%cache_path, "clean requested; removing cached entry");
                self.cache.remove(&cache_path)?;
            } else {
                tracing::debug!(%cache_path, "cache hit");
                return Ok(self.cached(cache_path, None));
            }
        }

        tracing::info!(url = spec.resource_url(), %cache_path, "downloading");
        let bytes = self.transfer_into(spec, &cache_path)?;
        tracing::info!(%cache_path, bytes, "download complete");
        Ok(self.cached(cache_path, Some(SystemTime::now())))
    }

    fn cached(&self, cache_path: String, download_time: Option<SystemTime>) -> Fetched {
        let fs = Arc::clone(self.cache.fs());
        Fetched {
            sys_path: fs.native_path(&cache_path),
            location: Location::Cached {
                fs,
                path: cache_path.clone(),
            },
            cache_path: Some(cache_path),
            download_time,
        }
    }

    fn fetch_local(&self, spec: &SourceSpec) -> Result<Fetched> {
        let parts = url_model::parse(spec.resource_url());
        let mut path = PathBuf::from(&parts.path);
        if path.is_relative() {
            if let Some(wd) = &self.working_dir {
                path = wd.join(path);
            }
        }
        if !path.exists() {
            let base = self
                .working_dir
                .as_deref()
                .unwrap_or_else(|| Path::new("."));
            return Err(RowgenError::NotFound {
                what: format!("file '{}'", parts.path),
                location: base.display().to_string(),
            });
        }
        let abs = path.canonicalize().map_err(|e| RowgenError::io(&path, e))?;
        tracing::debug!(path = %abs.display(), "using local file");
        Ok(Fetched {
            cache_path: None,
            sys_path: Some(abs.clone()),
            download_time: None,
            location: Location::Local(abs),
        })
    }

    /// S3-kind locators carry their object address in the auth URL; zip and
    /// workbook locators on `s3:` keep it as the resource URL itself.
    fn route<'a>(&self, spec: &'a SourceSpec) -> Result<Route<'a>> {
        let url = spec.resource_url();
        let scheme = url_model::parse(url).scheme;
        let object_url = match (spec.kind(), scheme.as_str()) {
            (Kind::S3, _) => Some(spec.auth_resource_url().unwrap_or_default()),
            (_, "s3") => Some(url),
            _ => None,
        };
        if let Some(object_url) = object_url {
            return match s3::split_s3_url(object_url) {
                Some((bucket, key)) => Ok(Route::Object { bucket, key }),
                None => Err(RowgenError::resolution(
                    spec.name(),
                    "s3 locator needs both a bucket and a key",
                )),
            };
        }
        match scheme.as_str() {
            "http" | "https" | "ftp" => Ok(Route::Curl(url)),
            other => Err(RowgenError::resolution(
                spec.name(),
                format!("no transport for protocol '{}'", other),
            )),
        }
    }

    fn transfer_into(&self, spec: &SourceSpec, cache_path: &str) -> Result<u64> {
        let route = self.route(spec)?;
        if self.is_cancelled() {
            return Err(RowgenError::Cancelled {
                url: spec.resource_url().to_string(),
            });
        }

        let fs = self.cache.fs().as_ref();
        let mut entry = PartialEntry {
            fs,
            part: format!("{}{}", cache_path, PART_SUFFIX),
            cache_path,
            armed: true,
        };
        let io_err = |path: &str, e: io::Error| {
            RowgenError::io(fs.native_path(path).unwrap_or_else(|| PathBuf::from(path)), e)
        };

        let mut sink = fs.create(&entry.part).map_err(|e| io_err(&entry.part, e))?;
        let bytes = match route {
            Route::Curl(url) => {
                transfer::curl_transfer(url, &self.settings, self.cancel.as_ref(), sink.as_mut())?
            }
            Route::Object { bucket, key } => self.read_object(bucket, key, sink.as_mut())?,
        };
        sink.flush().map_err(|e| io_err(&entry.part, e))?;
        drop(sink);

        fs.rename(&entry.part, cache_path)
            .map_err(|e| io_err(cache_path, e))?;
        entry.armed = false;
        Ok(bytes)
    }

    fn read_object(&self, bucket: &str, key: &str, sink: &mut dyn Write) -> Result<u64> {
        let url = format!("s3://{}/{}", bucket, key);
        let store = self.object_store.as_ref().ok_or_else(|| RowgenError::Fetch {
            url: url.clone(),
            status: None,
            cause: FetchCause::NoObjectStore,
        })?;
        let account = get_credentials(self.credentials.as_ref(), bucket)?;
        let fetch_io = |e: io::Error| RowgenError::Fetch {
            url: url.clone(),
            status: None,
            cause: FetchCause::Io(e),
        };

        let mut reader = store.get(bucket, key, &account).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                RowgenError::NotFound {
                    what: format!("object '{}'", key),
                    location: format!("s3://{}", bucket),
                }
            } else {
                fetch_io(e)
            }
        })?;

        let mut buf = vec![0u8; self.settings.buffer_bytes.max(1)];
        let mut total = 0u64;
        loop {
            if self.is_cancelled() {
                return Err(RowgenError::Cancelled { url });
            }
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(fetch_io(e)),
            };
            sink.write_all(&buf[..n]).map_err(fetch_io)?;
            total += n as u64;
        }
        Ok(total)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }
}
