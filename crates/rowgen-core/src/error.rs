//! Domain error type shared by resolution, fetch and inspection.
//!
//! Every variant names the locator, URL or path it concerns so a failed
//! resource can be re-run on its own.

use std::path::PathBuf;

/// Result alias used throughout the core crate.
pub type Result<T, E = RowgenError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum RowgenError {
    /// The locator could not be turned into a usable descriptor or cache key.
    #[error("cannot resolve '{locator}': {reason}")]
    Resolution { locator: String, reason: String },

    /// No reader is registered for the descriptor's target format.
    #[error("failed to determine reader for source '{name}'; unknown format '{format}'")]
    UnknownFormat { name: String, format: String },

    /// The credential provider returned no account, or one missing keys.
    #[error(
        "credentials for {netloc} must contain non-empty {} key(s)",
        .missing.join(", ")
    )]
    MissingCredentials { netloc: String, missing: Vec<String> },

    /// Transfer failed; the partial cache entry has already been removed.
    #[error("failed to fetch {url}: {cause}")]
    Fetch {
        url: String,
        status: Option<u32>,
        #[source]
        cause: FetchCause,
    },

    /// Local file absent, or named entry absent inside a container.
    #[error("{what} not found in '{location}'")]
    NotFound { what: String, location: String },

    /// Transfer stopped by the caller's cancel token.
    #[error("fetch of {url} was cancelled")]
    Cancelled { url: String },

    #[error("cache i/o on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("archive {}: {source}", .path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
}

impl RowgenError {
    pub(crate) fn resolution(locator: impl Into<String>, reason: impl Into<String>) -> Self {
        RowgenError::Resolution {
            locator: locator.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RowgenError::Io {
            path: path.into(),
            source,
        }
    }

    /// HTTP status of a failed fetch, if the server answered at all.
    pub fn status(&self) -> Option<u32> {
        match self {
            RowgenError::Fetch { status, .. } => *status,
            _ => None,
        }
    }
}

/// Underlying cause of a [`RowgenError::Fetch`].
#[derive(Debug, thiserror::Error)]
pub enum FetchCause {
    /// Server answered with a non-success status.
    #[error("HTTP {0}")]
    Http(u32),
    /// Curl reported a transport error (timeout, connection, partial body).
    #[error("{0}")]
    Curl(#[source] curl::Error),
    /// Writing the cache entry or reading the object store failed.
    #[error("i/o: {0}")]
    Io(#[source] std::io::Error),
    /// An `s3:` resource was requested but no object store is configured.
    #[error("no object store configured for s3 access")]
    NoObjectStore,
}
