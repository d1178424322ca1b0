//! Locator resolution, fetch-and-cache and container inspection for tabular
//! data sources.
//!
//! A raw locator string is resolved into a [`SourceSpec`], fetched into a
//! [`Cache`] by a [`Fetcher`], and optionally expanded into the entries or
//! worksheets it contains.

pub mod cache;
pub mod cancel;
pub mod checksum;
pub mod config;
pub mod error;
pub mod fetch;
pub mod inspect;
pub mod locator;
pub mod logging;
pub mod source;
pub mod spec;
pub mod url_model;

pub use cache::{cache_path_for, Cache};
pub use cancel::CancelToken;
pub use error::{Result, RowgenError};
pub use fetch::{Fetched, Fetcher};
pub use inspect::{enumerate_contents, inspect};
pub use locator::{Kind, Registry, Resolver};
pub use source::{get_source, ByteOpener, Dispatcher};
pub use spec::{Overrides, SourceSpec};
