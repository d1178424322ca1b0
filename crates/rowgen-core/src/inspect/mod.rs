//! Container inspection: expands a descriptor into the descriptors of the
//! things it contains.
//!
//! Two levels exist: entries of a zip archive, and worksheets of a
//! workbook. `inspect` expands one level; `enumerate_contents` expands both.
//! Nested archives (a zip inside a zip) are not descended into.

pub(crate) mod archive;
mod workbook;

pub use archive::{find_entry, real_files};
pub use workbook::sheet_names;

use crate::error::{Result, RowgenError};
use crate::fetch::Fetcher;
use crate::source::open_target;
use crate::spec::{Overrides, SourceSpec};

/// Expands `spec` one level.
///
/// - an archive with no pinned `target_file` yields one descriptor per real
///   entry
/// - a workbook target with no pinned `target_segment` yields one descriptor
///   per worksheet
/// - anything else yields itself
pub fn inspect(fetcher: &Fetcher, spec: &SourceSpec) -> Result<Vec<SourceSpec>> {
    if spec.is_archive() && spec.target_file().is_none() {
        let fetched = fetcher.fetch(spec)?;
        let path = fetched.location.display_path();
        let mut container = archive::open_archive(fetched.open()?, &path)?;
        let names = real_files(&mut container, &path)?;
        tracing::debug!(archive = %path.display(), entries = names.len(), "listed archive");
        return Ok(names
            .into_iter()
            .map(|name| {
                spec.update(Overrides {
                    target_file: Some(name),
                    ..Overrides::default()
                })
            })
            .collect());
    }

    if spec.is_workbook() && spec.target_segment().is_none() {
        if spec.target_format() != Some("xlsx") {
            return Err(RowgenError::resolution(
                spec.name(),
                "worksheets can only be listed for xlsx workbooks",
            ));
        }
        let opener = open_target(fetcher, spec)?;
        let names = sheet_names(opener.open()?, &opener.container_path())?;
        tracing::debug!(workbook = %spec.name(), sheets = names.len(), "listed worksheets");
        return Ok(names
            .into_iter()
            .map(|name| {
                spec.update(Overrides {
                    target_segment: Some(name),
                    ..Overrides::default()
                })
            })
            .collect());
    }

    Ok(vec![spec.clone()])
}

/// Flattens `spec` into directly readable descriptors: archive entries
/// first, then the worksheets of any workbook among them.
pub fn enumerate_contents(fetcher: &Fetcher, spec: &SourceSpec) -> Result<Vec<SourceSpec>> {
    let mut out = Vec::new();
    for child in inspect(fetcher, spec)? {
        if child.is_workbook() && child.target_segment().is_none() {
            out.extend(inspect(fetcher, &child)?);
        } else {
            out.push(child);
        }
    }
    Ok(out)
}
