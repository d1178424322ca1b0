//! Zip archive entry listing and target-entry selection.

use crate::cache::ReadSeek;
use crate::error::{Result, RowgenError};
use crate::spec::SourceSpec;
use regex::Regex;
use std::io::{Cursor, Read};
use std::path::Path;
use zip::ZipArchive;

const S_IFMT: u32 = 0o170000;
const S_IFREG: u32 = 0o100000;

/// Dotfiles and `__MACOSX`-style system entries, at any depth.
fn is_hidden(name: &str) -> bool {
    name.split('/')
        .filter(|c| !c.is_empty())
        .any(|c| c.starts_with('.') || c.starts_with("__"))
}

pub(crate) fn open_archive(
    reader: Box<dyn ReadSeek>,
    location: &Path,
) -> Result<ZipArchive<Box<dyn ReadSeek>>> {
    ZipArchive::new(reader).map_err(|e| RowgenError::Archive {
        path: location.to_path_buf(),
        source: e,
    })
}

/// Names of the regular files in `archive`, in archive order.
///
/// Directory markers and hidden entries are skipped. Entries without unix
/// mode bits, or with no file-type bits set, count as regular files.
pub fn real_files<R: std::io::Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
    location: &Path,
) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for i in 0..archive.len() {
        let entry = archive.by_index_raw(i).map_err(|e| RowgenError::Archive {
            path: location.to_path_buf(),
            source: e,
        })?;
        if entry.is_dir() || is_hidden(entry.name()) {
            continue;
        }
        let regular = match entry.unix_mode() {
            None => true,
            Some(mode) => matches!(mode & S_IFMT, 0 | S_IFREG),
        };
        if regular {
            names.push(entry.name().to_string());
        }
    }
    Ok(names)
}

/// Picks the entry of `names` that `spec` addresses.
///
/// An entry named exactly `target_file` wins; otherwise `target_file` is a
/// regular expression searched for in each name. Without one, a numeric
/// `target_segment` picks by index, and otherwise the first entry wins.
pub fn find_entry(names: &[String], spec: &SourceSpec, location: &Path) -> Result<String> {
    let not_found = |what: String| RowgenError::NotFound {
        what,
        location: location.display().to_string(),
    };

    if let Some(tf) = spec.target_file() {
        let exact = names.iter().find(|n| n.as_str() == tf);
        let hit = match (exact, Regex::new(tf)) {
            (Some(n), _) => Some(n),
            (None, Ok(re)) => names.iter().find(|n| re.is_match(n)),
            (None, Err(_)) => None,
        };
        return hit
            .cloned()
            .ok_or_else(|| not_found(format!("entry matching '{}'", tf)));
    }

    if let Some(idx) = spec.target_segment().and_then(|s| s.parse::<usize>().ok()) {
        if let Some(name) = names.get(idx) {
            return Ok(name.clone());
        }
    }

    names
        .first()
        .cloned()
        .ok_or_else(|| not_found("any entry".to_string()))
}

/// Largest entry [`read_entry`] will buffer in memory.
pub(crate) const MAX_ENTRY_BYTES: u64 = 4 << 30;

/// Reads one entry fully into memory so it can be seeked.
pub(crate) fn read_entry(
    archive: &mut ZipArchive<Box<dyn ReadSeek>>,
    name: &str,
    location: &Path,
) -> Result<Cursor<Vec<u8>>> {
    read_entry_within(archive, name, location, MAX_ENTRY_BYTES)
}

fn read_entry_within<R: Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
    location: &Path,
    limit: u64,
) -> Result<Cursor<Vec<u8>>> {
    let too_large = || {
        RowgenError::io(
            location.join(name),
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("archive entry larger than {} bytes", limit),
            ),
        )
    };
    let entry = archive.by_name(name).map_err(|e| match e {
        zip::result::ZipError::FileNotFound => RowgenError::NotFound {
            what: format!("entry '{}'", name),
            location: location.display().to_string(),
        },
        other => RowgenError::Archive {
            path: location.to_path_buf(),
            source: other,
        },
    })?;
    if entry.size() > limit {
        return Err(too_large());
    }
    let mut buf = Vec::with_capacity(entry.size().min(1 << 20) as usize);
    entry
        .take(limit + 1)
        .read_to_end(&mut buf)
        .map_err(|e| RowgenError::io(location.join(name), e))?;
    if buf.len() as u64 > limit {
        return Err(too_large());
    }
    Ok(Cursor::new(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn build(entries: &[(&str, Option<u32>)]) -> Vec<u8> {
        let mut w = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, mode) in entries {
            if name.ends_with('/') {
                w.add_directory(name.trim_end_matches('/'), SimpleFileOptions::default())
                    .unwrap();
                continue;
            }
            let mut opts = SimpleFileOptions::default();
            if let Some(m) = mode {
                opts = opts.unix_permissions(*m);
            }
            w.start_file(*name, opts).unwrap();
            w.write_all(b"x").unwrap();
        }
        w.finish().unwrap().into_inner()
    }

    fn names_of(data: Vec<u8>) -> Vec<String> {
        let mut z = ZipArchive::new(Cursor::new(data)).unwrap();
        real_files(&mut z, Path::new("t.zip")).unwrap()
    }

    #[test]
    fn skips_dirs_and_hidden_entries() {
        let data = build(&[
            ("data/", None),
            ("data/a.csv", None),
            ("__MACOSX/data/._a.csv", None),
            (".DS_Store", None),
            ("b.xlsx", Some(0o644)),
        ]);
        assert_eq!(names_of(data), vec!["data/a.csv", "b.xlsx"]);
    }

    fn spec_with(tf: Option<&str>, ts: Option<&str>) -> SourceSpec {
        let mut url = "http://example.com/bundle.zip".to_string();
        if let Some(f) = crate::locator::compose_fragment(tf, ts) {
            url = crate::url_model::reparse(&url, |p| p.fragment = Some(f));
        }
        SourceSpec::parse(&url)
    }

    #[test]
    fn selects_by_regex_index_or_first() {
        let names: Vec<String> = ["a.csv", "dir/b.csv", "c.xlsx"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let loc = Path::new("bundle.zip");
        assert_eq!(find_entry(&names, &spec_with(Some("b\\.csv$"), None), loc).unwrap(), "dir/b.csv");
        assert_eq!(find_entry(&names, &spec_with(Some("c.xlsx"), None), loc).unwrap(), "c.xlsx");
        assert_eq!(find_entry(&names, &spec_with(None, None), loc).unwrap(), "a.csv");
        assert!(matches!(
            find_entry(&names, &spec_with(Some("zzz"), None), loc),
            Err(RowgenError::NotFound { .. })
        ));
        assert!(matches!(
            find_entry(&[], &spec_with(None, None), loc),
            Err(RowgenError::NotFound { .. })
        ));
    }

    #[test]
    fn exact_name_beats_earlier_regex_hit() {
        let names = vec!["data.csv".to_string(), "a.csv".to_string()];
        let loc = Path::new("bundle.zip");
        assert_eq!(
            find_entry(&names, &spec_with(Some("a.csv"), None), loc).unwrap(),
            "a.csv"
        );
    }

    #[test]
    fn oversized_entry_is_an_error_not_an_abort() {
        let data = build(&[("big.csv", None)]);
        let mut z = ZipArchive::new(Cursor::new(data)).unwrap();
        let loc = Path::new("t.zip");
        assert_eq!(read_entry_within(&mut z, "big.csv", loc, 1).unwrap().into_inner(), b"x");
        assert!(matches!(
            read_entry_within(&mut z, "big.csv", loc, 0),
            Err(RowgenError::Io { .. })
        ));
    }

    #[test]
    fn invalid_regex_compares_literally() {
        let names = vec!["weird(.csv".to_string()];
        let loc = Path::new("bundle.zip");
        assert_eq!(
            find_entry(&names, &spec_with(Some("weird(.csv"), None), loc).unwrap(),
            "weird(.csv"
        );
    }
}
