//! Resource descriptor produced by locator resolution.
//!
//! A [`SourceSpec`] is an immutable value: `update` builds a new descriptor by
//! rebuilding the locator with the new target fields and re-running the full
//! derivation, so derived fields (formats, resource file) never go stale.

use crate::locator::{compose_fragment, derive, Kind, Resolver, WORKBOOK_FORMATS};
use crate::url_model::{self, dirname, join, quote_plus, url_is_absolute};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Explicit field overrides supplied by a caller.
///
/// Only what the caller set is stored on the descriptor; derived values are
/// recomputed on every `update`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proto: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_segment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    /// Treat the resource as a zip archive whatever its extension.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub force_archive: bool,
}

impl Overrides {
    pub fn is_empty(&self) -> bool {
        *self == Overrides::default()
    }

    /// Fields set in `newer` win over fields set in `self`.
    pub fn merge(&self, newer: &Overrides) -> Overrides {
        let pick = |a: &Option<String>, b: &Option<String>| b.clone().or_else(|| a.clone());
        Overrides {
            proto: pick(&self.proto, &newer.proto),
            resource_format: pick(&self.resource_format, &newer.resource_format),
            target_file: pick(&self.target_file, &newer.target_file),
            target_format: pick(&self.target_format, &newer.target_format),
            target_segment: pick(&self.target_segment, &newer.target_segment),
            encoding: pick(&self.encoding, &newer.encoding),
            force_archive: self.force_archive || newer.force_archive,
        }
    }
}

/// Fully resolved description of one addressable resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpec {
    pub(crate) kind: Kind,
    pub(crate) url: String,
    pub(crate) proto: String,
    pub(crate) resource_url: String,
    pub(crate) resource_file: String,
    pub(crate) resource_format: Option<String>,
    pub(crate) is_archive: bool,
    pub(crate) target_file: Option<String>,
    pub(crate) target_format: Option<String>,
    pub(crate) target_segment: Option<String>,
    pub(crate) encoding: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) auth_resource_url: Option<String>,
    #[serde(default, skip_serializing_if = "Overrides::is_empty")]
    pub(crate) overrides: Overrides,
}

impl SourceSpec {
    /// Resolves `raw` with the built-in matchers only.
    pub fn parse(raw: &str) -> SourceSpec {
        Resolver::default().resolve(raw)
    }

    pub fn parse_with(raw: &str, overrides: Overrides) -> SourceSpec {
        Resolver::default().resolve_with(raw, overrides)
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// Normalized locator this descriptor was derived from.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn proto(&self) -> &str {
        &self.proto
    }

    pub fn resource_url(&self) -> &str {
        &self.resource_url
    }

    pub fn resource_file(&self) -> &str {
        &self.resource_file
    }

    pub fn resource_format(&self) -> Option<&str> {
        self.resource_format.as_deref()
    }

    pub fn is_archive(&self) -> bool {
        self.is_archive
    }

    pub fn target_file(&self) -> Option<&str> {
        self.target_file.as_deref()
    }

    pub fn target_format(&self) -> Option<&str> {
        self.target_format.as_deref()
    }

    pub fn target_segment(&self) -> Option<&str> {
        self.target_segment.as_deref()
    }

    pub fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    /// `s3://bucket/key` form for credentialed access, when the resource
    /// lives in S3.
    pub fn auth_resource_url(&self) -> Option<&str> {
        self.auth_resource_url.as_deref()
    }

    pub fn overrides(&self) -> &Overrides {
        &self.overrides
    }

    pub fn is_reparseable(&self) -> bool {
        self.kind.is_reparseable()
    }

    /// True when the target is a spreadsheet whose worksheets can be listed.
    pub fn is_workbook(&self) -> bool {
        self.target_format
            .as_deref()
            .is_some_and(|f| WORKBOOK_FORMATS.contains(&f))
    }

    /// The pinned entry of an archive, when it differs from the archive
    /// itself.
    pub fn archive_file(&self) -> Option<&str> {
        match self.target_file.as_deref() {
            Some(tf) if self.is_archive && tf != self.resource_file => Some(tf),
            _ => None,
        }
    }

    /// Human-readable name used in error messages.
    pub fn name(&self) -> String {
        self.rebuild_url()
    }

    /// New descriptor with some fields overridden.
    ///
    /// Target file and segment carry over unless replaced; formats and
    /// resource fields are derived again from scratch.
    pub fn update(&self, changes: Overrides) -> SourceSpec {
        let explicit = self.overrides.merge(&changes);
        let target_file = changes.target_file.clone().or_else(|| self.target_file.clone());
        let target_segment = changes
            .target_segment
            .clone()
            .or_else(|| self.target_segment.clone());

        let url = self.rebuild_with(target_file.as_deref(), target_segment.as_deref());
        let effective = Overrides {
            target_file,
            target_segment,
            encoding: explicit.encoding.clone().or_else(|| self.encoding.clone()),
            ..explicit.clone()
        };
        derive(self.kind, &url, &effective, explicit)
    }

    /// Serializes the descriptor back into a locator string.
    pub fn rebuild_url(&self) -> String {
        self.rebuild_with(None, None)
    }

    /// Like [`rebuild_url`](Self::rebuild_url) with replacement target fields.
    pub fn rebuild_with(&self, target_file: Option<&str>, target_segment: Option<&str>) -> String {
        let ts = target_segment.or(self.target_segment.as_deref());
        let fragment = match self.kind {
            Kind::Excel | Kind::Notebook | Kind::Metatab => ts.map(str::to_string),
            _ => {
                let tf = if self.is_archive {
                    target_file
                        .filter(|tf| *tf != self.resource_file)
                        .or_else(|| self.archive_file())
                } else {
                    None
                };
                compose_fragment(tf, ts)
            }
        };

        if !self.kind.is_reparseable() {
            let base = self.url.split('#').next().unwrap_or("");
            return match fragment {
                Some(f) => format!("{}#{}", base, quote_plus(&f)),
                None => base.to_string(),
            };
        }
        url_model::reparse(&self.url, |p| p.fragment = fragment)
    }

    /// Resolves `s` relative to this descriptor.
    ///
    /// Absolute references come back unchanged. Zip, Excel and Google-sheet
    /// descriptors treat a relative reference as a fragment; S3 descriptors
    /// join it onto the key's directory; everything else joins it onto the
    /// directory of the locator path.
    pub fn component_url(&self, s: &str) -> String {
        let sp = url_model::parse(s);
        match self.kind {
            Kind::Zip | Kind::Excel => {
                if url_is_absolute(s) {
                    s.to_string()
                } else {
                    url_model::reparse(&self.url, |p| p.fragment = Some(s.to_string()))
                }
            }
            Kind::GoogleSheet => {
                if !sp.netloc.is_empty() {
                    s.to_string()
                } else {
                    url_model::reparse(&self.url, |p| p.fragment = Some(s.to_string()))
                }
            }
            Kind::S3 => {
                let parts = url_model::parse(&self.url);
                let key = parts.path.trim_matches('/');
                let new_key = join(dirname(key), &sp.path);
                format!(
                    "s3://{}/{}",
                    parts.netloc.trim_matches('/'),
                    new_key.trim_start_matches('/')
                )
            }
            _ => {
                if !sp.netloc.is_empty() {
                    return s.to_string();
                }
                url_model::reparse(&self.url, |p| {
                    p.path = join(dirname(&p.path), &sp.path);
                    p.fragment = sp.fragment.clone();
                    if sp.scheme_extension.is_some() {
                        p.scheme_extension = sp.scheme_extension.clone();
                    }
                })
            }
        }
    }
}

impl fmt::Display for SourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rebuild_url())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn general_http_csv() {
        let s = SourceSpec::parse("http://example.com/data/file.CSV");
        assert_eq!(s.kind(), Kind::General);
        assert_eq!(s.proto(), "http");
        assert_eq!(s.resource_url(), "http://example.com/data/file.CSV");
        assert_eq!(s.resource_file(), "file.CSV");
        assert_eq!(s.resource_format(), Some("csv"));
        assert_eq!(s.target_file(), Some("file.CSV"));
        assert_eq!(s.target_format(), Some("csv"));
        assert!(!s.is_archive());
        assert_eq!(s.target_segment(), None);
    }

    #[test]
    fn double_extension_zip() {
        let s = SourceSpec::parse("http://ex.com/data.csv.zip");
        assert_eq!(s.kind(), Kind::Zip);
        assert_eq!(s.resource_format(), Some("zip"));
        assert!(s.is_archive());
        assert_eq!(s.target_file(), Some("data.csv"));
        assert_eq!(s.target_format(), Some("csv"));
    }

    #[test]
    fn zip_fragment_file_and_segment() {
        let s = SourceSpec::parse("http://ex.com/bundle.zip#inner%2Fbook.xlsx%3BSheet1");
        assert_eq!(s.target_file(), Some("inner/book.xlsx"));
        assert_eq!(s.target_segment(), Some("Sheet1"));
        assert_eq!(s.target_format(), Some("xlsx"));
        assert!(s.is_workbook());
    }

    #[test]
    fn unpinned_zip() {
        let s = SourceSpec::parse("http://ex.com/bundle.zip");
        assert_eq!(s.target_file(), None);
        assert_eq!(s.target_format(), Some("zip"));
    }

    #[test]
    fn google_sheet_with_gid() {
        let s = SourceSpec::parse("gs://1AbCdEfGh#Sheet2");
        assert_eq!(s.kind(), Kind::GoogleSheet);
        assert_eq!(s.proto(), "gs");
        assert!(s
            .resource_url()
            .ends_with("/spreadsheets/d/1AbCdEfGh/export?format=csv&gid=Sheet2"));
        assert_eq!(s.resource_file(), "1AbCdEfGh-Sheet2.csv");
        assert_eq!(s.target_format(), Some("csv"));
        assert_eq!(s.target_segment(), Some("Sheet2"));
        assert_eq!(s.encoding(), Some("utf8"));
        assert_eq!(s.rebuild_url(), "gs://1AbCdEfGh#Sheet2");
    }

    #[test]
    fn s3_public_and_auth_urls() {
        let s = SourceSpec::parse("s3://bucket/key.csv");
        assert_eq!(s.kind(), Kind::S3);
        assert_eq!(s.resource_url(), "https://s3.amazonaws.com/bucket/key.csv");
        assert_eq!(s.auth_resource_url(), Some("s3://bucket/key.csv"));
        assert_eq!(s.target_format(), Some("csv"));
    }

    #[test]
    fn public_s3_http_url_has_auth_form() {
        let s = SourceSpec::parse("https://s3.amazonaws.com/bucket/dir/key.csv");
        assert_eq!(s.kind(), Kind::General);
        assert_eq!(s.auth_resource_url(), Some("s3://bucket/dir/key.csv"));
    }

    #[test]
    fn socrata_rows_csv() {
        let s = SourceSpec::parse("socrata+https://data.example.gov/api/views/abcd-1234");
        assert_eq!(s.kind(), Kind::Socrata);
        assert_eq!(
            s.resource_url(),
            "https://data.example.gov/api/views/abcd-1234/rows.csv"
        );
        assert_eq!(s.resource_file(), "abcd-1234.csv");
        assert_eq!(s.target_format(), Some("csv"));
        assert_eq!(s.encoding(), Some("utf8"));
    }

    #[test]
    fn metatab_directory_package() {
        let s = SourceSpec::parse("metatab+http://example.com/pkg/#root");
        assert_eq!(s.kind(), Kind::Metatab);
        assert_eq!(s.resource_url(), "http://example.com/pkg/metadata.csv");
        assert_eq!(s.resource_format(), Some("csv"));
        assert_eq!(s.target_file(), Some("metadata.csv"));
        assert_eq!(s.target_format(), Some("metatab"));
        assert_eq!(s.target_segment(), Some("root"));
    }

    #[test]
    fn metatab_containers() {
        let z = SourceSpec::parse("metatab+http://example.com/pkg.zip");
        assert_eq!(z.target_file(), Some("metadata.csv"));
        assert_eq!(z.target_format(), Some("metatab"));
        assert!(z.is_archive());

        let x = SourceSpec::parse("metatab+http://example.com/pkg.xlsx");
        assert_eq!(x.target_file(), Some("meta"));
        assert_eq!(x.target_format(), Some("metatab"));
    }

    #[test]
    fn notebook_fragment_is_segment() {
        let s = SourceSpec::parse("ipynb:notebooks/analysis.ipynb#cell;3");
        assert_eq!(s.kind(), Kind::Notebook);
        assert_eq!(s.url(), "ipynb+file:notebooks/analysis.ipynb#cell%3B3");
        assert_eq!(s.resource_url(), "file:notebooks/analysis.ipynb");
        assert_eq!(s.target_segment(), Some("cell;3"));
        assert_eq!(s.target_format(), Some("ipynb"));
        assert_eq!(s.target_file(), Some("analysis.ipynb"));
    }

    #[test]
    fn program_locator() {
        let s = SourceSpec::parse("program+file:scripts/gen.py");
        assert_eq!(s.kind(), Kind::Program);
        assert_eq!(s.proto(), "program");
        assert_eq!(s.resource_url(), "file:scripts/gen.py");
        assert!(!s.is_archive());
        assert_eq!(s.target_format(), Some("py"));
    }

    #[test]
    fn excel_fragment_is_segment() {
        let s = SourceSpec::parse("http://example.com/book.xlsx#Data");
        assert_eq!(s.kind(), Kind::Excel);
        assert_eq!(s.target_file(), Some("book.xlsx"));
        assert_eq!(s.target_segment(), Some("Data"));
        assert_eq!(s.rebuild_url(), "http://example.com/book.xlsx#Data");
    }

    #[test]
    fn unknown_protocol_is_application() {
        let s = SourceSpec::parse("foo://host/data.csv");
        assert_eq!(s.kind(), Kind::Application);
        assert!(!s.is_reparseable());
        assert_eq!(s.proto(), "foo");
        assert_eq!(s.target_format(), Some("csv"));
    }

    #[test]
    fn ckan_keeps_resource_url() {
        let s = SourceSpec::parse("ckan+http://ckan.example.org/dataset/x.csv");
        assert_eq!(s.proto(), "ckan");
        assert_eq!(s.resource_url(), "http://ckan.example.org/dataset/x.csv");
    }

    #[test]
    fn force_archive_override() {
        let s = SourceSpec::parse_with(
            "http://example.com/download?id=7",
            Overrides {
                force_archive: true,
                ..Overrides::default()
            },
        );
        assert_eq!(s.kind(), Kind::Zip);
        assert!(s.is_archive());
        let pinned = s.update(Overrides {
            target_file: Some("a.csv".to_string()),
            ..Overrides::default()
        });
        assert_eq!(pinned.kind(), Kind::Zip);
        assert_eq!(pinned.target_file(), Some("a.csv"));
        assert_eq!(pinned.target_format(), Some("csv"));
    }

    #[test]
    fn update_recomputes_target_format() {
        let s = SourceSpec::parse("http://ex.com/bundle.zip");
        let u = s.update(Overrides {
            target_file: Some("b.xlsx".to_string()),
            ..Overrides::default()
        });
        assert_eq!(u.target_file(), Some("b.xlsx"));
        assert_eq!(u.target_format(), Some("xlsx"));
        assert_eq!(u.rebuild_url(), "http://ex.com/bundle.zip#b.xlsx");

        let seg = u.update(Overrides {
            target_segment: Some("Sheet1".to_string()),
            ..Overrides::default()
        });
        assert_eq!(seg.target_file(), Some("b.xlsx"));
        assert_eq!(seg.target_segment(), Some("Sheet1"));
        assert_eq!(seg.rebuild_url(), "http://ex.com/bundle.zip#b.xlsx%3BSheet1");
        // the original is untouched
        assert_eq!(s.target_file(), None);
    }

    #[test]
    fn explicit_target_format_survives_update() {
        let s = SourceSpec::parse_with(
            "http://example.com/data.txt",
            Overrides {
                target_format: Some("CSV".to_string()),
                ..Overrides::default()
            },
        );
        assert_eq!(s.target_format(), Some("csv"));
        let u = s.update(Overrides {
            encoding: Some("latin1".to_string()),
            ..Overrides::default()
        });
        assert_eq!(u.target_format(), Some("csv"));
        assert_eq!(u.encoding(), Some("latin1"));
    }

    #[test]
    fn rebuild_round_trips() {
        for raw in [
            "http://ex.com/data.csv.zip",
            "http://ex.com/bundle.zip#a.csv;Sheet1",
            "http://example.com/book.xlsx#2",
            "gs://1AbCdEfGh#Sheet2",
            "s3://bucket/dir/key.csv",
            "socrata+https://data.example.gov/api/views/abcd-1234",
            "metatab+http://example.com/pkg.zip#root",
            "ipynb+file:nb/a.ipynb#tag",
            "file:/tmp/local.tsv",
            "foo://host/data.csv#x",
        ] {
            let s = SourceSpec::parse(raw);
            let again = SourceSpec::parse(&s.rebuild_url());
            assert_eq!(again.kind(), s.kind(), "{}", raw);
            assert_eq!(again.proto(), s.proto(), "{}", raw);
            assert_eq!(again.resource_url(), s.resource_url(), "{}", raw);
            assert_eq!(again.target_file(), s.target_file(), "{}", raw);
            assert_eq!(again.target_format(), s.target_format(), "{}", raw);
            assert_eq!(again.target_segment(), s.target_segment(), "{}", raw);
        }
    }

    #[test]
    fn component_urls() {
        let g = SourceSpec::parse("http://example.com/data/index.csv");
        assert_eq!(g.component_url("other.csv"), "http://example.com/data/other.csv");
        assert_eq!(
            g.component_url("https://elsewhere.org/x.csv"),
            "https://elsewhere.org/x.csv"
        );

        let z = SourceSpec::parse("http://example.com/bundle.zip");
        assert_eq!(z.component_url("a.csv"), "http://example.com/bundle.zip#a.csv");

        let s3 = SourceSpec::parse("s3://bucket/dir/key.csv");
        assert_eq!(s3.component_url("other.csv"), "s3://bucket/dir/other.csv");

        let gs = SourceSpec::parse("gs://1AbC");
        assert_eq!(gs.component_url("Sheet3"), "gs://1AbC#Sheet3");
    }

    #[test]
    fn serializes_to_json() {
        let s = SourceSpec::parse("http://ex.com/data.csv.zip");
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["kind"], "zip");
        assert_eq!(json["target_file"], "data.csv");
        assert!(json.get("overrides").is_none());
        let back: SourceSpec = serde_json::from_value(json).unwrap();
        assert_eq!(back, s);
    }
}
