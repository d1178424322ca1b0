//! Per-kind derivation of resource and target fields.
//!
//! Every kind runs the same four steps in the same order: protocol tag,
//! resource URL/file/format, fragment decomposition, target defaults. Kinds
//! differ only inside the steps.

use super::{decompose_fragment, Kind, ARCHIVE_FORMATS};
use crate::spec::{Overrides, SourceSpec};
use crate::url_model::{self, basename, file_ext, join, join_url_path, quote_plus, Parts};

const GOOGLE_CSV_TEMPLATE: &str = "https://docs.google.com/spreadsheets/d/{key}/export?format=csv";
const S3_PUBLIC_HOST: &str = "s3.amazonaws.com";

/// Double extensions that name the single member of a zip (`x.csv.zip`).
const ZIP_ALIAS_EXTS: &[&str] = &["csv", "xls", "xlsx"];

struct Draft {
    kind: Kind,
    url: String,
    parts: Parts,
    proto: Option<String>,
    resource_url: String,
    resource_file: String,
    resource_format: Option<String>,
    target_file: Option<String>,
    target_format: Option<String>,
    target_segment: Option<String>,
    encoding: Option<String>,
    auth_resource_url: Option<String>,
}

fn lower(v: &Option<String>) -> Option<String> {
    v.as_ref().filter(|s| !s.is_empty()).map(|s| s.to_lowercase())
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

/// Normalizes the raw locator the way `kind` expects to see it.
fn normalize(kind: Kind, raw: &str) -> String {
    match kind {
        Kind::Application => raw.trim().to_string(),
        Kind::Notebook | Kind::Program => {
            let tag = kind.fixed_proto().unwrap_or_default();
            url_model::reparse(raw, |p| {
                if p.scheme == tag {
                    p.scheme = "file".to_string();
                }
                p.scheme_extension = Some(tag.to_string());
            })
        }
        _ => url_model::reparse(raw, |_| {}),
    }
}

/// Builds a descriptor of kind `kind` from `raw`.
///
/// `effective` drives the derivation; `explicit` is what gets stored on the
/// descriptor so that `update` can re-apply the caller's own overrides
/// without freezing derived values.
pub(crate) fn derive(kind: Kind, raw: &str, effective: &Overrides, explicit: Overrides) -> SourceSpec {
    let url = normalize(kind, raw);
    let parts = url_model::parse(&url);

    let mut d = Draft {
        kind,
        url,
        parts,
        proto: lower(&effective.proto),
        resource_url: String::new(),
        resource_file: String::new(),
        resource_format: lower(&effective.resource_format),
        target_file: effective.target_file.clone().filter(|s| !s.is_empty()),
        target_format: lower(&effective.target_format),
        target_segment: effective.target_segment.clone().filter(|s| !s.is_empty()),
        encoding: effective.encoding.clone().filter(|s| !s.is_empty()),
        auth_resource_url: None,
    };

    d.apply_fixed();
    d.process_proto();
    d.process_resource_url();
    d.process_fragment();
    d.process_target_file();
    d.process_auth_url();

    let is_archive = d
        .resource_format
        .as_deref()
        .is_some_and(|f| ARCHIVE_FORMATS.contains(&f));

    SourceSpec {
        kind: d.kind,
        url: d.url,
        proto: d.proto.unwrap_or_else(|| "file".to_string()),
        resource_url: d.resource_url,
        resource_file: d.resource_file,
        resource_format: d.resource_format,
        is_archive,
        target_file: d.target_file,
        target_format: d.target_format,
        target_segment: d.target_segment,
        encoding: d.encoding,
        auth_resource_url: d.auth_resource_url,
        overrides: explicit,
    }
}

impl Draft {
    fn is_archive(&self) -> bool {
        self.resource_format
            .as_deref()
            .is_some_and(|f| ARCHIVE_FORMATS.contains(&f))
    }

    /// Values a kind imposes regardless of what the caller asked for.
    fn apply_fixed(&mut self) {
        if let Some(proto) = self.kind.fixed_proto() {
            self.proto = Some(proto.to_string());
        }
        match self.kind {
            Kind::Socrata | Kind::GoogleSheet => {
                self.resource_format = Some("csv".to_string());
                self.encoding = Some("utf8".to_string());
            }
            Kind::Zip => self.resource_format = Some("zip".to_string()),
            _ => {}
        }
    }

    fn process_proto(&mut self) {
        if self.proto.is_none() {
            self.proto = Some(self.parts.proto());
        }
    }

    /// The locator with scheme extension and fragment stripped.
    fn base_resource_url(&self) -> String {
        let mut p = self.parts.clone();
        p.scheme_extension = None;
        p.fragment = None;
        if p.scheme.is_empty() {
            p.scheme = "file".to_string();
        }
        url_model::unparse(&p)
    }

    fn default_resource_format(&mut self) {
        if self.resource_format.is_none() {
            self.resource_format = file_ext(&self.resource_file);
        }
    }

    fn process_resource_url(&mut self) {
        match self.kind {
            Kind::Notebook => {
                self.resource_url = self.base_resource_url().trim_matches('/').to_string();
                self.resource_file = basename(&self.parts.path).to_string();
                self.default_resource_format();
            }
            Kind::Metatab => {
                self.resource_url = self.base_resource_url();
                let format = file_ext(&self.parts.path)
                    .filter(|f| matches!(f.as_str(), "zip" | "xlsx" | "csv"));
                match format {
                    Some(f) => {
                        self.resource_file = basename(&self.parts.path).to_string();
                        self.resource_format = Some(f);
                    }
                    None => {
                        self.resource_url = join_url_path(&self.resource_url, &["metadata.csv"]);
                        self.resource_file = "metadata.csv".to_string();
                        self.resource_format = Some("csv".to_string());
                    }
                }
                self.target_file = Some(match self.resource_format.as_deref() {
                    Some("xlsx") => "meta".to_string(),
                    Some("zip") => "metadata.csv".to_string(),
                    _ => self.resource_file.clone(),
                });
                self.target_format = Some("metatab".to_string());
            }
            Kind::Socrata => {
                let mut p = self.parts.clone();
                p.scheme_extension = None;
                p.fragment = None;
                p.path = join(&p.path, "rows.csv");
                self.resource_url = url_model::unparse(&p);
                self.resource_file =
                    format!("{}.csv", basename(self.parts.path.trim_end_matches('/')));
                self.target_file = Some(self.resource_file.clone());
            }
            Kind::GoogleSheet => {
                // The worksheet id lands in the export URL, so the fragment
                // has to be decomposed first.
                self.process_fragment();
                let key = self.parts.netloc.clone();
                self.resource_url = GOOGLE_CSV_TEMPLATE.replace("{key}", &key);
                self.resource_file = key;
                if let Some(seg) = &self.target_segment {
                    self.resource_url.push_str("&gid=");
                    self.resource_url.push_str(&quote_plus(seg));
                    self.resource_file.push('-');
                    self.resource_file.push_str(seg);
                }
                self.resource_file.push_str(".csv");
                self.target_file = Some(self.resource_file.clone());
            }
            Kind::S3 => {
                let bucket = self.parts.netloc.clone();
                let key = self.parts.path.trim_matches('/').to_string();
                self.resource_url = format!("https://{}/{}/{}", S3_PUBLIC_HOST, bucket, key);
                self.resource_file = basename(&key).to_string();
                self.auth_resource_url = Some(format!("s3://{}/{}", bucket, key));
                self.default_resource_format();
            }
            Kind::Program
            | Kind::Ckan
            | Kind::Zip
            | Kind::Excel
            | Kind::Application
            | Kind::General => {
                self.resource_url = self.base_resource_url();
                self.resource_file = basename(&self.parts.path).to_string();
                self.default_resource_format();
            }
        }
    }

    fn process_fragment(&mut self) {
        let Some(frag) = self.parts.fragment.clone() else {
            return;
        };
        match self.kind {
            // The whole fragment is a selector (cell tag, metadata section).
            Kind::Notebook | Kind::Metatab => self.target_segment = non_empty(&frag),
            Kind::Zip => {
                let (file, segment) = decompose_fragment(&frag, true);
                self.target_file = file;
                self.target_segment = segment;
            }
            _ => {
                let (file, segment) = decompose_fragment(&frag, self.is_archive());
                self.target_segment = segment;
                if self.target_file.is_none() {
                    self.target_file = file;
                }
            }
        }
    }

    fn process_target_file(&mut self) {
        if self.kind == Kind::Zip {
            if self.target_file.is_none() {
                self.target_file = ZIP_ALIAS_EXTS
                    .iter()
                    .find(|ext| self.resource_file.ends_with(&format!(".{}.zip", ext)))
                    .map(|_| self.resource_file.trim_end_matches(".zip").to_string());
            }
        } else if self.target_file.is_none() {
            self.target_file = non_empty(&self.resource_file);
        }

        if self.target_format.is_none() {
            self.target_format = self.target_file.as_deref().and_then(file_ext);
        }
        if self.target_format.is_none() {
            self.target_format = self.resource_format.clone();
        }

        if self.kind == Kind::Notebook {
            self.target_format = Some("ipynb".to_string());
        }
    }

    /// Resources already in public S3 form can still be read with credentials.
    fn process_auth_url(&mut self) {
        if self.auth_resource_url.is_some() {
            return;
        }
        let rp = url_model::parse(&self.resource_url);
        if rp.hostname().as_deref() == Some(S3_PUBLIC_HOST) {
            let key = rp.path.trim_start_matches('/');
            if !key.is_empty() {
                self.auth_resource_url = Some(format!("s3://{}", key));
            }
        }
    }
}
