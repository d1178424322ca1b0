//! Locator classification.
//!
//! A locator string is classified into exactly one [`Kind`] by walking an
//! ordered table of matchers; the first match wins and `General` matches
//! everything, so classification never fails. Each kind owns its derivation
//! of resource and target fields (see `derive`).

mod derive;
mod fragment;

pub(crate) use derive::derive;
pub use fragment::{compose_fragment, decompose_fragment};

use crate::spec::{Overrides, SourceSpec};
use crate::url_model::{self, file_ext, Parts};
use serde::{Deserialize, Serialize};

/// Container formats whose entries are addressed by `target_file`.
pub const ARCHIVE_FORMATS: &[&str] = &["zip"];

/// Spreadsheet formats whose worksheets are addressed by `target_segment`.
pub const WORKBOOK_FORMATS: &[&str] = &["xls", "xlsx"];

/// Locator variant, in matching priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    Notebook,
    Program,
    Metatab,
    Ckan,
    Socrata,
    GoogleSheet,
    Zip,
    Excel,
    S3,
    Application,
    General,
}

impl Kind {
    /// Protocol tag forced by the variant, if any.
    pub fn fixed_proto(self) -> Option<&'static str> {
        match self {
            Kind::Notebook => Some("ipynb"),
            Kind::Program => Some("program"),
            Kind::Metatab => Some("metatab"),
            Kind::Ckan => Some("ckan"),
            Kind::Socrata => Some("socrata"),
            Kind::GoogleSheet => Some("gs"),
            Kind::S3 => Some("s3"),
            Kind::Zip | Kind::Excel | Kind::Application | Kind::General => None,
        }
    }

    /// Application locators are opaque: their URL is kept verbatim.
    pub fn is_reparseable(self) -> bool {
        self != Kind::Application
    }
}

/// What the matchers look at.
pub(crate) struct Probe<'a> {
    proto: &'a str,
    ext: Option<&'a str>,
    force_archive: bool,
}

type Matcher = fn(&Probe<'_>) -> bool;

fn is_notebook(p: &Probe<'_>) -> bool {
    p.proto == "ipynb"
}
fn is_program(p: &Probe<'_>) -> bool {
    p.proto == "program"
}
fn is_metatab(p: &Probe<'_>) -> bool {
    p.proto == "metatab"
}
fn is_ckan(p: &Probe<'_>) -> bool {
    p.proto == "ckan"
}
fn is_socrata(p: &Probe<'_>) -> bool {
    p.proto == "socrata"
}
fn is_google_sheet(p: &Probe<'_>) -> bool {
    p.proto == "gs"
}
fn is_zip(p: &Probe<'_>) -> bool {
    p.ext == Some("zip") || p.force_archive
}
fn is_excel(p: &Probe<'_>) -> bool {
    matches!(p.ext, Some("xls") | Some("xlsx"))
}
fn is_s3(p: &Probe<'_>) -> bool {
    p.proto == "s3"
}
fn is_application(p: &Probe<'_>) -> bool {
    !matches!(p.proto, "file" | "ftp" | "http" | "https")
}
fn is_general(_: &Probe<'_>) -> bool {
    true
}

const MATCHERS: [(Kind, Matcher); 11] = [
    (Kind::Notebook, is_notebook),
    (Kind::Program, is_program),
    (Kind::Metatab, is_metatab),
    (Kind::Ckan, is_ckan),
    (Kind::Socrata, is_socrata),
    (Kind::GoogleSheet, is_google_sheet),
    (Kind::Zip, is_zip),
    (Kind::Excel, is_excel),
    (Kind::S3, is_s3),
    (Kind::Application, is_application),
    (Kind::General, is_general),
];

/// Extra protocol names mapped onto built-in kinds.
///
/// Built once at startup and handed to a [`Resolver`]; registered protocols
/// are checked before the built-in matchers.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    protocols: Vec<(String, Kind)>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps `proto` (e.g. `metapack`) onto `kind`. Later registrations of the
    /// same name replace earlier ones.
    pub fn register_protocol(&mut self, proto: &str, kind: Kind) {
        let proto = proto.to_ascii_lowercase();
        self.protocols.retain(|(p, _)| *p != proto);
        self.protocols.push((proto, kind));
    }

    pub fn with_protocol(mut self, proto: &str, kind: Kind) -> Self {
        self.register_protocol(proto, kind);
        self
    }

    /// Picks the kind for already-parsed locator parts.
    pub fn classify(&self, parts: &Parts, force_archive: bool) -> Kind {
        let proto = parts.proto();
        if let Some((_, kind)) = self.protocols.iter().find(|(p, _)| *p == proto) {
            return *kind;
        }
        let ext = file_ext(&parts.path);
        let probe = Probe {
            proto: &proto,
            ext: ext.as_deref(),
            force_archive,
        };
        MATCHERS
            .iter()
            .find(|(_, is_match)| is_match(&probe))
            .map(|(kind, _)| *kind)
            .unwrap_or(Kind::General)
    }
}

/// Turns raw locators into [`SourceSpec`]s using an injected [`Registry`].
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    registry: Registry,
}

impl Resolver {
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn resolve(&self, raw: &str) -> SourceSpec {
        self.resolve_with(raw, Overrides::default())
    }

    /// Resolves `raw`, applying explicit field overrides. Total: unknown
    /// protocols resolve to an application or general locator.
    pub fn resolve_with(&self, raw: &str, overrides: Overrides) -> SourceSpec {
        let kind = self
            .registry
            .classify(&url_model::parse(raw), overrides.force_archive);
        tracing::debug!(locator = raw, ?kind, "classified locator");
        derive(kind, raw, &overrides, overrides.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind_of(raw: &str) -> Kind {
        Registry::new().classify(&url_model::parse(raw), false)
    }

    #[test]
    fn priority_order() {
        assert_eq!(kind_of("ipynb+file:nb/a.ipynb"), Kind::Notebook);
        assert_eq!(kind_of("program+file:scripts/gen.py"), Kind::Program);
        assert_eq!(kind_of("metatab+http://example.com/pkg.zip"), Kind::Metatab);
        assert_eq!(kind_of("ckan+http://ckan.example.org/dataset/x"), Kind::Ckan);
        assert_eq!(kind_of("socrata+https://data.example.gov/api/views/x"), Kind::Socrata);
        assert_eq!(kind_of("gs://1AbC"), Kind::GoogleSheet);
        assert_eq!(kind_of("http://example.com/a.zip"), Kind::Zip);
        assert_eq!(kind_of("http://example.com/a.XLSX"), Kind::Excel);
        assert_eq!(kind_of("s3://bucket/key.csv"), Kind::S3);
        assert_eq!(kind_of("foo://host/x.csv"), Kind::Application);
        assert_eq!(kind_of("http://example.com/a.csv"), Kind::General);
        assert_eq!(kind_of("a.csv"), Kind::General);
    }

    #[test]
    fn zip_extension_beats_s3_protocol() {
        assert_eq!(kind_of("s3://bucket/archive.zip"), Kind::Zip);
    }

    #[test]
    fn force_archive_selects_zip() {
        let parts = url_model::parse("http://example.com/download?id=3");
        assert_eq!(Registry::new().classify(&parts, true), Kind::Zip);
        assert_eq!(Registry::new().classify(&parts, false), Kind::General);
    }

    #[test]
    fn registered_protocol_wins() {
        let reg = Registry::new().with_protocol("metapack", Kind::Metatab);
        let parts = url_model::parse("metapack+http://example.com/pkg/");
        assert_eq!(reg.classify(&parts, false), Kind::Metatab);
        assert_eq!(Registry::new().classify(&parts, false), Kind::Application);
    }

    #[test]
    fn reregistering_replaces() {
        let mut reg = Registry::new();
        reg.register_protocol("x", Kind::Ckan);
        reg.register_protocol("X", Kind::Socrata);
        let parts = url_model::parse("x+http://h/p");
        assert_eq!(reg.classify(&parts, false), Kind::Socrata);
    }
}
