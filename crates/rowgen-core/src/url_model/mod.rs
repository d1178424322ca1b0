//! URL parts parsing and reconstruction.
//!
//! Splits a raw locator into primitive parts (scheme, scheme extension,
//! netloc, path, query, fragment) and rebuilds a locator string from them.
//! Accepts things that are not strictly URLs: relative and absolute local
//! paths, Windows drive paths, and `ext+scheme://` locators. Parsing is total;
//! an empty string parses to empty parts and unparses to an empty string.

mod encode;
mod path;
mod sanitize;

pub use encode::{quote_plus, unquote_plus};
pub use path::{basename, dirname, file_ext, join};
pub use sanitize::sanitize_cache_segment;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Primitive parts of a locator.
///
/// `netloc` is kept verbatim (including any userinfo and port); the
/// accessors derive hostname, username, password and port from it.
/// `fragment` is always stored percent-decoded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parts {
    pub scheme: String,
    pub scheme_extension: Option<String>,
    pub netloc: String,
    pub path: String,
    pub query: String,
    pub fragment: Option<String>,
}

impl Parts {
    /// Logical protocol: the scheme extension if there is one, otherwise the
    /// scheme with `https` folded into `http`.
    pub fn proto(&self) -> String {
        if let Some(ext) = self.scheme_extension.as_deref().filter(|e| !e.is_empty()) {
            return ext.to_string();
        }
        match self.scheme.as_str() {
            "https" => "http".to_string(),
            "" => "file".to_string(),
            s => s.to_string(),
        }
    }

    fn userinfo(&self) -> Option<&str> {
        self.netloc.rsplit_once('@').map(|(u, _)| u)
    }

    fn host_port(&self) -> &str {
        self.netloc
            .rsplit_once('@')
            .map(|(_, h)| h)
            .unwrap_or(&self.netloc)
    }

    /// Lower-cased host without userinfo or port.
    pub fn hostname(&self) -> Option<String> {
        let hp = self.host_port();
        let host = if let Some(rest) = hp.strip_prefix('[') {
            rest.split(']').next().unwrap_or("")
        } else {
            match hp.rsplit_once(':') {
                Some((h, p)) if p.chars().all(|c| c.is_ascii_digit()) => h,
                _ => hp,
            }
        };
        if host.is_empty() {
            None
        } else {
            Some(host.to_lowercase())
        }
    }

    pub fn username(&self) -> Option<&str> {
        self.userinfo()
            .map(|u| u.split(':').next().unwrap_or(u))
            .filter(|u| !u.is_empty())
    }

    pub fn password(&self) -> Option<&str> {
        self.userinfo()
            .and_then(|u| u.split_once(':'))
            .map(|(_, p)| p)
            .filter(|p| !p.is_empty())
    }

    pub fn port(&self) -> Option<u16> {
        let hp = self.host_port();
        let tail = match hp.rfind(']') {
            Some(i) => &hp[i + 1..],
            None => hp,
        };
        tail.rsplit_once(':').and_then(|(_, p)| p.parse().ok())
    }
}

fn drive_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z]:([\\/]|$)").expect("static regex"))
}

fn scheme_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-Za-z][A-Za-z0-9+.\-]*):").expect("static regex"))
}

/// Splits `raw` into its parts. Never fails.
///
/// - `C:\data\x.csv` becomes a `file` locator with path `C:/data/x.csv`
/// - `metapack+http://host/p` has scheme `http`, extension `metapack`
/// - a missing scheme defaults to `file`
pub fn parse(raw: &str) -> Parts {
    let raw = raw.trim();

    if drive_re().is_match(raw) {
        return Parts {
            scheme: "file".to_string(),
            path: raw.replace('\\', "/"),
            ..Parts::default()
        };
    }

    let (full_scheme, rest) = match scheme_re().captures(raw) {
        Some(c) => {
            let m = c.get(1).map(|m| m.as_str()).unwrap_or("");
            (m.to_ascii_lowercase(), &raw[m.len() + 1..])
        }
        None => (String::new(), raw),
    };

    let (scheme_extension, scheme) = match full_scheme.split_once('+') {
        Some((ext, s)) => (Some(ext.to_string()), s.to_string()),
        None => (None, full_scheme),
    };

    let (rest, fragment) = match rest.split_once('#') {
        Some((r, f)) => (r, Some(f)),
        None => (rest, None),
    };

    let (netloc, rest) = match rest.strip_prefix("//") {
        Some(after) => {
            let end = after.find(['/', '?']).unwrap_or(after.len());
            (after[..end].to_string(), &after[end..])
        }
        None => (String::new(), rest),
    };

    let (path, query) = match rest.split_once('?') {
        Some((p, q)) => (p.to_string(), q.to_string()),
        None => (rest.to_string(), String::new()),
    };

    Parts {
        scheme: if scheme.is_empty() {
            "file".to_string()
        } else {
            scheme
        },
        scheme_extension: scheme_extension.filter(|e| !e.is_empty()),
        netloc,
        path,
        query,
        fragment: fragment
            .filter(|f| !f.is_empty())
            .map(unquote_plus),
    }
}

/// Rebuilds a locator string from parts.
///
/// `file:` and `mailto:` locators without a netloc are written without `//`;
/// the fragment is percent-encoded.
pub fn unparse(parts: &Parts) -> String {
    let is_empty = parts.netloc.is_empty()
        && parts.path.is_empty()
        && parts.query.is_empty()
        && parts.fragment.is_none();
    if is_empty && (parts.scheme.is_empty() || parts.scheme == "file") {
        return String::new();
    }

    let mut url = if !parts.scheme.is_empty() && !parts.netloc.is_empty() {
        if parts.path.is_empty() {
            format!("{}://{}", parts.scheme, parts.netloc)
        } else {
            format!(
                "{}://{}/{}",
                parts.scheme,
                parts.netloc,
                parts.path.trim_start_matches('/')
            )
        }
    } else if parts.scheme == "file" || parts.scheme == "mailto" {
        format!("{}:{}", parts.scheme, parts.path)
    } else if !parts.scheme.is_empty() {
        format!("{}://{}", parts.scheme, parts.path.trim_start_matches('/'))
    } else {
        format!("file:{}", parts.path.trim_start_matches('/'))
    };

    if let Some(ext) = parts.scheme_extension.as_deref().filter(|e| !e.is_empty()) {
        url = format!("{}+{}", ext, url);
    }
    if !parts.query.is_empty() {
        url.push('?');
        url.push_str(&parts.query);
    }
    if let Some(frag) = parts.fragment.as_deref().filter(|f| !f.is_empty()) {
        url.push('#');
        url.push_str(&quote_plus(frag));
    }
    url
}

/// Parses `raw`, lets `edit` override fields, and serializes the result.
pub fn reparse(raw: &str, edit: impl FnOnce(&mut Parts)) -> String {
    let mut parts = parse(raw);
    edit(&mut parts);
    unparse(&parts)
}

/// Logical protocol of a raw locator (see [`Parts::proto`]).
pub fn extract_proto(raw: &str) -> String {
    parse(raw).proto()
}

/// True for `http`/`https` locators.
pub fn url_is_absolute(raw: &str) -> bool {
    matches!(parse(raw).scheme.as_str(), "http" | "https")
}

/// Joins `paths` onto the path component of `url`, leaving query and
/// fragment untouched.
pub fn join_url_path(url: &str, paths: &[&str]) -> String {
    reparse(url, |p| {
        let mut joined = p.path.clone();
        for seg in paths {
            joined = join(&joined, seg);
        }
        p.path = joined;
    })
}
