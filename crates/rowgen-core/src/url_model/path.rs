//! Slash-separated path helpers for locator paths.
//!
//! These operate on URL paths, not OS paths, so they always use `/`.

/// Last `/`-separated component.
pub fn basename(p: &str) -> &str {
    match p.rfind('/') {
        Some(i) => &p[i + 1..],
        None => p,
    }
}

/// Everything before the last `/`, with trailing slashes removed unless the
/// result is the root.
pub fn dirname(p: &str) -> &str {
    let head = match p.rfind('/') {
        Some(i) => &p[..i + 1],
        None => return "",
    };
    let trimmed = head.trim_end_matches('/');
    if trimmed.is_empty() {
        head
    } else {
        trimmed
    }
}

/// Joins `b` onto `a`; an absolute `b` replaces `a`. Backslashes become `/`.
pub fn join(a: &str, b: &str) -> String {
    let joined = if b.starts_with('/') || a.is_empty() {
        b.to_string()
    } else if a.ends_with('/') {
        format!("{}{}", a, b)
    } else {
        format!("{}/{}", a, b)
    };
    joined.replace('\\', "/")
}

/// Lower-cased extension of the last path component, without the dot.
///
/// Returns `None` when there is no extension, for dotfiles, and for `*`
/// (a regex fragment rather than a filename).
pub fn file_ext(v: &str) -> Option<String> {
    let name = basename(v).trim_start_matches('.');
    let (_, ext) = name.rsplit_once('.')?;
    if ext.is_empty() || ext == "*" {
        return None;
    }
    Some(ext.to_lowercase())
}
