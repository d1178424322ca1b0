//! Fragment grammar shared by all locator kinds.
//!
//! ```text
//! fragment(archive)     := target_file [";" target_segment]
//! fragment(non-archive) := target_segment
//! ```

/// Splits an already-decoded fragment into `(target_file, target_segment)`.
///
/// An archive fragment may name an inner file and a segment within it; a
/// non-archive fragment can only name a segment.
pub fn decompose_fragment(frag: &str, is_archive: bool) -> (Option<String>, Option<String>) {
    let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
    if is_archive {
        match frag.split_once(';') {
            Some((file, segment)) => (non_empty(file), non_empty(segment)),
            None => (non_empty(frag), None),
        }
    } else {
        (None, non_empty(frag))
    }
}

/// Inverse of [`decompose_fragment`]; `None` when there is nothing to encode.
pub fn compose_fragment(target_file: Option<&str>, target_segment: Option<&str>) -> Option<String> {
    let mut f = String::new();
    if let Some(tf) = target_file.filter(|s| !s.is_empty()) {
        f.push_str(tf);
        if target_segment.is_some_and(|s| !s.is_empty()) {
            f.push(';');
        }
    }
    if let Some(ts) = target_segment.filter(|s| !s.is_empty()) {
        f.push_str(ts);
    }
    (!f.is_empty()).then_some(f)
}
