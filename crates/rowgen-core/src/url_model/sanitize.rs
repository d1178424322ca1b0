//! Cache path segment sanitization.

use crate::checksum::sha224_hex;

/// Sanitizes one segment of a cache path derived from a URL.
///
/// - Returns `None` for empty, `.` and `..` segments so a URL can never
///   address a path outside the cache root
/// - Replaces NUL, `\`, and control characters with `_`
/// - Segments longer than 255 bytes (Linux NAME_MAX) keep a prefix and end
///   in `-{sha224}` of the whole segment, so distinct long names stay distinct
pub fn sanitize_cache_segment(seg: &str) -> Option<String> {
    const NAME_MAX: usize = 255;

    if seg.is_empty() || seg == "." || seg == ".." {
        return None;
    }

    let out: String = seg
        .chars()
        .map(|c| {
            if c == '\0' || c == '\\' || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    if out.len() <= NAME_MAX {
        return Some(out);
    }
    let digest = sha224_hex(seg);
    let mut take = NAME_MAX - digest.len() - 1;
    while take > 0 && !out.is_char_boundary(take) {
        take -= 1;
    }
    Some(format!("{}-{}", &out[..take], digest))
}
