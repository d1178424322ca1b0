//! Form-style percent encoding for fragments.

use percent_encoding::percent_decode_str;

/// Percent-encodes everything but alphanumerics and `*-._`; spaces become `+`.
pub fn quote_plus(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

/// Inverse of [`quote_plus`]. Invalid UTF-8 is replaced, never rejected.
pub fn unquote_plus(s: &str) -> String {
    percent_decode_str(&s.replace('+', " "))
        .decode_utf8_lossy()
        .into_owned()
}
