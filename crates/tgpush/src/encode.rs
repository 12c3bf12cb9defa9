//! Message text encoding for the two wire formats.
//!
//! GET requests carry the text in the query string and need
//! `application/x-www-form-urlencoded` escaping. POST requests send it inside
//! a JSON body rendered with `parse_mode = HTML`, where only the four
//! characters Telegram's HTML parser treats specially are escaped.

use url::form_urlencoded;

/// Target representation for message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeMode {
    /// Percent-encoded UTF-8 for a query parameter.
    UrlQuery,
    /// HTML-escaped text for a JSON body.
    JsonBody,
}

/// Encode `source` for the given mode. Absent input encodes to an empty string.
pub fn encode(source: Option<&str>, mode: EncodeMode) -> String {
    let Some(source) = source else {
        return String::new();
    };

    match mode {
        EncodeMode::UrlQuery => url_encode(source),
        EncodeMode::JsonBody => html_encode(source),
    }
}

/// Form-urlencode `source` as UTF-8 (spaces become `+`).
pub fn url_encode(source: &str) -> String {
    form_urlencoded::byte_serialize(source.as_bytes()).collect()
}

/// Escape `<`, `>`, `&` and `"` in a single pass.
///
/// Everything else, newlines included, is copied through untouched, so
/// existing entities such as `&lt;` become `&amp;lt;`.
pub fn html_encode(source: &str) -> String {
    let mut buffer = String::with_capacity(source.len());
    for ch in source.chars() {
        match ch {
            '<' => buffer.push_str("&lt;"),
            '>' => buffer.push_str("&gt;"),
            '&' => buffer.push_str("&amp;"),
            '"' => buffer.push_str("&quot;"),
            other => buffer.push(other),
        }
    }
    buffer
}
