//! Input normalization applied to user-supplied text before it is persisted, plus the
//! encoding used when stored values are placed back into URLs.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use url::Url;

/// Everything except RFC 3986 unreserved characters. `/` is encoded too, so a value always
/// stays a single path segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Escapes the five HTML-significant characters, quotes included, so stored text is safe
/// to place in element content and attribute values alike.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Upper-cases the first letter of every run of letters and lower-cases the rest.
///
/// Any non-letter starts a new word, so `"o'neil fc1x"` becomes `"O'Neil Fc1X"`.
pub fn title_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_word = false;
    for c in input.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

/// Case rule for human-chosen codes.
pub fn upper_case(input: &str) -> String {
    input.to_uppercase()
}

/// Percent-encodes `input` for use as one URL path segment.
///
/// Stored codes are HTML-escaped, so `A&amp;B` becomes `A%26amp%3BB`. The router decodes
/// it back to the stored value.
pub fn encode_path_segment(input: &str) -> String {
    utf8_percent_encode(input, PATH_SEGMENT).to_string()
}

/// Keeps `input` only if it parses as an absolute `http` or `https` URL; anything else
/// (`javascript:`, `data:`, relative paths) becomes empty.
pub fn web_link(input: &str) -> String {
    match Url::parse(input) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => input.trim().to_string(),
        _ => String::new(),
    }
}
