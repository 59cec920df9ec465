//! Percent-escaping for canonical URLs.
//!
//! Paths keep `/` and the sub-delimiters that are legal inside a path segment; query
//! components escape everything outside the RFC 3986 unreserved set.

use std::fmt::Write;

fn is_unreserved(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~')
}

fn is_path_safe(byte: u8) -> bool {
    is_unreserved(byte)
        || matches!(
            byte,
            b'/' | b'!' | b'$' | b'&' | b'\'' | b'(' | b')' | b'*' | b'+' | b',' | b';' | b'='
                | b':' | b'@' | b'^'
        )
}

fn escape_with(value: &str, keep: fn(u8) -> bool) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        if keep(byte) {
            out.push(char::from(byte));
        } else {
            // Writing to a String cannot fail.
            let _ = write!(out, "%{byte:02X}");
        }
    }
    out
}

/// Escape a path, keeping `/` separators intact.
#[must_use]
pub fn escape_path(value: &str) -> String {
    escape_with(value, is_path_safe)
}

/// Escape a query key or value.
#[must_use]
pub fn escape_query(value: &str) -> String {
    escape_with(value, is_unreserved)
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

fn unescape_with(value: &str, plus_is_space: bool) -> Option<String> {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hi = hex_value(*bytes.get(i + 1)?)?;
                let lo = hex_value(*bytes.get(i + 2)?)?;
                out.push(hi << 4 | lo);
                i += 3;
            }
            b'+' if plus_is_space => {
                out.push(b' ');
                i += 1;
            }
            byte => {
                out.push(byte);
                i += 1;
            }
        }
    }
    String::from_utf8(out).ok()
}

/// Decode a percent-escaped path. Returns `None` for malformed escapes or invalid UTF-8.
#[must_use]
pub fn unescape_path(value: &str) -> Option<String> {
    unescape_with(value, false)
}

/// Decode a query component; `+` means space.
#[must_use]
pub fn unescape_query(value: &str) -> Option<String> {
    unescape_with(value, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_keeps_separators_and_revision_syntax() {
        assert_eq!(escape_path("refs/heads/main~2^1"), "refs/heads/main~2^1");
        assert_eq!(escape_path("docs/read me.md"), "docs/read%20me.md");
        assert_eq!(escape_path("a?b#c%d"), "a%3Fb%23c%25d");
    }

    #[test]
    fn test_query_escapes_reserved() {
        assert_eq!(escape_query("a b+c/d"), "a%20b%2Bc%2Fd");
        assert_eq!(escape_query("AbC-_9"), "AbC-_9");
    }

    #[test]
    fn test_unescape_inverts_escape() {
        let raw = "dir/ünïcode file?.txt";
        assert_eq!(unescape_path(&escape_path(raw)).as_deref(), Some(raw));
        assert_eq!(unescape_query(&escape_query(raw)).as_deref(), Some(raw));
    }

    #[test]
    fn test_unescape_rejects_malformed() {
        assert_eq!(unescape_path("%zz"), None);
        assert_eq!(unescape_path("%4"), None);
        assert_eq!(unescape_path("%ff"), None);
    }

    #[test]
    fn test_plus_only_decodes_in_query() {
        assert_eq!(unescape_query("a+b").as_deref(), Some("a b"));
        assert_eq!(unescape_path("a+b").as_deref(), Some("a+b"));
    }
}
