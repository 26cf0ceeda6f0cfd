//! Body decoding.
//!
//! The `Content-Type` charset wins; without one, the first KiB of the body
//! is scanned for `<meta charset=...>` or an `http-equiv` content type.
//! Anything else is read as UTF-8.

use std::sync::LazyLock;

use encoding_rs::{Encoding, UTF_8};
use regex::bytes::Regex;
use tracing::debug;

/// Bytes scanned for a `<meta>` declaration.
const SNIFF_LEN: usize = 1024;

/// `charset=` inside a `<meta>` tag, either form. Byte-level so undecoded
/// Shift_JIS text around it does not stop the match.
static META_CHARSET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i-u)<meta[^>]*?charset\s*=\s*["']?\s*([a-z0-9_.:\-]+)"#)
        .expect("meta charset regex")
});

/// The `charset` parameter of a `Content-Type` value.
pub fn header_charset(content_type: &str) -> Option<&str> {
    content_type
        .split(';')
        .skip(1)
        .filter_map(|param| param.split_once('='))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("charset"))
        .map(|(_, value)| value.trim().trim_matches('"'))
        .filter(|value| !value.is_empty())
}

/// The encoding a page declares in its leading `<meta>` tags.
pub fn sniff_meta_charset(body: &[u8]) -> Option<&'static Encoding> {
    let head = &body[..body.len().min(SNIFF_LEN)];
    let caps = META_CHARSET_RE.captures(head)?;
    Encoding::for_label(&caps[1])
}

/// Decode a response body to text.
pub fn decode_body(body: &[u8], header_charset: Option<&str>) -> String {
    let encoding = header_charset
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .or_else(|| sniff_meta_charset(body))
        .unwrap_or(UTF_8);

    let (text, used, had_errors) = encoding.decode(body);
    debug!(encoding = used.name(), had_errors, "body decoded");
    text.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// "東京" in Shift_JIS.
    const TOKYO_SJIS: [u8; 4] = [0x93, 0x8c, 0x8b, 0x9e];

    fn page(head: &str) -> Vec<u8> {
        let mut body = format!("<html><head>{head}</head><body>").into_bytes();
        body.extend_from_slice(&TOKYO_SJIS);
        body.extend_from_slice(b"</body></html>");
        body
    }

    #[test]
    fn charset_from_header_value() {
        assert_eq!(header_charset("text/html; charset=Shift_JIS"), Some("Shift_JIS"));
        assert_eq!(header_charset("text/html;Charset=\"EUC-JP\""), Some("EUC-JP"));
        assert_eq!(header_charset("text/html"), None);
        assert_eq!(header_charset("text/html; charset="), None);
    }

    #[test]
    fn http_equiv_meta_is_honoured() {
        let body = page(
            r#"<meta http-equiv="Content-Type" content="text/html; charset=Shift_JIS">"#,
        );
        assert_eq!(sniff_meta_charset(&body), Some(encoding_rs::SHIFT_JIS));
        assert!(decode_body(&body, None).contains("<body>東京</body>"));
    }

    #[test]
    fn meta_charset_attribute_is_honoured() {
        let body = page(r#"<meta charset="shift_jis">"#);
        assert!(decode_body(&body, None).contains("東京"));
    }

    #[test]
    fn header_overrides_meta() {
        let body = "<meta charset=\"Shift_JIS\"><p>東京</p>".as_bytes();
        assert!(decode_body(body, Some("utf-8")).contains("東京"));
    }

    #[test]
    fn undeclared_body_is_utf8() {
        assert_eq!(decode_body("<p>平塚</p>".as_bytes(), None), "<p>平塚</p>");
    }
}
