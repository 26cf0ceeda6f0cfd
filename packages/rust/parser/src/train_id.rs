//! Train-number normalisation.

use std::sync::LazyLock;

use regex::Regex;

/// A run of digits with an optional letter suffix (`1234M`, `501A`, `12`).
static TRAIN_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[0-9]+[A-Z]*").expect("train id regex"));

/// Reduce a raw 列車番号 field to its number tokens joined by `-`.
///
/// Returns an empty string when the field holds no tokens.
pub fn normalize_train_id(raw: &str) -> String {
    TRAIN_ID_RE
        .find_iter(raw)
        .map(|m| m.as_str())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_token() {
        assert_eq!(normalize_train_id("1234M"), "1234M");
    }

    #[test]
    fn multiple_tokens_joined() {
        assert_eq!(normalize_train_id("2521M・2521Y"), "2521M-2521Y");
        assert_eq!(normalize_train_id("(併結)101a/3001"), "101a-3001");
    }

    #[test]
    fn no_tokens_is_empty() {
        assert_eq!(normalize_train_id("不明"), "");
        assert_eq!(normalize_train_id(""), "");
    }
}
