//! Display titles with disambiguation qualifiers removed.

use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    // First `)` after a `(` closes the group; one preceding space goes with it.
    static ref PARENTHETICAL: Regex = Regex::new(r" ?\([^)]*\)").unwrap();
    static ref SPACE_RUN: Regex = Regex::new(r" {2,}").unwrap();
}

/// Strip disambiguation qualifiers from an article title.
///
/// Parenthesized groups go first, wherever they appear; only then is the
/// result cut at its first comma. The order matters:
/// `West Seneca (town), New York` loses `(town)` and then `, New York`.
pub fn clean_title(raw: &str) -> String {
    let title: String = raw.nfc().collect();

    let without_groups = PARENTHETICAL.replace_all(&title, "");
    let collapsed = SPACE_RUN.replace_all(&without_groups, " ");
    let cleaned = collapsed.trim();

    match cleaned.split_once(',') {
        Some((head, _)) => head.trim_end().to_string(),
        None => cleaned.to_string(),
    }
}
