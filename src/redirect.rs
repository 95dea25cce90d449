//! `#REDIRECT [[Target]]` detection.

use crate::link::parse_link_body;
use crate::scanner::{self, Delimiter};

const REDIRECT_MARKER: &str = "#redirect";

/// Target of a redirect page, or `None` for an ordinary page.
///
/// The marker must open the document (leading whitespace aside) and is
/// matched case-insensitively. The first complete `[[...]]` after it names
/// the target; display text after a pipe is ignored.
pub fn detect_redirect(markup: &str) -> Option<String> {
    let text = markup.trim_start();
    let head = text.get(..REDIRECT_MARKER.len())?;
    if !head.eq_ignore_ascii_case(REDIRECT_MARKER) {
        return None;
    }

    let rest = &text[REDIRECT_MARKER.len()..];
    let open = rest.find("[[")?;
    let span = scanner::find_closing(rest, Delimiter::Link, open + 2);
    if !span.closed {
        log::debug!("redirect marker without a complete link");
        return None;
    }

    let link = parse_link_body(span.body(rest));
    Some(link.destination().trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn simple_redirect() {
        assert_eq!(detect_redirect("#REDIRECT [[Los Angeles]]"), Some("Los Angeles".to_string()));
    }

    #[test]
    fn case_and_whitespace() {
        assert_eq!(
            detect_redirect("\n  #redirect[[ Los Angeles, California ]]\n{{R from short name}}"),
            Some("Los Angeles, California".to_string())
        );
        assert_eq!(detect_redirect("#Redirect: [[LA]]"), Some("LA".to_string()));
    }

    #[test]
    fn pipe_text_is_ignored_and_anchor_kept() {
        assert_eq!(
            detect_redirect("#REDIRECT [[Dresden#History|history of Dresden]]"),
            Some("Dresden#History".to_string())
        );
    }

    #[test]
    fn not_a_redirect() {
        assert_eq!(detect_redirect("'''Dresden''' is a city. #REDIRECT [[X]]"), None);
        assert_eq!(detect_redirect("#REDIRECTION"), None);
        assert_eq!(detect_redirect("#REDIRECT [[Unclosed"), None);
        assert_eq!(detect_redirect("#RE"), None);
        assert_eq!(detect_redirect(""), None);
    }

    #[test]
    fn multibyte_start_does_not_panic() {
        assert_eq!(detect_redirect("Ünîcödé text"), None);
    }
}
