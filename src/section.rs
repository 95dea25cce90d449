//! Section headings: lines of the form `== Text ==`.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Heading {
    pub text: String,
    /// Number of `=` on each side; `== History ==` is level 2.
    pub level: usize,
}

/// All headings in document order.
pub fn extract_headings(markup: &str) -> Vec<Heading> {
    markup.lines().filter_map(parse_heading_line).collect()
}

/// Heading texts in document order, all levels flattened together.
pub fn extract_sections(markup: &str) -> Vec<String> {
    extract_headings(markup).into_iter().map(|h| h.text).collect()
}

/// A heading needs at least two `=` on each side and the same count on both.
/// Anything else is not a heading.
pub fn parse_heading_line(line: &str) -> Option<Heading> {
    let line = line.trim();
    let leading = line.bytes().take_while(|&b| b == b'=').count();
    if leading == line.len() {
        return None;
    }
    let trailing = line.bytes().rev().take_while(|&b| b == b'=').count();
    if leading < 2 || trailing < 2 {
        return None;
    }
    if leading != trailing {
        log::trace!("skipping unbalanced heading {:?}", line);
        return None;
    }

    let text = line[leading..line.len() - trailing].trim();
    if text.is_empty() {
        return None;
    }
    Some(Heading {
        text: text.to_string(),
        level: leading,
    })
}
