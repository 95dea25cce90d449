//! Balanced delimiter matching for wikitext.
//!
//! Every extractor in this crate locates constructs the same way: find an
//! opener, then walk forward counting nested openers and closers of the
//! *same* family until the depth returns to zero. Other families are plain
//! text to that walk, so a `{{ }}` span may freely contain `[[ ]]` spans and
//! vice versa.
//!
//! The walk never fails. An opener without a closer produces a span that runs
//! to the end of the text with `closed == false`, and the caller decides
//! whether such a best-effort match is worth keeping.

/// The three delimiter families used by wikitext constructs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    /// `{{` ... `}}`
    Template,
    /// `[[` ... `]]`
    Link,
    /// `[` ... `]`
    Bracket,
}

impl Delimiter {
    pub fn open(self) -> &'static str {
        match self {
            Delimiter::Template => "{{",
            Delimiter::Link => "[[",
            Delimiter::Bracket => "[",
        }
    }

    pub fn close(self) -> &'static str {
        match self {
            Delimiter::Template => "}}",
            Delimiter::Link => "]]",
            Delimiter::Bracket => "]",
        }
    }

    /// Which family, if any, opens at byte offset `i`.
    ///
    /// Double openers win over the single bracket, so `[[` is a link and not
    /// two nested brackets.
    pub fn opening_at(text: &str, i: usize) -> Option<Delimiter> {
        let rest = text.as_bytes().get(i..)?;
        if rest.starts_with(b"{{") {
            Some(Delimiter::Template)
        } else if rest.starts_with(b"[[") {
            Some(Delimiter::Link)
        } else if rest.starts_with(b"[") {
            Some(Delimiter::Bracket)
        } else {
            None
        }
    }
}

/// A matched (or best-effort) span.
///
/// `start` is the offset just after the opener and `end` the offset of the
/// closer, so `&text[start..end]` is the body. Unclosed spans end at
/// `text.len()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub closed: bool,
}

impl Span {
    pub fn body<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..self.end]
    }

    /// Offset just past the closer (or end of text when unclosed).
    pub fn after(&self, delimiter: Delimiter) -> usize {
        if self.closed {
            self.end + delimiter.close().len()
        } else {
            self.end
        }
    }
}

/// Find the closer matching an opener of `delimiter` whose body starts at `from`.
///
/// Only openers and closers of `delimiter`'s own family change the depth.
/// All delimiters are ASCII, so every offset returned is a char boundary.
pub fn find_closing(text: &str, delimiter: Delimiter, from: usize) -> Span {
    let bytes = text.as_bytes();
    let open = delimiter.open().as_bytes();
    let close = delimiter.close().as_bytes();
    let start = from.min(bytes.len());

    let mut depth = 1usize;
    let mut i = start;
    while i < bytes.len() {
        let rest = &bytes[i..];
        if rest.starts_with(open) {
            depth += 1;
            i += open.len();
        } else if rest.starts_with(close) {
            depth -= 1;
            if depth == 0 {
                return Span { start, end: i, closed: true };
            }
            i += close.len();
        } else {
            i += 1;
        }
    }

    log::trace!("unterminated {:?} span opened before byte {}", delimiter, start);
    Span { start, end: bytes.len(), closed: false }
}

/// Offset of the next `needle` byte at or after `from` that is not inside any
/// nested `{{ }}`, `[[ ]]` or `[ ]` span.
///
/// An opener that is never closed is plain text here, so a stray `[` in one
/// field does not hide the separators after it.
///
/// `needle` must not itself be an opener byte.
pub fn find_top_level(text: &str, needle: u8, from: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut i = from;
    while i < bytes.len() {
        if let Some(delimiter) = Delimiter::opening_at(text, i) {
            let span = find_closing(text, delimiter, i + delimiter.open().len());
            i = if span.closed {
                span.after(delimiter)
            } else {
                i + delimiter.open().len()
            };
            continue;
        }
        if bytes[i] == needle {
            return Some(i);
        }
        i += 1;
    }
    None
}

/// Split `text` on every top-level occurrence of `needle`.
///
/// Always yields at least one segment; empty segments are kept.
pub fn split_top_level(text: &str, needle: u8) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut last = 0;
    while let Some(pos) = find_top_level(text, needle, last) {
        segments.push(&text[last..pos]);
        last = pos + 1;
    }
    segments.push(&text[last..]);
    segments
}

/// Split `text` once, on the first top-level `needle`.
pub fn split_once_top_level(text: &str, needle: u8) -> (&str, Option<&str>) {
    match find_top_level(text, needle, 0) {
        Some(pos) => (&text[..pos], Some(&text[pos + 1..])),
        None => (text, None),
    }
}
