//! Splitting a MediaWiki XML export into pages.
//!
//! The export is read in chunks and cut on `<page>`/`</page>`; fields are
//! pulled out of each page with regexes. This is deliberately shallow: only
//! title, namespace, page id and text are needed.

use lazy_static::lazy_static;
use regex::Regex;
use std::io::{BufRead, Read};

lazy_static! {
    static ref TITLE_PATTERN: Regex = Regex::new(r"<title>([^<]+)</title>").unwrap();
    static ref NS_PATTERN: Regex = Regex::new(r"<ns>(-?\d+)</ns>").unwrap();
    // The page id precedes the revision ids, so the first <id> is the page's.
    static ref ID_PATTERN: Regex = Regex::new(r"<id>(\d+)</id>").unwrap();
    static ref TEXT_PATTERN: Regex = Regex::new(r"(?s)<text[^>]*>(.*?)</text>").unwrap();
}

/// One `<page>` element, fields decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPage {
    /// Position in the input stream, used to restore order after parallel work.
    pub seq: usize,
    pub page_id: u64,
    pub namespace_id: i32,
    pub title: String,
    pub text: Option<String>,
}

/// Feed every complete `<page>...</page>` element to `callback`.
///
/// Stops early when the callback returns `false`.
pub fn scan_pages(mut reader: impl BufRead, mut callback: impl FnMut(String) -> bool) -> std::io::Result<()> {
    let mut buffer = String::new();
    let mut pending: Vec<u8> = Vec::new();
    let mut chunk = vec![0u8; 1024 * 1024];

    loop {
        let bytes_read = reader.read(&mut chunk)?;
        if bytes_read == 0 {
            break;
        }

        // Bytes of a character cut at the chunk end wait in `pending`
        pending.extend_from_slice(&chunk[..bytes_read]);
        take_utf8(&mut pending, &mut buffer);

        // Extract complete pages
        while let Some(start) = buffer.find("<page>") {
            if let Some(end_offset) = buffer[start..].find("</page>") {
                let end = start + end_offset + "</page>".len();
                let page_xml = buffer[start..end].to_string();
                buffer.drain(..end);

                if !callback(page_xml) {
                    return Ok(());
                }
            } else {
                // Incomplete page: drop what precedes it and read more
                buffer.drain(..start);
                break;
            }
        }

        // Keep a short tail in case "<page>" straddles two chunks.
        if buffer.len() > 10 && !buffer.contains("<page>") {
            let mut cut = buffer.len() - 10;
            while !buffer.is_char_boundary(cut) {
                cut -= 1;
            }
            buffer.drain(..cut);
        }
    }

    Ok(())
}

/// Move the decodable prefix of `pending` into `buffer`, holding back a
/// multi-byte character cut off at the chunk boundary.
fn take_utf8(pending: &mut Vec<u8>, buffer: &mut String) {
    let valid = match std::str::from_utf8(pending) {
        Ok(_) => pending.len(),
        // Truncated sequence at the end: hold it back
        Err(e) if e.error_len().is_none() => e.valid_up_to(),
        // Genuinely invalid bytes are replaced by from_utf8_lossy
        Err(_) => pending.len(),
    };
    buffer.push_str(&String::from_utf8_lossy(&pending[..valid]));
    pending.drain(..valid);
}

/// Pull the fields out of one page element. `None` if it has no title.
pub fn parse_page_xml(page_xml: &str, seq: usize) -> Option<RawPage> {
    let title = TITLE_PATTERN.captures(page_xml).map(|cap| decode_entities(&cap[1]))?;
    // Missing ns or id default to 0, as in very old exports
    let namespace_id = NS_PATTERN
        .captures(page_xml)
        .and_then(|cap| cap[1].parse().ok())
        .unwrap_or(0);
    let page_id = ID_PATTERN
        .captures(page_xml)
        .and_then(|cap| cap[1].parse().ok())
        .unwrap_or(0);
    let text = TEXT_PATTERN.captures(page_xml).map(|cap| decode_entities(&cap[1]));

    Some(RawPage {
        seq,
        page_id,
        namespace_id,
        title,
        text,
    })
}

/// Undo the XML escaping applied to titles and text. `&amp;` goes last so
/// that `&amp;lt;` stays a literal `&lt;`.
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#039;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
