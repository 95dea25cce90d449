//! Top-level template invocations: `{{name|key=value|positional}}`.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::scanner::{self, Delimiter};

lazy_static! {
    static ref INFOBOX_NAME: Regex = Regex::new(r"(?i)^infobox\b\s*").unwrap();
    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").unwrap();
}

/// One top-level template invocation.
///
/// Entries keep their document order. Keys need not be unique; lookups
/// resolve to the first occurrence. Values are kept verbatim apart from
/// surrounding whitespace, nested markup included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WikipediaTemplate {
    name: String,
    entries: Vec<(String, String)>,
    #[serde(skip_serializing_if = "is_false")]
    infobox: bool,
}

impl WikipediaTemplate {
    pub fn new(name: impl Into<String>, entries: Vec<(String, String)>) -> Self {
        WikipediaTemplate {
            name: name.into(),
            entries,
            infobox: false,
        }
    }

    /// Template name. For infoboxes this is the lower-cased type with the
    /// leading "infobox" removed (`Infobox German location` → `german location`).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Value of the first entry whose key equals `key` (case-sensitive).
    pub fn entry(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_infobox(&self) -> bool {
        self.infobox
    }

    /// The infobox view of this template, if its name starts with the word
    /// "infobox" (any case). Underscores and whitespace runs in the name are
    /// read as single spaces for this test, so `Infobox_German  location`
    /// reports `german location`.
    pub fn as_infobox(&self) -> Option<WikipediaTemplate> {
        if self.infobox {
            return Some(self.clone());
        }
        let normalized = normalize_name(&self.name);
        let m = INFOBOX_NAME.find(&normalized)?;
        Some(WikipediaTemplate {
            name: normalized[m.end()..].to_lowercase(),
            entries: self.entries.clone(),
            infobox: true,
        })
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// Every top-level template in `markup`, in document order.
///
/// Templates nested inside another template's body stay part of that
/// parent's field values. An unterminated `{{` is kept as a best-effort
/// template whose body runs to the end of the markup.
pub fn extract_templates(markup: &str) -> Vec<WikipediaTemplate> {
    let mut templates = Vec::new();
    let mut from = 0;

    while let Some(offset) = markup[from..].find("{{") {
        let open = from + offset;
        let span = scanner::find_closing(markup, Delimiter::Template, open + 2);
        if !span.closed {
            log::debug!("template opened at byte {} is never closed", open);
        }
        templates.push(parse_invocation(span.body(markup)));
        from = span.after(Delimiter::Template);
    }

    templates
}

/// Top-level templates classified as infoboxes, in document order.
pub fn extract_infoboxes(markup: &str) -> Vec<WikipediaTemplate> {
    extract_templates(markup)
        .iter()
        .filter_map(WikipediaTemplate::as_infobox)
        .collect()
}

/// Parse the text between `{{` and `}}`.
pub fn parse_invocation(body: &str) -> WikipediaTemplate {
    let mut segments = scanner::split_top_level(body, b'|').into_iter();
    let name = segments.next().unwrap_or_default().trim().to_string();

    let mut positional = 0usize;
    let entries = segments
        .map(|segment| match scanner::split_once_top_level(segment, b'=') {
            (key, Some(value)) => (key.trim().to_string(), value.trim().to_string()),
            (value, None) => {
                positional += 1;
                (positional.to_string(), value.trim().to_string())
            }
        })
        .collect();

    WikipediaTemplate::new(name, entries)
}

/// Underscores read as spaces and whitespace runs collapse, as in page titles.
/// Only used to classify templates; `name()` keeps the name as written.
pub(crate) fn normalize_name(raw: &str) -> String {
    let spaced = raw.replace('_', " ");
    WHITESPACE_RUN.replace_all(spaced.trim(), " ").into_owned()
}
