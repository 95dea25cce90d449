//! A single article and the views derived from its markup.

use once_cell::sync::OnceCell;
use serde::Serialize;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::link::{self, LinkSet, WikipediaLink};
use crate::policy::LinkPolicy;
use crate::redirect;
use crate::section::{self, Heading};
use crate::template::{self, WikipediaTemplate};
use crate::title;

const DISAMBIGUATION_TEMPLATES: &[&str] = &["disambiguation", "disambig", "dab", "dis", "geodis", "hndis"];

/// One article: identity plus raw markup.
///
/// Every derived view is a pure function of the markup, computed on first
/// access and cached. The caches are `OnceCell`s, so concurrent readers of
/// one page see a single parse.
#[derive(Debug)]
pub struct WikipediaPage {
    page_id: u64,
    namespace_id: i32,
    title: String,
    raw_markup: String,
    policy: Arc<LinkPolicy>,

    templates: OnceCell<Vec<WikipediaTemplate>>,
    infoboxes: OnceCell<Vec<WikipediaTemplate>>,
    link_set: OnceCell<LinkSet>,
    headings: OnceCell<Vec<Heading>>,
    sections: OnceCell<Vec<String>>,
    redirect: OnceCell<Option<String>>,
    clean_title: OnceCell<String>,
}

/// Serializable snapshot of a parsed page.
#[derive(Debug, Serialize)]
pub struct PageSummary<'a> {
    pub id: u64,
    pub ns: i32,
    pub title: &'a str,
    pub clean_title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<&'a str>,
    #[serde(skip_serializing_if = "is_empty_slice")]
    pub sections: &'a [String],
    #[serde(skip_serializing_if = "is_empty_slice")]
    pub categories: &'a [String],
    #[serde(skip_serializing_if = "is_empty_slice")]
    pub links: &'a [WikipediaLink],
    #[serde(skip_serializing_if = "is_empty_slice")]
    pub infoboxes: &'a [WikipediaTemplate],
}

fn is_empty_slice<T>(items: &&[T]) -> bool {
    items.is_empty()
}

impl WikipediaPage {
    /// Build a page under the default link policy.
    ///
    /// Absent markup is treated as empty. A blank title is rejected.
    pub fn new(
        page_id: u64,
        namespace_id: i32,
        title: impl Into<String>,
        raw_markup: Option<String>,
    ) -> Result<Self> {
        Self::with_policy(page_id, namespace_id, title, raw_markup, Arc::new(LinkPolicy::default()))
    }

    pub fn with_policy(
        page_id: u64,
        namespace_id: i32,
        title: impl Into<String>,
        raw_markup: Option<String>,
        policy: Arc<LinkPolicy>,
    ) -> Result<Self> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(Error::EmptyTitle { page_id });
        }
        Ok(WikipediaPage {
            page_id,
            namespace_id,
            title,
            raw_markup: raw_markup.unwrap_or_default(),
            policy,
            templates: OnceCell::new(),
            infoboxes: OnceCell::new(),
            link_set: OnceCell::new(),
            headings: OnceCell::new(),
            sections: OnceCell::new(),
            redirect: OnceCell::new(),
            clean_title: OnceCell::new(),
        })
    }

    pub fn page_id(&self) -> u64 {
        self.page_id
    }

    pub fn namespace_id(&self) -> i32 {
        self.namespace_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn raw_markup(&self) -> &str {
        &self.raw_markup
    }

    /// Every top-level template, infobox or not.
    pub fn templates(&self) -> &[WikipediaTemplate] {
        self.templates.get_or_init(|| {
            let templates = template::extract_templates(&self.raw_markup);
            log::trace!("page {}: {} top-level templates", self.page_id, templates.len());
            templates
        })
    }

    pub fn infoboxes(&self) -> &[WikipediaTemplate] {
        self.infoboxes.get_or_init(|| {
            self.templates()
                .iter()
                .filter_map(WikipediaTemplate::as_infobox)
                .collect()
        })
    }

    fn link_set(&self) -> &LinkSet {
        self.link_set.get_or_init(|| {
            let set = link::extract_link_set(&self.raw_markup, &self.policy);
            log::trace!(
                "page {}: {} links, {} categories",
                self.page_id,
                set.links.len(),
                set.categories.len()
            );
            set
        })
    }

    pub fn links(&self) -> &[WikipediaLink] {
        &self.link_set().links
    }

    pub fn categories(&self) -> &[String] {
        &self.link_set().categories
    }

    /// Link destinations without `#fragment`s; same-page anchors are dropped.
    pub fn link_targets(&self) -> Vec<&str> {
        self.links()
            .iter()
            .map(WikipediaLink::target)
            .filter(|target| !target.is_empty())
            .collect()
    }

    pub fn headings(&self) -> &[Heading] {
        self.headings
            .get_or_init(|| section::extract_headings(&self.raw_markup))
    }

    /// Heading texts in document order, depth ignored.
    pub fn sections(&self) -> &[String] {
        self.sections
            .get_or_init(|| self.headings().iter().map(|h| h.text.clone()).collect())
    }

    pub fn redirect_title(&self) -> Option<&str> {
        self.redirect
            .get_or_init(|| redirect::detect_redirect(&self.raw_markup))
            .as_deref()
    }

    pub fn clean_title(&self) -> &str {
        self.clean_title.get_or_init(|| title::clean_title(&self.title))
    }

    pub fn is_redirect(&self) -> bool {
        self.redirect_title().is_some()
    }

    /// Main (article) namespace.
    pub fn is_article(&self) -> bool {
        self.namespace_id == 0
    }

    pub fn is_empty(&self) -> bool {
        self.raw_markup.trim().is_empty()
    }

    pub fn is_disambiguation(&self) -> bool {
        self.templates().iter().any(|t| {
            let name = template::normalize_name(t.name()).to_lowercase();
            DISAMBIGUATION_TEMPLATES.contains(&name.as_str()) || name.ends_with(" disambiguation")
        })
    }

    pub fn is_stub(&self) -> bool {
        self.templates()
            .iter()
            .any(|t| template::normalize_name(t.name()).to_lowercase().ends_with("stub"))
    }

    pub fn summary(&self) -> PageSummary<'_> {
        PageSummary {
            id: self.page_id,
            ns: self.namespace_id,
            title: &self.title,
            clean_title: self.clean_title(),
            redirect: self.redirect_title(),
            sections: self.sections(),
            categories: self.categories(),
            links: self.links(),
            infoboxes: self.infoboxes(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn page(title: &str, markup: &str) -> WikipediaPage {
        WikipediaPage::new(1, 0, title, Some(markup.to_string())).unwrap()
    }

    #[test]
    fn blank_title_fails_fast() {
        let err = WikipediaPage::new(42, 0, "  ", None).unwrap_err();
        assert!(matches!(err, Error::EmptyTitle { page_id: 42 }));
    }

    #[test]
    fn title_only_page() {
        let p = WikipediaPage::new(7, 0, "Oregon, Illinois", None).unwrap();
        assert!(p.is_empty());
        assert_eq!(p.clean_title(), "Oregon");
        assert!(p.infoboxes().is_empty());
        assert!(p.links().is_empty());
        assert!(p.categories().is_empty());
        assert!(p.sections().is_empty());
        assert_eq!(p.redirect_title(), None);
    }

    #[test]
    fn identity_getters() {
        let p = WikipediaPage::new(5, 14, "Category:Rivers", Some("x".to_string())).unwrap();
        assert_eq!(p.page_id(), 5);
        assert_eq!(p.namespace_id(), 14);
        assert_eq!(p.title(), "Category:Rivers");
        assert_eq!(p.raw_markup(), "x");
        assert!(!p.is_article());
    }

    #[test]
    fn disambiguation_and_stub() {
        assert!(page("Mercury", "'''Mercury''' may refer to:\n{{disambiguation}}").is_disambiguation());
        assert!(page("Springfield", "{{Geodis}}").is_disambiguation());
        assert!(page("Smith", "{{Surname disambiguation}}").is_disambiguation());
        assert!(page("Jones", "{{Surname_disambiguation}}").is_disambiguation());
        assert!(!page("Dresden", "{{Infobox German location|Name=Dresden}}").is_disambiguation());

        assert!(page("Tiny village", "A village.\n{{Saxony-geo-stub}}").is_stub());
        assert!(!page("Dresden", "{{Infobox German location}}").is_stub());
    }

    #[test]
    fn link_targets_strip_anchors() {
        let p = page("X", "[[Dresden#History|history]], [[#Notes]], [[ Elbe ]]");
        assert_eq!(p.link_targets(), vec!["Dresden", "Elbe"]);
    }

    #[test]
    fn custom_policy_is_used() {
        let policy = LinkPolicy::from_yaml_str(
            "category_namespaces: [kategorie]\nexcluded_namespaces: [datei]\n",
        )
        .unwrap();
        let p = WikipediaPage::with_policy(
            1,
            0,
            "Dresden",
            Some("[[Kategorie:Ort in Sachsen]] [[Datei:Elbe.jpg]] [[Elbe]]".to_string()),
            Arc::new(policy),
        )
        .unwrap();
        assert_eq!(p.categories(), ["Ort in Sachsen".to_string()]);
        let destinations: Vec<&str> = p.links().iter().map(|l| l.destination()).collect();
        assert_eq!(destinations, vec!["Elbe"]);
    }

    #[test]
    fn summary_serializes_without_empty_views() {
        let p = page("Los Angeles (disambiguation)", "#REDIRECT [[Los Angeles]]");
        let json = serde_json::to_value(p.summary()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": 1,
                "ns": 0,
                "title": "Los Angeles (disambiguation)",
                "clean_title": "Los Angeles",
                "redirect": "Los Angeles",
                "links": [{"destination": "Los Angeles"}]
            })
        );
    }

    #[test]
    fn page_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<WikipediaPage>();
    }
}
