//! Internal links `[[destination|title]]` and category memberships.

use serde::Serialize;

use crate::policy::{LinkClass, LinkPolicy};
use crate::scanner::{self, Delimiter};

/// Parsed internal link: `[[destination|title]]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WikipediaLink {
    destination: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
}

impl WikipediaLink {
    pub fn new(destination: impl Into<String>, title: Option<String>) -> Self {
        WikipediaLink {
            destination: destination.into(),
            title,
        }
    }

    /// Link target as written, anchor included.
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Display text, present only when the link used the pipe syntax.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Page part of the destination, without any `#fragment`.
    pub fn target(&self) -> &str {
        match self.destination.split_once('#') {
            Some((page, _)) => page.trim(),
            None => self.destination.trim(),
        }
    }

    pub fn anchor(&self) -> Option<&str> {
        self.destination.split_once('#').map(|(_, anchor)| anchor)
    }

    /// Return display text if present, otherwise the destination.
    pub fn text(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.destination)
    }
}

/// Links and categories found in one pass over the markup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkSet {
    pub links: Vec<WikipediaLink>,
    pub categories: Vec<String>,
}

/// Scan every top-level `[[...]]` and classify it with `policy`.
///
/// Links nested in another link's body (an image caption, say) are consumed
/// with their parent. An unterminated `[[` is skipped and scanning resumes
/// right after it.
pub fn extract_link_set(markup: &str, policy: &LinkPolicy) -> LinkSet {
    let mut set = LinkSet::default();
    let mut from = 0;

    while let Some(offset) = markup[from..].find("[[") {
        let open = from + offset;
        let span = scanner::find_closing(markup, Delimiter::Link, open + 2);
        if !span.closed {
            log::debug!("link opened at byte {} is never closed", open);
            from = open + 2;
            continue;
        }
        from = span.after(Delimiter::Link);

        let link = parse_link_body(span.body(markup));
        match policy.classify(link.destination()) {
            LinkClass::Category(name) => set.categories.push(name),
            LinkClass::Excluded => {}
            LinkClass::Content => set.links.push(link),
        }
    }

    set
}

/// Content links under the default policy.
pub fn extract_links(markup: &str) -> Vec<WikipediaLink> {
    extract_link_set(markup, &LinkPolicy::default()).links
}

/// Category names under the default policy.
pub fn extract_categories(markup: &str) -> Vec<String> {
    extract_link_set(markup, &LinkPolicy::default()).categories
}

/// Split a link body on its first top-level pipe.
///
/// Both halves are kept as written. Whitespace around the destination only
/// matters once it is read as a page name, see [`WikipediaLink::target`].
pub fn parse_link_body(body: &str) -> WikipediaLink {
    let (destination, title) = scanner::split_once_top_level(body, b'|');
    WikipediaLink::new(destination, title.map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn link(destination: &str, title: Option<&str>) -> WikipediaLink {
        WikipediaLink::new(destination, title.map(str::to_string))
    }

    #[test]
    fn plain_and_piped_links() {
        let links = extract_links("The [[Elbe]] flows through [[Dresden|the city]].");
        assert_eq!(links, vec![link("Elbe", None), link("Dresden", Some("the city"))]);
    }

    #[test]
    fn splits_on_first_pipe_only() {
        let links = extract_links("[[a|b|c]]");
        assert_eq!(links, vec![link("a", Some("b|c"))]);
    }

    #[test]
    fn pipe_trick_keeps_empty_title() {
        let links = extract_links("[[Paris, Texas|]]");
        assert_eq!(links, vec![link("Paris, Texas", Some(""))]);
    }

    #[test]
    fn categories_are_separated() {
        let set = extract_link_set(
            "[[Saxony]]\n[[Category:Cities in Saxony|Dresden]]\n[[category:Elbe]]",
            &LinkPolicy::default(),
        );
        assert_eq!(set.links, vec![link("Saxony", None)]);
        assert_eq!(set.categories, vec!["Cities in Saxony", "Elbe"]);
    }

    #[test]
    fn media_embeds_are_dropped_with_their_captions() {
        let markup = "[[File:Frauenkirche.jpg|thumb|The [[Frauenkirche]] at night]] near [[Neumarkt]]";
        assert_eq!(extract_links(markup), vec![link("Neumarkt", None)]);
        assert!(extract_links("[[Image:Old.png|left]]").is_empty());
    }

    #[test]
    fn leading_colon_category_is_a_link() {
        let set = extract_link_set("see [[:Category:Rivers]]", &LinkPolicy::default());
        assert_eq!(set.links, vec![link(":Category:Rivers", None)]);
        assert!(set.categories.is_empty());
    }

    #[test]
    fn unterminated_link_does_not_hide_later_links() {
        let links = extract_links("[[Broken and then [[Fine]] text");
        assert_eq!(links, vec![link("Fine", None)]);
    }

    #[test]
    fn destination_is_kept_as_written() {
        let links = extract_links("[[ Elbe |the river ]] and [[Saxony ]]");
        assert_eq!(links, vec![link(" Elbe ", Some("the river ")), link("Saxony ", None)]);
        assert_eq!(links[0].target(), "Elbe");
        assert_eq!(links[1].target(), "Saxony");
    }

    #[test]
    fn padded_category_prefix_is_still_a_category() {
        let set = extract_link_set("[[ Category : Rivers of Saxony ]]", &LinkPolicy::default());
        assert!(set.links.is_empty());
        assert_eq!(set.categories, vec!["Rivers of Saxony"]);
    }

    #[test]
    fn template_in_title_does_not_split() {
        let links = extract_links("[[Moon|{{lang|la|Luna|x}}]]");
        assert_eq!(links, vec![link("Moon", Some("{{lang|la|Luna|x}}"))]);
    }

    #[test]
    fn anchors() {
        let l = link("Dresden#History", Some("history"));
        assert_eq!(l.target(), "Dresden");
        assert_eq!(l.anchor(), Some("History"));
        assert_eq!(l.text(), "history");

        let l = link("#Geography", None);
        assert_eq!(l.target(), "");
        assert_eq!(l.anchor(), Some("Geography"));
        assert_eq!(l.text(), "#Geography");
    }
}
