//! Namespace-prefix rules deciding which `[[...]]` links are prose links.
//!
//! The defaults send `Category:` links to the category list and drop
//! `File:`/`Image:` embeds. Corpora with localized or extra namespaces can
//! ship their own rules as YAML:
//!
//! ```yaml
//! category_namespaces: [category, kategorie]
//! excluded_namespaces: [file, image, datei, bild]
//! ```

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LinkPolicy {
    /// Prefixes whose links are category memberships.
    #[serde(default)]
    pub category_namespaces: Vec<String>,
    /// Prefixes whose links are neither prose links nor categories.
    #[serde(default)]
    pub excluded_namespaces: Vec<String>,
}

/// How a link destination is treated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkClass {
    /// Category membership; carries the name with the prefix stripped.
    Category(String),
    /// Media embed or other non-content link.
    Excluded,
    /// Ordinary link, kept in the page's link list.
    Content,
}

impl Default for LinkPolicy {
    fn default() -> Self {
        LinkPolicy {
            category_namespaces: vec!["category".to_string()],
            excluded_namespaces: vec!["file".to_string(), "image".to_string()],
        }
    }
}

impl LinkPolicy {
    pub fn from_yaml_str(contents: &str) -> std::result::Result<Self, serde_yaml::Error> {
        let policy: LinkPolicy = serde_yaml::from_str(contents)?;
        Ok(policy.normalized())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|source| Error::PolicyIo {
            path: path.to_path_buf(),
            source,
        })?;
        let policy = Self::from_yaml_str(&contents).map_err(|source| Error::PolicyYaml {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!(
            "loaded link policy from {:?}: {} category, {} excluded namespaces",
            path,
            policy.category_namespaces.len(),
            policy.excluded_namespaces.len()
        );
        Ok(policy)
    }

    fn normalized(mut self) -> Self {
        for ns in self
            .category_namespaces
            .iter_mut()
            .chain(self.excluded_namespaces.iter_mut())
        {
            *ns = ns.trim().to_lowercase();
        }
        self
    }

    /// Classify a link destination by the text before its first `:`.
    ///
    /// A leading colon (`[[:Category:Foo]]`) leaves an empty prefix, which is
    /// how wikitext links *to* a category page rather than joining it.
    pub fn classify(&self, destination: &str) -> LinkClass {
        let Some((prefix, rest)) = destination.split_once(':') else {
            return LinkClass::Content;
        };
        let prefix = prefix.trim().to_lowercase();

        if self.category_namespaces.iter().any(|ns| *ns == prefix) {
            LinkClass::Category(rest.trim().to_string())
        } else if self.excluded_namespaces.iter().any(|ns| *ns == prefix) {
            LinkClass::Excluded
        } else {
            LinkClass::Content
        }
    }
}
