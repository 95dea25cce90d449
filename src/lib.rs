//! Structural parser for MediaWiki article markup.
//!
//! Turns the raw wikitext of one article into the handful of projections
//! downstream consumers need: infobox key/value records, internal links,
//! category memberships, section headings, the redirect target and a
//! disambiguation-free display title. It is not a full wikitext grammar and
//! never fails on malformed markup; broken constructs shrink the output
//! instead.
//!
//! ```no_run
//! use wikipage::WikipediaPage;
//!
//! let page = WikipediaPage::new(
//!     1,
//!     0,
//!     "Dresden",
//!     Some("{{Infobox German location|Name=Dresden}} [[Category:Cities in Saxony]]".to_string()),
//! )?;
//! assert_eq!(page.infoboxes()[0].entry("Name"), Some("Dresden"));
//! assert_eq!(page.categories(), ["Cities in Saxony".to_string()]);
//! # Ok::<(), wikipage::Error>(())
//! ```

pub mod error;
pub mod link;
pub mod page;
pub mod policy;
pub mod redirect;
pub mod scanner;
pub mod section;
pub mod template;
pub mod title;

pub use error::{Error, Result};
pub use link::WikipediaLink;
pub use page::{PageSummary, WikipediaPage};
pub use policy::{LinkClass, LinkPolicy};
pub use section::Heading;
pub use template::WikipediaTemplate;
pub use title::clean_title;
