//! Cleanup of article and comment markup before packaging.
//!
//! Sanitizing writes a subtree as XHTML while dropping page chrome and
//! structured-data attributes, making links absolute and pointing images at
//! their archive filenames. The parsed page itself is never modified.

use std::borrow::Cow;
use std::sync::Arc;

use scraper::{ElementRef, Selector};

use crate::fetch::FetchConfig;
use crate::images::ImageRegistry;
use crate::page::Element;
use crate::selector::translate;
use crate::xhtml::{Rewrite, to_xhtml};

/// Buttons, permalinks, scores and other page furniture.
pub const CHROME_SELECTOR: &str = ".actions, a.close, a.anchor, a.parent, .datePourCss, figure.score, meta";

/// Microdata attributes removed from every element.
pub const STRUCTURED_DATA_ATTRIBUTES: [&str; 3] = ["itemprop", "itemscope", "itemtype"];

struct Sanitizer<'a> {
    scheme: &'a str,
    origin: String,
    chrome: Arc<Selector>,
    images: &'a mut ImageRegistry,
}

impl Sanitizer<'_> {
    fn absolute_link<'v>(&self, href: &'v str) -> Cow<'v, str> {
        if href.starts_with("//") {
            Cow::Owned(format!("{}:{}", self.scheme, href))
        } else if href.starts_with('/') {
            Cow::Owned(format!("{}{}", self.origin, href))
        } else {
            Cow::Borrowed(href)
        }
    }

    fn local_image<'v>(&mut self, src: &'v str) -> Cow<'v, str> {
        let trimmed = src.trim();
        if trimmed.is_empty() || trimmed.get(..5).is_some_and(|scheme| scheme.eq_ignore_ascii_case("data:")) {
            return Cow::Borrowed(src);
        }
        match self.images.register(trimmed) {
            Some(filename) => Cow::Owned(filename),
            None => Cow::Borrowed(src),
        }
    }
}

impl Rewrite for Sanitizer<'_> {
    fn keep(&mut self, element: ElementRef<'_>) -> bool {
        !self.chrome.matches(&element)
    }

    fn attribute<'v>(&mut self, element: ElementRef<'_>, name: &str, value: &'v str) -> Option<Cow<'v, str>> {
        if STRUCTURED_DATA_ATTRIBUTES.contains(&name) {
            return None;
        }
        let rewritten = match (element.value().name(), name) {
            ("a", "href") => self.absolute_link(value),
            ("img", "src") => self.local_image(value),
            _ => Cow::Borrowed(value),
        };
        Some(rewritten)
    }
}

/// Serializes a cleaned copy of `node`.
///
/// Images found along the way are registered on `images`. Returns an empty
/// string if the subtree cannot be serialized.
pub fn sanitize(node: Element<'_>, config: &FetchConfig, images: &mut ImageRegistry) -> String {
    let mut sanitizer = Sanitizer {
        scheme: &config.scheme,
        origin: config.origin(),
        chrome: translate(CHROME_SELECTOR),
        images,
    };

    match to_xhtml(node.element_ref(), &mut sanitizer) {
        Ok(markup) => markup,
        Err(e) => {
            tracing::warn!(error = %e, tag = %node.tag_name(), "failed to serialize subtree");
            String::new()
        }
    }
}
