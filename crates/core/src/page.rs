//! HTML parsing and DOM navigation.
//!
//! This module provides the [`Page`] and [`Element`] types for parsing
//! upstream HTML and querying it with CSS selectors. Queries go through the
//! selector cache, so they never fail at runtime.
//!
//! # Example
//!
//! ```rust
//! use folio_core::page::Page;
//!
//! let html = r#"
//!     <html>
//!         <body>
//!             <header><h1><a class="topic">Noyau</a></h1></header>
//!         </body>
//!     </html>
//! "#;
//!
//! let page = Page::parse(html);
//! assert_eq!(page.first_text("header h1 a.topic"), Some("Noyau".to_string()));
//! ```

use scraper::{ElementRef, Html};

use crate::selector::translate;

/// A parsed HTML page.
///
/// # Example
///
/// ```rust
/// use folio_core::page::Page;
///
/// let page = Page::parse("<html><head><title>Test</title></head><body><p>Hello</p></body></html>");
/// assert_eq!(page.select("p").len(), 1);
/// ```
pub struct Page {
    html: Html,
}

impl Page {
    /// Parses a complete HTML document.
    ///
    /// Parsing is lenient: malformed markup yields a best-effort tree
    /// rather than an error.
    pub fn parse(html: &str) -> Self {
        Self { html: Html::parse_document(html) }
    }

    /// Gets the raw HTML representation.
    pub fn html(&self) -> &Html {
        &self.html
    }

    /// Gets the root `<html>` element.
    pub fn root(&self) -> Element<'_> {
        Element { element: self.html.root_element() }
    }

    /// Selects every element matching `selector`, in document order.
    pub fn select(&'_ self, selector: &str) -> Vec<Element<'_>> {
        let sel = translate(selector);
        self.html.select(&sel).map(|element| Element { element }).collect()
    }

    /// Returns the first element matching `selector`.
    pub fn select_first(&'_ self, selector: &str) -> Option<Element<'_>> {
        let sel = translate(selector);
        self.html.select(&sel).next().map(|element| Element { element })
    }

    /// Returns the trimmed text of the first element matching `selector`.
    pub fn first_text(&self, selector: &str) -> Option<String> {
        self.select_first(selector).map(|el| el.trimmed_text())
    }
}

/// A wrapper around scraper's ElementRef.
///
/// # Example
///
/// ```rust
/// use folio_core::page::Page;
///
/// let page = Page::parse(r#"<a href="/users/toto" rel="author">toto</a>"#);
/// let link = page.select_first("a").unwrap();
///
/// assert_eq!(link.text(), "toto");
/// assert_eq!(link.attr("rel"), Some("author"));
/// ```
#[derive(Clone, Copy, Debug)]
pub struct Element<'a> {
    element: ElementRef<'a>,
}

impl<'a> Element<'a> {
    pub(crate) fn element_ref(&self) -> ElementRef<'a> {
        self.element
    }

    /// Gets the text content of this element.
    ///
    /// Returns the concatenation of all text nodes within this element.
    pub fn text(&self) -> String {
        self.element.text().collect()
    }

    /// Gets the text content with surrounding whitespace removed.
    pub fn trimmed_text(&self) -> String {
        self.text().trim().to_string()
    }

    /// Gets the value of an attribute.
    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.element.value().attr(name)
    }

    /// Gets the lowercase tag name of this element.
    pub fn tag_name(&self) -> String {
        self.element.value().name().to_lowercase()
    }

    /// Selects descendant elements using a CSS selector.
    pub fn select(&self, selector: &str) -> Vec<Element<'a>> {
        let sel = translate(selector);
        self.element.select(&sel).map(|element| Element { element }).collect()
    }

    /// Returns the first descendant matching `selector`.
    pub fn select_first(&self, selector: &str) -> Option<Element<'a>> {
        let sel = translate(selector);
        self.element.select(&sel).next().map(|element| Element { element })
    }

    /// Returns the trimmed text of the first descendant matching `selector`.
    pub fn first_text(&self, selector: &str) -> Option<String> {
        self.select_first(selector).map(|el| el.trimmed_text())
    }

    /// Returns the trimmed text of every descendant matching `selector`.
    pub fn all_texts(&self, selector: &str) -> Vec<String> {
        self.select(selector).iter().map(Element::trimmed_text).collect()
    }

    /// Iterates over the element siblings that follow this one.
    ///
    /// Text and comment nodes between elements are skipped.
    pub fn following_siblings(&self) -> impl Iterator<Item = Element<'a>> + use<'a> {
        self.element
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .map(|element| Element { element })
    }
}
