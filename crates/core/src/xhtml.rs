//! XHTML serialization of parsed HTML subtrees.
//!
//! The output is readable both as HTML and as XML: every non-void element
//! gets an explicit close tag, void elements are self-closed, text and
//! attribute values are escaped and text is otherwise written verbatim.
//! A [`Rewrite`] hook lets callers drop subtrees and rewrite attributes
//! while the tree is written, leaving the parsed page untouched.

use std::borrow::Cow;
use std::fmt::{self, Write};

use quick_xml::escape::{escape, partial_escape};
use scraper::{ElementRef, Node};

pub const XHTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source", "track", "wbr",
];

/// Hooks applied while a subtree is serialized.
pub trait Rewrite {
    /// Whether `element` and its subtree are written. Never asked for the root.
    fn keep(&mut self, _element: ElementRef<'_>) -> bool {
        true
    }

    /// The value written for an attribute, or `None` to drop it.
    fn attribute<'v>(&mut self, _element: ElementRef<'_>, _name: &str, value: &'v str) -> Option<Cow<'v, str>> {
        Some(Cow::Borrowed(value))
    }
}

/// Writes the tree as parsed.
pub struct Verbatim;

impl Rewrite for Verbatim {}

/// Serializes `root` and its subtree.
pub fn to_xhtml<R: Rewrite + ?Sized>(root: ElementRef<'_>, rewrite: &mut R) -> Result<String, fmt::Error> {
    let mut out = String::new();
    write_element(&mut out, root, XHTML_NAMESPACE, rewrite)?;
    Ok(out)
}

fn write_element<W: Write, R: Rewrite + ?Sized>(
    out: &mut W, element: ElementRef<'_>, parent_ns: &str, rewrite: &mut R,
) -> fmt::Result {
    let value = element.value();
    let name = value.name();
    let ns: &str = &value.name.ns;

    write!(out, "<{}", name)?;
    if ns != parent_ns && !ns.is_empty() {
        write!(out, r#" xmlns="{}""#, escape(ns))?;
    }
    for (attr, attr_value) in value.attrs() {
        if !is_xml_name(attr) {
            continue;
        }
        if let Some(rewritten) = rewrite.attribute(element, attr, attr_value) {
            write!(out, r#" {}="{}""#, attr, escape(&xml_chars(&rewritten)))?;
        }
    }

    if ns == XHTML_NAMESPACE && VOID_ELEMENTS.contains(&name) {
        return out.write_str(" />");
    }
    out.write_char('>')?;

    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.write_str(&partial_escape(&xml_chars(text)))?,
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child)
                    && rewrite.keep(child)
                {
                    write_element(out, child, ns, rewrite)?;
                }
            }
            _ => {}
        }
    }

    write!(out, "</{}>", name)
}

/// Whether `name` can be written as an attribute name in XML.
///
/// Namespace declarations are excluded; the writer emits its own.
fn is_xml_name(name: &str) -> bool {
    if name == "xmlns" || name.starts_with("xmlns:") {
        return false;
    }
    let local = name.strip_prefix("xml:").unwrap_or(name);
    let mut chars = local.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Drops characters XML 1.0 does not allow.
fn xml_chars(text: &str) -> Cow<'_, str> {
    let allowed = |c: char| matches!(c, '\t' | '\n' | '\r') || (c >= ' ' && c != '\u{FFFE}' && c != '\u{FFFF}');
    if text.chars().all(allowed) {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(text.chars().filter(|&c| allowed(c)).collect())
    }
}
