//! Package document rendering.
//!
//! The package document (`package.opf`) declares the publication metadata,
//! every resource bundled in the archive and the reading order.

use std::io::Cursor;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::Result;
use crate::metadata::Metadata;
use crate::templates::{CSS_MEDIA_TYPE, NAV_FILENAME, STYLESHEET_FILENAME, XHTML_MEDIA_TYPE};

const OPF_NAMESPACE: &str = "http://www.idpf.org/2007/opf";
const DC_NAMESPACE: &str = "http://purl.org/dc/elements/1.1/";
const LANGUAGE: &str = "fr";

/// Id of the cover item in the manifest.
pub const COVER_ID: &str = "cover";

/// A resource declared in the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestItem {
    pub id: String,
    /// Path relative to the package document.
    pub href: String,
    pub media_type: String,
    /// Whether the item is part of the reading order.
    pub spine: bool,
}

impl ManifestItem {
    /// A content document listed in the reading order.
    pub fn document(id: impl Into<String>, href: impl Into<String>) -> Self {
        Self { id: id.into(), href: href.into(), media_type: XHTML_MEDIA_TYPE.to_string(), spine: true }
    }

    /// A resource outside the reading order.
    pub fn resource(id: impl Into<String>, href: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self { id: id.into(), href: href.into(), media_type: media_type.into(), spine: false }
    }
}

/// Everything the package document is rendered from.
#[derive(Debug, Clone, Copy)]
pub struct Package<'a> {
    pub identifier: &'a str,
    pub metadata: &'a Metadata,
    /// The cover image, when it made it into the archive.
    pub cover: Option<&'a ManifestItem>,
    pub items: &'a [ManifestItem],
}

impl Package<'_> {
    /// Renders the package document, XML declaration included.
    pub fn render(&self) -> Result<String> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

        let mut package = BytesStart::new("package");
        package.push_attribute(("xmlns", OPF_NAMESPACE));
        package.push_attribute(("unique-identifier", "pub-identifier"));
        package.push_attribute(("xml:lang", LANGUAGE));
        package.push_attribute(("version", "3.0"));
        writer.write_event(Event::Start(package))?;

        self.write_metadata(&mut writer)?;
        self.write_manifest(&mut writer)?;
        self.write_spine(&mut writer)?;

        writer.write_event(Event::End(BytesEnd::new("package")))?;

        let result = writer.into_inner().into_inner();
        Ok(String::from_utf8(result)?)
    }

    fn write_metadata<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        let meta = self.metadata;
        let date = meta.formatted_date();

        let mut start = BytesStart::new("metadata");
        start.push_attribute(("xmlns:dc", DC_NAMESPACE));
        writer.write_event(Event::Start(start))?;

        write_text_element(writer, "dc:language", &[("id", "pub-language")], LANGUAGE)?;
        write_text_element(writer, "dc:identifier", &[("id", "pub-identifier")], self.identifier)?;
        write_text_element(writer, "dc:date", &[], &date)?;
        write_text_element(writer, "meta", &[("property", "dcterms:modified")], &date)?;

        if !meta.title.is_empty() {
            write_text_element(writer, "dc:title", &[("id", "pub-title")], &meta.title)?;
        }
        if !meta.subject.is_empty() {
            write_text_element(writer, "dc:subject", &[], &meta.subject)?;
        }
        if !meta.creator.is_empty() {
            write_text_element(writer, "dc:creator", &[("id", "pub-creator")], &meta.creator)?;
        }
        for contributor in &meta.contributors {
            write_text_element(writer, "dc:contributor", &[], contributor)?;
        }

        if self.cover.is_some() {
            let mut cover = BytesStart::new("meta");
            cover.push_attribute(("name", "cover"));
            cover.push_attribute(("content", COVER_ID));
            writer.write_event(Event::Empty(cover))?;
        }

        writer.write_event(Event::End(BytesEnd::new("metadata")))?;
        Ok(())
    }

    fn write_manifest<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        writer.write_event(Event::Start(BytesStart::new("manifest")))?;

        write_item(writer, "nav", NAV_FILENAME, XHTML_MEDIA_TYPE, Some("nav"))?;
        write_item(writer, "css", STYLESHEET_FILENAME, CSS_MEDIA_TYPE, None)?;
        if let Some(cover) = self.cover {
            write_item(writer, &cover.id, &cover.href, &cover.media_type, Some("cover-image"))?;
        }
        for item in self.items {
            write_item(writer, &item.id, &item.href, &item.media_type, None)?;
        }

        writer.write_event(Event::End(BytesEnd::new("manifest")))?;
        Ok(())
    }

    fn write_spine<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        writer.write_event(Event::Start(BytesStart::new("spine")))?;
        for item in self.items.iter().filter(|item| item.spine) {
            let mut itemref = BytesStart::new("itemref");
            itemref.push_attribute(("idref", item.id.as_str()));
            writer.write_event(Event::Empty(itemref))?;
        }
        writer.write_event(Event::End(BytesEnd::new("spine")))?;
        Ok(())
    }
}

fn write_text_element<W: std::io::Write>(
    writer: &mut Writer<W>, name: &str, attributes: &[(&str, &str)], value: &str,
) -> Result<()> {
    let mut start = BytesStart::new(name);
    for &attribute in attributes {
        start.push_attribute(attribute);
    }
    writer.write_event(Event::Start(start))?;
    writer.write_event(Event::Text(BytesText::new(value)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn write_item<W: std::io::Write>(
    writer: &mut Writer<W>, id: &str, href: &str, media_type: &str, properties: Option<&str>,
) -> Result<()> {
    let mut item = BytesStart::new("item");
    item.push_attribute(("id", id));
    item.push_attribute(("href", href));
    item.push_attribute(("media-type", media_type));
    if let Some(properties) = properties {
        item.push_attribute(("properties", properties));
    }
    writer.write_event(Event::Empty(item))?;
    Ok(())
}
