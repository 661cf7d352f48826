//! Library API integration tests
mod common;

use std::collections::HashSet;
use std::io::{Cursor, Read, Write};
use std::net::SocketAddr;

use common::{ARTICLE_PATH, STREAMED_CHUNKS, spawn_upstream};
use folio_core::harvest::harvest;
use folio_core::images::PendingImage;
use folio_core::*;
use quick_xml::Reader;
use quick_xml::events::Event;
use tokio_util::sync::CancellationToken;
use url::Url;
use zip::ZipArchive;

fn converter(addr: SocketAddr) -> Converter {
    Converter::builder().host(addr.to_string()).scheme("http").timeout(5).build().unwrap()
}

async fn convert_fixture(addr: SocketAddr) -> Vec<u8> {
    let converter = converter(addr);
    let identifier = format!("{}.epub", ARTICLE_PATH);
    let url = converter.upstream_url(&identifier).unwrap();
    converter.convert(&url, &identifier, CancellationToken::new()).await.unwrap()
}

fn entry_names(bytes: &[u8]) -> Vec<String> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    (0..archive.len()).map(|i| archive.by_index(i).unwrap().name().to_string()).collect()
}

fn read_entry(bytes: &[u8], name: &str) -> String {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut content = String::new();
    archive.by_name(name).unwrap().read_to_string(&mut content).unwrap();
    content
}

fn long_image_filename(addr: SocketAddr) -> String {
    let url = Url::parse(&format!("http://{}/img/{}.jpg", addr, "a".repeat(70))).unwrap();
    image_filename(&url)
}

#[derive(Debug, Default)]
struct Manifest {
    /// `(id, href, media-type, properties)` in declaration order.
    items: Vec<(String, String, String, Option<String>)>,
    spine: Vec<String>,
    cover_meta: bool,
}

fn attr(e: &quick_xml::events::BytesStart, name: &str) -> Option<String> {
    e.try_get_attribute(name).unwrap().map(|a| a.unescape_value().unwrap().into_owned())
}

/// The first opening tag named `name`.
fn first_start(xml: &str, name: &[u8]) -> quick_xml::events::BytesStart<'static> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event().unwrap() {
            Event::Start(e) if e.name().as_ref() == name => return e.into_owned(),
            Event::Eof => panic!("no <{}> element", String::from_utf8_lossy(name)),
            _ => {}
        }
    }
}

fn parse_manifest(opf: &str) -> Manifest {
    let mut reader = Reader::from_str(opf);
    let mut manifest = Manifest::default();
    loop {
        match reader.read_event().unwrap() {
            Event::Eof => break,
            Event::Empty(e) => match e.name().as_ref() {
                b"item" => manifest.items.push((
                    attr(&e, "id").unwrap(),
                    attr(&e, "href").unwrap(),
                    attr(&e, "media-type").unwrap(),
                    attr(&e, "properties"),
                )),
                b"itemref" => manifest.spine.push(attr(&e, "idref").unwrap()),
                b"meta" => manifest.cover_meta |= attr(&e, "name").as_deref() == Some("cover"),
                _ => {}
            },
            _ => {}
        }
    }
    manifest
}

#[tokio::test]
async fn test_archive_layout() {
    let addr = spawn_upstream().await;
    let bytes = convert_fixture(addr).await;
    let names = entry_names(&bytes);

    assert_eq!(
        names[..9],
        [
            "mimetype",
            "META-INF/",
            "META-INF/container.xml",
            "EPUB/",
            "EPUB/nav.xhtml",
            "EPUB/style.css",
            "EPUB/content.xhtml",
            "EPUB/comment-1.xhtml",
            "EPUB/comment-2.xhtml",
        ]
    );
    assert_eq!(names.last().map(String::as_str), Some("EPUB/package.opf"));

    let images: HashSet<_> = names[9..names.len() - 1].iter().cloned().collect();
    let expected: HashSet<_> = [
        "EPUB/imagessectionsnoyau.png".to_string(),
        "EPUB/imagesscreenshot.png".to_string(),
        "EPUB/imagesavatar.png".to_string(),
        format!("EPUB/{}", long_image_filename(addr)),
    ]
    .into_iter()
    .collect();
    assert_eq!(images, expected);
}

#[tokio::test]
async fn test_manifest_matches_archive() {
    let addr = spawn_upstream().await;
    let bytes = convert_fixture(addr).await;
    let manifest = parse_manifest(&read_entry(&bytes, "EPUB/package.opf"));

    let ids: Vec<_> = manifest.items.iter().map(|(id, ..)| id.as_str()).collect();
    let unique: HashSet<_> = ids.iter().collect();
    assert_eq!(unique.len(), ids.len(), "duplicate manifest ids: {:?}", ids);

    let declared: HashSet<_> = manifest.items.iter().map(|(_, href, ..)| format!("EPUB/{}", href)).collect();
    let archived: HashSet<_> = entry_names(&bytes)
        .into_iter()
        .filter(|name| name.starts_with("EPUB/") && !name.ends_with('/') && name != "EPUB/package.opf")
        .collect();
    assert_eq!(declared, archived);

    assert_eq!(manifest.spine, vec!["item-content", "comment-1", "comment-2"]);
    for (id, _, media_type, _) in &manifest.items {
        if media_type.starts_with("image/") {
            assert!(!manifest.spine.contains(id), "image {} in spine", id);
        }
    }
}

#[tokio::test]
async fn test_cover_and_image_mimetypes() {
    let addr = spawn_upstream().await;
    let bytes = convert_fixture(addr).await;
    let manifest = parse_manifest(&read_entry(&bytes, "EPUB/package.opf"));

    assert!(manifest.cover_meta);
    let cover = manifest.items.iter().find(|(id, ..)| id == "cover").unwrap();
    assert_eq!(cover.1, "imagessectionsnoyau.png");
    assert_eq!(cover.2, "image/png");
    assert_eq!(cover.3.as_deref(), Some("cover-image"));

    let long = long_image_filename(addr);
    let item = manifest.items.iter().find(|(_, href, ..)| *href == long).unwrap();
    assert!(item.0.starts_with("img-"));
    assert_eq!(item.2, "image/jpeg");

    let images = manifest.items.iter().filter(|(id, ..)| id.starts_with("img-")).count();
    assert_eq!(images, 3);
}

#[tokio::test]
async fn test_package_metadata() {
    let addr = spawn_upstream().await;
    let bytes = convert_fixture(addr).await;
    let opf = read_entry(&bytes, "EPUB/package.opf");

    assert!(opf.contains(r#"<dc:identifier id="pub-identifier">/news/sortie-de-linux.epub</dc:identifier>"#));
    assert!(opf.contains(r#"<dc:title id="pub-title">Sortie de Linux 6.8</dc:title>"#));
    assert!(opf.contains("<dc:subject>Noyau</dc:subject>"));
    assert!(opf.contains(r#"<dc:creator id="pub-creator">Alice</dc:creator>"#));
    assert!(opf.contains("<dc:contributor>Bob</dc:contributor>"));
    assert!(opf.contains("<dc:contributor>Carol</dc:contributor>"));
    assert!(opf.contains("<dc:date>2024-03-05T09:30:00Z</dc:date>"));
}

#[tokio::test]
async fn test_content_is_rewritten() {
    let addr = spawn_upstream().await;
    let bytes = convert_fixture(addr).await;
    let content = read_entry(&bytes, "EPUB/content.xhtml");

    assert!(content.contains(&format!(r#"href="http://{}/news/sortie-de-linux-6-7""#, addr)));
    assert!(content.contains(r#"href="http://lkml.org/lkml/2024/3/10/1""#));
    assert!(content.contains(r#"href="https://kernel.org/""#));
    assert_eq!(content.matches(r#"src="imagesscreenshot.png""#).count(), 2);
    assert!(content.contains(r#"src="data:image/gif;base64,R0lGODlhAQABAAAAACw=""#));
    assert!(content.contains(r#"src="imagesmissing.png""#));
    assert!(content.contains("make -j$(nproc) &amp;&amp; make modules_install"));

    assert!(!content.contains("itemprop"));
    assert!(!content.contains("Modifier"));
    assert!(!content.contains("datePourCss"));
    assert!(!content.contains(r#"class="anchor""#));
}

#[tokio::test]
async fn test_comment_threads_are_wrapped() {
    let addr = spawn_upstream().await;
    let bytes = convert_fixture(addr).await;
    let thread = read_entry(&bytes, "EPUB/comment-1.xhtml");

    assert!(thread.contains(r#"<ul class="threads"><li "#));
    let li = first_start(&thread, b"li");
    assert_eq!(attr(&li, "id").as_deref(), Some("comment-1"));
    assert_eq!(attr(&li, "class").as_deref(), Some("comment"));
    assert!(thread.contains("De rien."));
    assert!(thread.contains(r#"src="imagesavatar.png""#));
    assert!(!thread.contains("Répondre"));
    assert!(!thread.contains(r#"class="parent""#));
}

#[tokio::test]
async fn test_streamed_image_over_cap_is_dropped() {
    let addr = spawn_upstream().await;
    let image = PendingImage {
        url: Url::parse(&format!("http://{}/images/streamed.png", addr)).unwrap(),
        filename: "imagesstreamed.png".to_string(),
    };
    let client = reqwest::Client::new();

    let capped = harvest(&client, &HarvestConfig::default(), image.clone()).await;
    assert_eq!(capped, None);

    let roomy = HarvestConfig { max_size: 8 * 1024 * 1024, ..Default::default() };
    let delivered = harvest(&client, &roomy, image).await.unwrap();
    assert_eq!(delivered.content.len(), STREAMED_CHUNKS * 1024 * 1024);
    assert_eq!(delivered.mimetype, "image/png");
}

#[tokio::test]
async fn test_upstream_failures() {
    let addr = spawn_upstream().await;
    let converter = converter(addr);

    let url = format!("http://{}/news/absente", addr);
    let err = converter.convert(&url, "/news/absente.epub", CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, FolioError::Status { status: 404, .. }));
    assert!(err.is_not_found());

    let url = format!("http://{}/wiki/sans-article", addr);
    let err = converter.convert(&url, "/wiki/sans-article.epub", CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, FolioError::ArticleNotFound(_)));
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_cancelled_conversion_skips_images() {
    let addr = spawn_upstream().await;
    let converter = converter(addr);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let url = format!("http://{}{}", addr, ARTICLE_PATH);
    let bytes = converter.convert(&url, "/news/sortie-de-linux.epub", cancel).await.unwrap();
    let names = entry_names(&bytes);

    assert_eq!(names.last().map(String::as_str), Some("EPUB/package.opf"));
    assert!(!names.iter().any(|name| name.ends_with(".png") || name.ends_with(".jpg")));
    assert!(!read_entry(&bytes, "EPUB/package.opf").contains("cover-image"));
}

#[tokio::test]
async fn test_archive_written_to_file() {
    let addr = spawn_upstream().await;
    let bytes = convert_fixture(addr).await;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&bytes).unwrap();

    let archive = ZipArchive::new(file.reopen().unwrap()).unwrap();
    assert!(archive.file_names().any(|name| name == "EPUB/content.xhtml"));
}
