//! EPUB assembly.
//!
//! An [`EpubDocument`] is built in a fixed sequence of steps, one per
//! [`Stage`]. Each step writes its archive entries immediately and hands the
//! images it discovered to the harvester; [`EpubDocument::finalize`] waits
//! for every image and writes the package document last.
//!
//! # Example
//!
//! ```rust,no_run
//! use folio_core::epub::EpubDocument;
//! use folio_core::harvest::{HarvestConfig, Harvester};
//! use folio_core::{FetchConfig, build_client, fetch_article};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> folio_core::Result<()> {
//! let config = FetchConfig::default();
//! let client = build_client(&config)?;
//! let article = fetch_article(&client, "https://linuxfr.org/news/x", &config).await?;
//!
//! let harvester = Harvester::new(client, HarvestConfig::default(), CancellationToken::new());
//! let mut doc = EpubDocument::new("/news/x.epub", config, harvester)?;
//! doc.fill_metadata(&article)?;
//! doc.add_content(&article)?;
//! doc.add_comments(&article)?;
//! let bytes = doc.finalize().await?;
//! # Ok(())
//! # }
//! ```

use std::collections::HashSet;
use std::io::{Cursor, Write};

use tokio::sync::mpsc::{self, Receiver, Sender};
use zip::result::ZipResult;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::fetch::{Article, FetchConfig};
use crate::harvest::{Harvest, Harvester};
use crate::images::ImageRegistry;
use crate::metadata::{Metadata, extract_metadata};
use crate::opf::{COVER_ID, ManifestItem, Package};
use crate::sanitize::sanitize;
use crate::templates::{
    CONTAINER, CONTENT_DIR, CONTENT_FILENAME, CONTENT_TYPE, NAV, NAV_FILENAME, PACKAGE_PATH, STYLESHEET,
    STYLESHEET_FILENAME, content_document, thread_document,
};
use crate::{FolioError, Result};

/// Capacity of the image completion queue.
const QUEUE_CAPACITY: usize = 16;

/// Manifest id of the content document.
pub const CONTENT_ID: &str = "item-content";

/// Ids the package document uses for its own items.
const RESERVED_IDS: [&str; 4] = ["nav", "css", COVER_ID, CONTENT_ID];

/// Build progress of a document. Steps only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Created,
    MetadataFilled,
    ContentAdded,
    CommentsAdded,
    Finalized,
}

impl Stage {
    /// The stage reachable from this one, if any.
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Created => Some(Stage::MetadataFilled),
            Stage::MetadataFilled => Some(Stage::ContentAdded),
            Stage::ContentAdded => Some(Stage::CommentsAdded),
            Stage::CommentsAdded => Some(Stage::Finalized),
            Stage::Finalized => None,
        }
    }
}

/// An EPUB archive under construction, owned by a single request.
pub struct EpubDocument {
    identifier: String,
    stage: Stage,
    config: FetchConfig,
    zip: ZipWriter<Cursor<Vec<u8>>>,
    metadata: Metadata,
    items: Vec<ManifestItem>,
    ids: HashSet<String>,
    images: ImageRegistry,
    harvester: Harvester,
    sender: Option<Sender<Harvest>>,
    receiver: Receiver<Harvest>,
}

impl EpubDocument {
    /// Starts a document and writes the fixed boilerplate entries.
    ///
    /// `identifier` becomes the publication's unique identifier; links and
    /// images are resolved against the origin in `config`.
    pub fn new(identifier: impl Into<String>, config: FetchConfig, harvester: Harvester) -> Result<Self> {
        let images = ImageRegistry::new(config.base_url()?);
        let (sender, receiver) = mpsc::channel(QUEUE_CAPACITY);

        let mut doc = Self {
            identifier: identifier.into(),
            stage: Stage::Created,
            config,
            zip: ZipWriter::new(Cursor::new(Vec::new())),
            metadata: Metadata::default(),
            items: Vec::new(),
            ids: RESERVED_IDS.iter().map(|id| id.to_string()).collect(),
            images,
            harvester,
            sender: Some(sender),
            receiver,
        };

        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        doc.write_entry_with("mimetype", CONTENT_TYPE.as_bytes(), stored);
        doc.add_directory("META-INF/");
        doc.write_entry("META-INF/container.xml", CONTAINER.as_bytes());
        doc.add_directory(&format!("{}/", CONTENT_DIR));
        doc.write_entry(&resource_path(NAV_FILENAME), NAV.as_bytes());
        doc.write_entry(&resource_path(STYLESHEET_FILENAME), STYLESHEET.as_bytes());

        Ok(doc)
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Manifest items registered so far, in registration order.
    pub fn items(&self) -> &[ManifestItem] {
        &self.items
    }

    /// Number of distinct images referenced so far.
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Extracts the article's metadata, including its cover image.
    pub fn fill_metadata(&mut self, article: &Article) -> Result<()> {
        self.advance(Stage::MetadataFilled)?;
        self.metadata = extract_metadata(article, &mut self.images);
        tracing::debug!(identifier = %self.identifier, title = %self.metadata.title, "metadata filled");
        self.dispatch_pending();
        Ok(())
    }

    /// Writes the article itself as the first document of the reading order.
    pub fn add_content(&mut self, article: &Article) -> Result<()> {
        self.advance(Stage::ContentAdded)?;
        let markup = sanitize(article.node(), &self.config, &mut self.images);
        if self.write_entry(&resource_path(CONTENT_FILENAME), content_document(&markup).as_bytes()) {
            self.items.push(ManifestItem::document(CONTENT_ID, CONTENT_FILENAME));
        }
        self.dispatch_pending();
        Ok(())
    }

    /// Writes one document per comment thread, in discovery order.
    ///
    /// Threads are named after their `id` attribute. Threads without a
    /// usable id are numbered; threads whose id is already taken are skipped.
    pub fn add_comments(&mut self, article: &Article) -> Result<()> {
        self.advance(Stage::CommentsAdded)?;

        for (n, thread) in article.comment_threads().into_iter().enumerate() {
            let id = thread
                .attr("id")
                .filter(|id| is_ncname(id))
                .map(str::to_string)
                .unwrap_or_else(|| format!("thread-{}", n));

            if id.starts_with("img-") || !self.ids.insert(id.clone()) {
                tracing::warn!(%id, identifier = %self.identifier, "skipping comment thread with duplicate id");
                continue;
            }

            let markup = sanitize(thread, &self.config, &mut self.images);
            let filename = format!("{}.xhtml", id);
            if self.write_entry(&resource_path(&filename), thread_document(&markup).as_bytes()) {
                self.items.push(ManifestItem::document(id, filename));
            }
        }

        tracing::debug!(identifier = %self.identifier, items = self.items.len(), "comments added");
        self.dispatch_pending();
        Ok(())
    }

    /// Waits for every referenced image, writes the package document and
    /// returns the finished archive.
    ///
    /// Exactly one completion signal is awaited per distinct image. Images
    /// that could not be fetched are left out of the archive.
    pub async fn finalize(mut self) -> Result<Vec<u8>> {
        self.advance(Stage::Finalized)?;
        self.sender.take();

        let expected = self.images.len();
        let mut cover = None;
        let mut delivered = 0;

        for index in 0..expected {
            let Some(harvest) = self.receiver.recv().await else {
                tracing::warn!(identifier = %self.identifier, received = index, expected, "image queue closed early");
                break;
            };
            let Some(image) = harvest else {
                continue;
            };

            if !self.write_entry(&resource_path(&image.filename), &image.content) {
                continue;
            }
            delivered += 1;

            if self.metadata.cover.as_deref() == Some(image.filename.as_str()) {
                cover = Some(ManifestItem::resource(COVER_ID, image.filename, image.mimetype));
            } else {
                self.items.push(ManifestItem::resource(format!("img-{}", index), image.filename, image.mimetype));
            }
        }

        let package = Package {
            identifier: &self.identifier,
            metadata: &self.metadata,
            cover: cover.as_ref(),
            items: &self.items,
        }
        .render()?;
        self.write_entry(PACKAGE_PATH, package.as_bytes());

        let archive = self.zip.finish()?.into_inner();
        tracing::info!(
            identifier = %self.identifier,
            images = delivered,
            expected,
            bytes = archive.len(),
            "archive finalized"
        );
        Ok(archive)
    }

    fn advance(&mut self, to: Stage) -> Result<()> {
        if self.stage.next() != Some(to) {
            return Err(FolioError::InvalidTransition { from: self.stage, to });
        }
        self.stage = to;
        Ok(())
    }

    fn dispatch_pending(&mut self) {
        let Some(sender) = &self.sender else {
            return;
        };
        for image in self.images.take_pending() {
            tracing::debug!(url = %image.url, filename = %image.filename, "dispatching image");
            self.harvester.dispatch(image, sender.clone());
        }
    }

    fn write_entry(&mut self, name: &str, content: &[u8]) -> bool {
        self.write_entry_with(name, content, SimpleFileOptions::default())
    }

    fn write_entry_with(&mut self, name: &str, content: &[u8], options: SimpleFileOptions) -> bool {
        match self.try_write(name, content, options) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(entry = name, error = %e, "failed to write archive entry");
                false
            }
        }
    }

    fn try_write(&mut self, name: &str, content: &[u8], options: SimpleFileOptions) -> ZipResult<()> {
        self.zip.start_file(name, options)?;
        self.zip.write_all(content)?;
        Ok(())
    }

    fn add_directory(&mut self, name: &str) {
        if let Err(e) = self.zip.add_directory(name, SimpleFileOptions::default()) {
            tracing::error!(entry = name, error = %e, "failed to write archive directory");
        }
    }
}

fn resource_path(filename: &str) -> String {
    format!("{}/{}", CONTENT_DIR, filename)
}

/// Whether `id` can be used both as a manifest id and as a filename.
fn is_ncname(id: &str) -> bool {
    let mut chars = id.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}
