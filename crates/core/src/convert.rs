//! Article to EPUB conversion.
//!
//! [`Converter`] ties the pipeline together: fetch the article, then build
//! the document step by step and wait for its images.

use std::time::Duration;

use reqwest::Client;
use tokio_util::sync::CancellationToken;

use crate::Result;
use crate::epub::EpubDocument;
use crate::fetch::{Article, FetchConfig, build_client, fetch_article, upstream_url};
use crate::harvest::{HarvestConfig, Harvester};

/// Converts articles into EPUB archives.
///
/// Cloning is cheap; clones share the HTTP connection pool.
///
/// # Example
///
/// ```rust,no_run
/// use folio_core::Converter;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn run() -> folio_core::Result<()> {
/// let converter = Converter::builder().host("linuxfr.org").build()?;
/// let url = converter.upstream_url("/news/x.epub").unwrap();
/// let epub = converter.convert(&url, "/news/x.epub", CancellationToken::new()).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Converter {
    client: Client,
    fetch: FetchConfig,
    harvest: HarvestConfig,
}

impl Converter {
    /// Creates a converter with its own HTTP client.
    pub fn new(fetch: FetchConfig, harvest: HarvestConfig) -> Result<Self> {
        let client = build_client(&fetch)?;
        Ok(Self { client, fetch, harvest })
    }

    pub fn builder() -> ConverterBuilder {
        ConverterBuilder::new()
    }

    pub fn fetch_config(&self) -> &FetchConfig {
        &self.fetch
    }

    pub fn harvest_config(&self) -> &HarvestConfig {
        &self.harvest
    }

    /// Maps a content request path to the article it converts.
    pub fn upstream_url(&self, path: &str) -> Option<String> {
        upstream_url(path, &self.fetch)
    }

    /// Fetches the article at `url`.
    pub async fn fetch(&self, url: &str) -> Result<Article> {
        fetch_article(&self.client, url, &self.fetch).await
    }

    /// Fetches the article at `url` and packages it.
    ///
    /// `identifier` becomes the publication's unique identifier. Cancelling
    /// `cancel` stops the image fetches still in flight; the archive is then
    /// finished with the images already delivered.
    ///
    /// The parsed page is released before images are awaited, so the
    /// returned future can run on a multi-threaded runtime.
    ///
    /// # Errors
    ///
    /// Fails when the article cannot be fetched or has no article container.
    /// Image failures never fail the conversion.
    pub async fn convert(&self, url: &str, identifier: &str, cancel: CancellationToken) -> Result<Vec<u8>> {
        let doc = {
            let article = self.fetch(url).await?;
            self.prepare(&article, identifier, cancel)?
        };
        doc.finalize().await
    }

    /// Packages an already fetched article.
    ///
    /// The returned future borrows `article`, which is not `Send`; use
    /// [`Converter::prepare`] and finalize separately when the future has to
    /// move between threads.
    pub async fn package(&self, article: &Article, identifier: &str, cancel: CancellationToken) -> Result<Vec<u8>> {
        self.prepare(article, identifier, cancel)?.finalize().await
    }

    /// Runs every packaging step up to, but not including, finalization.
    ///
    /// Image fetches are already running when this returns.
    pub fn prepare(&self, article: &Article, identifier: &str, cancel: CancellationToken) -> Result<EpubDocument> {
        let harvester = Harvester::new(self.client.clone(), self.harvest.clone(), cancel);
        let mut doc = EpubDocument::new(identifier, self.fetch.clone(), harvester)?;
        doc.fill_metadata(article)?;
        doc.add_content(article)?;
        doc.add_comments(article)?;

        tracing::debug!(url = %article.url(), images = doc.image_count(), "waiting for images");
        Ok(doc)
    }
}

/// Builder for [`Converter`].
///
/// # Example
///
/// ```rust
/// use folio_core::Converter;
///
/// let converter = Converter::builder()
///     .host("127.0.0.1:8080")
///     .scheme("http")
///     .timeout(10)
///     .build()
///     .unwrap();
/// assert_eq!(converter.fetch_config().origin(), "http://127.0.0.1:8080");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConverterBuilder {
    fetch: FetchConfig,
    harvest: HarvestConfig,
}

impl ConverterBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the host of the source site.
    pub fn host(mut self, value: impl Into<String>) -> Self {
        self.fetch.host = value.into();
        self
    }

    /// Sets the scheme used to reach the source site.
    pub fn scheme(mut self, value: impl Into<String>) -> Self {
        self.fetch.scheme = value.into();
        self
    }

    /// Sets the article request timeout in seconds.
    pub fn timeout(mut self, value: u64) -> Self {
        self.fetch.timeout = value;
        self
    }

    /// Sets the User-Agent header.
    pub fn user_agent(mut self, value: impl Into<String>) -> Self {
        self.fetch.user_agent = value.into();
        self
    }

    /// Sets the largest image accepted, in bytes.
    pub fn max_image_size(mut self, value: u64) -> Self {
        self.harvest.max_size = value;
        self
    }

    /// Sets the ceiling for one image request.
    pub fn image_timeout(mut self, value: Duration) -> Self {
        self.harvest.request_timeout = value;
        self
    }

    /// Sets how long a fetched image waits to be packaged.
    pub fn delivery_window(mut self, value: Duration) -> Self {
        self.harvest.delivery_window = value;
        self
    }

    /// Builds the converter and its HTTP client.
    pub fn build(self) -> Result<Converter> {
        Converter::new(self.fetch, self.harvest)
    }
}
