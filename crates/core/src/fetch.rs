//! Upstream article fetching.
//!
//! This module maps request paths to upstream article URLs, retrieves the
//! page over HTTP and locates the article container in it.

use std::time::Duration;

use reqwest::Client;
use url::Url;

use crate::page::{Element, Page};
use crate::{FolioError, Result};

/// Suffix identifying content endpoints.
pub const EPUB_SUFFIX: &str = ".epub";

/// Selector of the node holding the article.
pub const ARTICLE_SELECTOR: &str = "#contents article";

/// Selector of comment threads, relative to the nodes following the article.
pub const THREADS_SELECTOR: &str = ".threads > li";

/// Where and how upstream pages are fetched.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Host of the source site, optionally with a port.
    pub host: String,
    /// Scheme used for the source site and rewritten links.
    pub scheme: String,
    /// Request timeout in seconds.
    pub timeout: u64,
    /// Custom User-Agent string.
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            host: "linuxfr.org".to_string(),
            scheme: "https".to_string(),
            timeout: 30,
            user_agent: format!("folio/{} (+https://linuxfr.org/)", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl FetchConfig {
    /// `scheme://host`, without trailing slash.
    pub fn origin(&self) -> String {
        format!("{}://{}", self.scheme, self.host)
    }

    /// Base URL relative references are resolved against.
    pub fn base_url(&self) -> Result<Url> {
        let origin = format!("{}/", self.origin());
        Url::parse(&origin).map_err(|e| FolioError::InvalidUrl(format!("{}: {}", origin, e)))
    }
}

/// Builds the HTTP client shared by the fetcher and the harvester.
pub fn build_client(config: &FetchConfig) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(config.timeout))
        .user_agent(config.user_agent.clone())
        .build()
        .map_err(FolioError::HttpError)
}

/// Maps a content request path to the upstream article URL.
///
/// Returns `None` when the path does not end with [`EPUB_SUFFIX`]. Polls
/// are fetched with their results shown.
///
/// # Example
///
/// ```rust
/// use folio_core::{FetchConfig, upstream_url};
///
/// let config = FetchConfig::default();
/// assert_eq!(
///     upstream_url("/news/sortie-de-linux.epub", &config).as_deref(),
///     Some("https://linuxfr.org/news/sortie-de-linux")
/// );
/// assert_eq!(upstream_url("/news/sortie-de-linux", &config), None);
/// ```
pub fn upstream_url(path: &str, config: &FetchConfig) -> Option<String> {
    let stem = path.strip_suffix(EPUB_SUFFIX)?;
    let mut url = format!("{}{}", config.origin(), stem);
    if path.starts_with("/sondages") {
        url.push_str("?results=1");
    }
    Some(url)
}

/// A fetched upstream page together with its article node.
pub struct Article {
    page: Page,
    url: String,
}

impl Article {
    /// Wraps a parsed page, failing if it has no article container.
    pub fn from_page(page: Page, url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        if page.select_first(ARTICLE_SELECTOR).is_none() {
            return Err(FolioError::ArticleNotFound(url));
        }
        Ok(Self { page, url })
    }

    /// Parses `html` and locates its article.
    pub fn parse(html: &str, url: impl Into<String>) -> Result<Self> {
        Self::from_page(Page::parse(html), url)
    }

    /// The whole page the article was found in.
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// The URL the page was fetched from.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The first node matching [`ARTICLE_SELECTOR`].
    pub fn node(&self) -> Element<'_> {
        // Presence is checked on construction.
        self.page.select_first(ARTICLE_SELECTOR).unwrap_or_else(|| self.page.root())
    }

    /// Comment threads listed after the article, in document order.
    pub fn comment_threads(&self) -> Vec<Element<'_>> {
        self.node()
            .following_siblings()
            .flat_map(|sibling| sibling.select(THREADS_SELECTOR))
            .collect()
    }
}

/// Fetches `url` and locates the article in it.
///
/// # Errors
///
/// Transport failures, timeouts and non-success statuses are returned as
/// [`FolioError::HttpError`], [`FolioError::Timeout`] and
/// [`FolioError::Status`]; a page without an article container yields
/// [`FolioError::ArticleNotFound`].
pub async fn fetch_article(client: &Client, url: &str, config: &FetchConfig) -> Result<Article> {
    let parsed_url = Url::parse(url).map_err(|e| FolioError::InvalidUrl(format!("{}: {}", url, e)))?;
    tracing::info!(%url, "fetching article");

    let response = client
        .get(parsed_url)
        .header(
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        )
        .header("Accept-Language", "fr-FR,fr;q=0.9")
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                FolioError::Timeout { timeout: config.timeout }
            } else {
                FolioError::HttpError(e)
            }
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(FolioError::Status { url: url.to_string(), status: status.as_u16() });
    }

    let body = response.text().await?;
    Article::parse(&body, url)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
            <div id="contents">
                <article class="news"><header><h1>Titre</h1></header></article>
                <section id="comments">
                    <ul class="threads">
                        <li id="comment-1">un<ul class="replies"><li id="reply">r</li></ul></li>
                        <li id="comment-2">deux</li>
                    </ul>
                </section>
            </div>
        </body></html>
    "#;

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.timeout, 30);
        assert_eq!(config.origin(), "https://linuxfr.org");
        assert!(config.user_agent.contains("folio"));
    }

    #[test]
    fn test_upstream_url_polls_show_results() {
        let config = FetchConfig::default();
        assert_eq!(
            upstream_url("/sondages/editeur-prefere.epub", &config).as_deref(),
            Some("https://linuxfr.org/sondages/editeur-prefere?results=1")
        );
        assert_eq!(
            upstream_url("/users/toto/journaux/mon-journal.epub", &config).as_deref(),
            Some("https://linuxfr.org/users/toto/journaux/mon-journal")
        );
    }

    #[test]
    fn test_upstream_url_uses_configured_origin() {
        let config = FetchConfig { host: "127.0.0.1:8080".into(), scheme: "http".into(), ..Default::default() };
        assert_eq!(
            upstream_url("/wiki/accueil.epub", &config).as_deref(),
            Some("http://127.0.0.1:8080/wiki/accueil")
        );
    }

    #[test]
    fn test_article_located() {
        let article = Article::parse(PAGE, "https://linuxfr.org/news/x").unwrap();
        assert_eq!(article.node().attr("class"), Some("news"));
        assert_eq!(article.url(), "https://linuxfr.org/news/x");
    }

    #[test]
    fn test_missing_article_is_not_found() {
        let result = Article::parse("<html><body><p>Rien</p></body></html>", "https://linuxfr.org/x");
        assert!(matches!(result, Err(FolioError::ArticleNotFound(_))));
    }

    #[test]
    fn test_comment_threads_in_document_order() {
        let article = Article::parse(PAGE, "https://linuxfr.org/news/x").unwrap();
        let ids: Vec<_> = article.comment_threads().iter().map(|t| t.attr("id")).collect();
        assert_eq!(ids, vec![Some("comment-1"), Some("comment-2")]);
    }

    #[tokio::test]
    async fn test_fetch_article_invalid_url() {
        let config = FetchConfig::default();
        let client = build_client(&config).unwrap();
        let result = fetch_article(&client, "not-a-url", &config).await;

        assert!(matches!(result, Err(FolioError::InvalidUrl(_))));
    }
}
