//! Concurrent image fetching.
//!
//! The [`Harvester`] spawns one task per registered image. Each task sends
//! exactly one message on the document's completion queue: the image, or
//! `None` when it could not be fetched. Fetch problems never fail the
//! conversion; they are logged and the image is left out of the archive.

use std::time::Duration;

use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use thiserror::Error;
use tokio::sync::mpsc::Sender;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::images::PendingImage;

/// Largest image accepted, in bytes.
pub const MAX_IMAGE_SIZE: u64 = 5 * 1024 * 1024;

/// Limits applied to each image fetch.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    /// Maximum image size in bytes, declared or actual.
    pub max_size: u64,
    /// Overall ceiling for one image request.
    pub request_timeout: Duration,
    /// How long a finished task waits for the packager to accept its result.
    pub delivery_window: Duration,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            max_size: MAX_IMAGE_SIZE,
            request_timeout: Duration::from_secs(30),
            delivery_window: Duration::from_secs(30),
        }
    }
}

/// An image fetched for a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestedImage {
    pub filename: String,
    pub mimetype: String,
    pub content: Vec<u8>,
}

/// Completion signal sent by every harvest task.
pub type Harvest = Option<HarvestedImage>;

/// Spawns image fetches for one document.
#[derive(Debug, Clone)]
pub struct Harvester {
    client: Client,
    config: HarvestConfig,
    cancel: CancellationToken,
}

impl Harvester {
    pub fn new(client: Client, config: HarvestConfig, cancel: CancellationToken) -> Self {
        Self { client, config, cancel }
    }

    /// Starts a detached task fetching `image` and reporting on `queue`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn dispatch(&self, image: PendingImage, queue: Sender<Harvest>) {
        let client = self.client.clone();
        let config = self.config.clone();
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            let filename = image.filename.clone();
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!(%filename, "image harvest cancelled");
                    return;
                }
                result = harvest(&client, &config, image) => result,
            };

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!(%filename, "image delivery cancelled");
                }
                sent = tokio::time::timeout(config.delivery_window, queue.send(result)) => match sent {
                    Ok(Ok(())) => {}
                    Ok(Err(_)) => tracing::debug!(%filename, "image queue closed before delivery"),
                    Err(_) => tracing::warn!(%filename, "timed out delivering image"),
                },
            }
        });
    }
}

/// Fetches one image, returning `None` on any soft failure.
pub async fn harvest(client: &Client, config: &HarvestConfig, image: PendingImage) -> Harvest {
    let PendingImage { url, filename } = image;

    match fetch_image(client, config, &url).await {
        Ok((mimetype, content)) => {
            tracing::debug!(%url, %filename, bytes = content.len(), "harvested image");
            let mimetype = mimetype.unwrap_or_else(|| guess_mimetype(&filename));
            Some(HarvestedImage { filename, mimetype, content })
        }
        Err(reason) => {
            tracing::warn!(%url, %filename, %reason, "skipping image");
            None
        }
    }
}

/// Why an image was left out.
#[derive(Debug, Error)]
enum SkipReason {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("status {0}")]
    Status(u16),
    #[error("declared size {declared} exceeds {max} bytes")]
    Declared { declared: u64, max: u64 },
    #[error("body exceeds {max} bytes")]
    Body { max: u64 },
}

async fn fetch_image(
    client: &Client, config: &HarvestConfig, url: &Url,
) -> std::result::Result<(Option<String>, Vec<u8>), SkipReason> {
    let mut response = client.get(url.clone()).timeout(config.request_timeout).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(SkipReason::Status(status.as_u16()));
    }

    if let Some(declared) = response.content_length()
        && declared > config.max_size
    {
        return Err(SkipReason::Declared { declared, max: config.max_size });
    }

    let mimetype = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.split(';').next().unwrap_or(value).trim().to_string())
        .filter(|value| !value.is_empty());

    let mut content = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        if (content.len() + chunk.len()) as u64 > config.max_size {
            return Err(SkipReason::Body { max: config.max_size });
        }
        content.extend_from_slice(&chunk);
    }

    Ok((mimetype, content))
}

fn guess_mimetype(filename: &str) -> String {
    mime_guess::from_path(filename).first_or_octet_stream().essence_str().to_string()
}
