//! Error types for Folio operations.
//!
//! This module defines the main error type [`FolioError`] which represents
//! the hard failures of a conversion: fetching the upstream page, locating
//! the article and driving the packager. Per-image problems are not errors;
//! the harvester logs them and carries on.
//!
//! # Example
//!
//! ```rust
//! use folio_core::{FolioError, Result};
//!
//! fn require_article(found: bool) -> Result<()> {
//!     if !found {
//!         return Err(FolioError::ArticleNotFound("https://linuxfr.org/news/x".into()));
//!     }
//!     Ok(())
//! }
//! ```

use thiserror::Error;

use crate::epub::Stage;

/// Main error type for conversion operations.
///
/// # Example
///
/// ```rust
/// use folio_core::FolioError;
///
/// let err = FolioError::Status { url: "https://linuxfr.org/news/x".into(), status: 404 };
/// assert!(err.is_not_found());
/// ```
#[derive(Error, Debug)]
pub enum FolioError {
    /// HTTP request errors from reqwest.
    ///
    /// Wraps DNS failures, refused connections and other transport problems.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Request timeout.
    #[error("Request timed out after {timeout} seconds")]
    Timeout { timeout: u64 },

    /// The upstream answered with a non-success status.
    #[error("Upstream {url} answered with status {status}")]
    Status { url: String, status: u16 },

    /// Invalid URL provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The page was fetched but has no article container.
    #[error("No article found in {0}")]
    ArticleNotFound(String),

    /// A packaging step was called out of order.
    #[error("Invalid packaging step: {from:?} -> {to:?}")]
    InvalidTransition { from: Stage, to: Stage },

    /// Archive writer errors.
    #[error("Archive error: {0}")]
    ZipError(#[from] zip::result::ZipError),

    /// Package document rendering errors.
    #[error("XML error: {0}")]
    XmlError(#[from] quick_xml::Error),

    /// Invalid UTF-8 in generated output.
    #[error("Invalid character encoding: {0}")]
    InvalidEncoding(#[from] std::string::FromUtf8Error),
}

impl FolioError {
    /// Whether the error should be reported to a client as "not found".
    ///
    /// Every failure to obtain the upstream article falls in this category:
    /// transport errors, timeouts, bad statuses and pages without an article.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            FolioError::HttpError(_)
                | FolioError::Timeout { .. }
                | FolioError::Status { .. }
                | FolioError::InvalidUrl(_)
                | FolioError::ArticleNotFound(_)
        )
    }
}

/// Result type alias for FolioError.
pub type Result<T> = std::result::Result<T, FolioError>;
