//! Image registration and archive-safe naming.
//!
//! Every image referenced by a document goes through an [`ImageRegistry`].
//! The registry resolves the reference, deduplicates it by URL path and
//! assigns the filename the image will have inside the archive. Fetching is
//! left to the harvester, which picks up the pending registrations.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use percent_encoding::percent_decode_str;
use sha2::{Digest, Sha224};
use url::Url;

/// Longest filename kept as-is; longer names are replaced by a digest.
pub const MAX_FILENAME_LEN: usize = 64;

/// An image waiting to be fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingImage {
    pub url: Url,
    pub filename: String,
}

/// Per-document registry of referenced images.
#[derive(Debug)]
pub struct ImageRegistry {
    base: Url,
    filenames: HashMap<String, String>,
    taken: HashSet<String>,
    pending: Vec<PendingImage>,
}

impl ImageRegistry {
    /// Creates a registry resolving relative references against `base`.
    pub fn new(base: Url) -> Self {
        Self { base, filenames: HashMap::new(), taken: HashSet::new(), pending: Vec::new() }
    }

    /// Registers an image reference and returns its local filename.
    ///
    /// A path seen before gets the filename assigned the first time and is
    /// not queued again. A new path whose natural filename is already used
    /// by another path is named after its digest instead. Returns `None` for
    /// references that cannot be resolved.
    pub fn register(&mut self, src: &str) -> Option<String> {
        let url = match self.base.join(src) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!(src, error = %e, "ignoring unresolvable image reference");
                return None;
            }
        };

        if let Some(filename) = self.filenames.get(url.path()) {
            return Some(filename.clone());
        }

        let mut filename = image_filename(&url);
        if self.taken.contains(&filename) {
            let renamed = digest_filename(&url);
            tracing::warn!(%url, %filename, %renamed, "image filename already used by another path");
            filename = renamed;
        }

        self.taken.insert(filename.clone());
        self.filenames.insert(url.path().to_string(), filename.clone());
        self.pending.push(PendingImage { url, filename: filename.clone() });
        Some(filename)
    }

    /// Number of distinct image paths registered so far.
    ///
    /// This is also the number of completion signals the packager drains.
    pub fn len(&self) -> usize {
        self.filenames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filenames.is_empty()
    }

    /// Takes the registrations not yet handed to the harvester.
    pub fn take_pending(&mut self) -> Vec<PendingImage> {
        std::mem::take(&mut self.pending)
    }
}

/// Derives the archive filename of an image from its resolved URL.
///
/// The decoded path with its separators removed is used when it is at most
/// [`MAX_FILENAME_LEN`] characters long. Otherwise the name is the
/// hex-encoded SHA-224 of the URL followed by the original extension.
///
/// # Example
///
/// ```rust
/// use folio_core::images::image_filename;
/// use url::Url;
///
/// let url = Url::parse("https://linuxfr.org/images/logo.png").unwrap();
/// assert_eq!(image_filename(&url), "imageslogo.png");
/// ```
pub fn image_filename(url: &Url) -> String {
    let path = percent_decode_str(url.path()).decode_utf8_lossy();
    let filename: String = path.chars().filter(|&c| c != '/').collect();
    if filename.chars().count() <= MAX_FILENAME_LEN {
        return filename;
    }

    digest_filename(url)
}

/// Hex-encoded SHA-224 of `url` followed by the extension of its last segment.
fn digest_filename(url: &Url) -> String {
    let digest = hex::encode(Sha224::digest(url.as_str().as_bytes()));
    let path = percent_decode_str(url.path()).decode_utf8_lossy();
    let last_segment = path.rsplit('/').next().unwrap_or_default();
    match Path::new(last_segment).extension().and_then(|ext| ext.to_str()) {
        Some(ext) => format!("{}.{}", digest, ext),
        None => digest,
    }
}
