//! Publication metadata taken from the article header.
//!
//! Header fields are read by selector and the update date is interpreted in
//! Paris time. The cover image comes from the page's inline styles.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Europe::Paris;
use regex::Regex;

use crate::fetch::Article;
use crate::images::ImageRegistry;

pub const TITLE_SELECTOR: &str = "header h1 a:last-child";
pub const SUBJECT_SELECTOR: &str = "header h1 a.topic";
pub const UPDATED_SELECTOR: &str = "header time.updated";
pub const CREATOR_SELECTOR: &str = r#"header .meta a[rel="author"]"#;
pub const CONTRIBUTORS_SELECTOR: &str = "header .meta .edited_by a";

/// Layout of the "updated" timestamp, e.g. `le 05/03/24 à 10:30`.
const UPDATED_FORMAT: &str = "le %d/%m/%y à %H:%M";

/// Layout of dates in the package document.
pub const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

static COVER_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"url\(\s*['"]?([^'")]+?)['"]?\s*\)"#).expect("COVER_URL is a valid static regex"));

/// Metadata of one article.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub title: String,
    pub subject: String,
    pub creator: String,
    pub contributors: Vec<String>,
    pub date: DateTime<Utc>,
    /// Archive filename of the cover image, if the page has one.
    pub cover: Option<String>,
}

impl Metadata {
    /// The publication date as written in the package document.
    pub fn formatted_date(&self) -> String {
        self.date.format(DATE_FORMAT).to_string()
    }
}

/// Extracts the metadata of `article`.
///
/// Missing nodes yield empty strings, never errors. The cover image, when
/// the page declares one, is registered on `images`.
pub fn extract_metadata(article: &Article, images: &mut ImageRegistry) -> Metadata {
    let node = article.node();
    let updated = node.first_text(UPDATED_SELECTOR).unwrap_or_default();

    Metadata {
        title: node.first_text(TITLE_SELECTOR).unwrap_or_default(),
        subject: node.first_text(SUBJECT_SELECTOR).unwrap_or_default(),
        creator: node.first_text(CREATOR_SELECTOR).unwrap_or_default(),
        contributors: node.all_texts(CONTRIBUTORS_SELECTOR),
        date: parse_updated(&updated, Utc::now()),
        cover: find_cover(article).and_then(|path| images.register(&path)),
    }
}

/// Parses an "updated" timestamp given in Paris local time.
///
/// Falls back to `now` when the text does not follow the expected layout or
/// names a local time skipped by a daylight saving change.
///
/// # Example
///
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use folio_core::metadata::parse_updated;
///
/// let now = Utc::now();
/// let date = parse_updated("le 05/03/24 à 10:30", now);
/// assert_eq!(date, Utc.with_ymd_and_hms(2024, 3, 5, 9, 30, 0).unwrap());
/// assert_eq!(parse_updated("not a date", now), now);
/// ```
pub fn parse_updated(text: &str, now: DateTime<Utc>) -> DateTime<Utc> {
    let naive = match NaiveDateTime::parse_from_str(text.trim(), UPDATED_FORMAT) {
        Ok(naive) => naive,
        Err(e) => {
            tracing::debug!(text, error = %e, "unparsable update date, using now");
            return now;
        }
    };

    match Paris.from_local_datetime(&naive).earliest() {
        Some(local) => local.with_timezone(&Utc),
        None => {
            tracing::debug!(text, "update date does not exist in Paris time, using now");
            now
        }
    }
}

/// Finds the cover image path declared in the page's inline styles.
pub fn find_cover(article: &Article) -> Option<String> {
    article.page().select("style").iter().find_map(|style| {
        let css = style.text();
        COVER_URL
            .captures(&css)
            .and_then(|caps| caps.get(1))
            .map(|path| path.as_str().trim().to_string())
            .filter(|path| !path.is_empty())
    })
}
