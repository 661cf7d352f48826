pub mod convert;
pub mod epub;
pub mod error;
pub mod fetch;
pub mod harvest;
pub mod images;
pub mod metadata;
pub mod opf;
pub mod page;
pub mod sanitize;
pub mod selector;
pub mod templates;
pub mod xhtml;

pub use convert::{Converter, ConverterBuilder};
pub use epub::{EpubDocument, Stage};
pub use error::{FolioError, Result};
pub use fetch::{Article, FetchConfig, build_client, fetch_article, upstream_url};
pub use harvest::{HarvestConfig, HarvestedImage, Harvester};
pub use images::{ImageRegistry, image_filename};
pub use metadata::{Metadata, extract_metadata};
pub use opf::ManifestItem;
pub use page::{Element, Page};
pub use sanitize::sanitize;
pub use templates::CONTENT_TYPE;
