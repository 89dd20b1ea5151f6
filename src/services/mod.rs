//! Service layer: the source adapter capability and its implementations.
//!
//! - `SourceAdapter`: what the harvest loop needs from a blog source
//! - `SelectorAdapter`: adapter driven by CSS selectors from the configuration

mod dates;
mod posts;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Meta, Record};

pub use dates::parse_published_at;
pub use posts::SelectorAdapter;

/// A blog source as seen by the harvest loop.
///
/// Implementations fetch and extract; they never touch storage.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Stable identifier, used as the storage file stem
    fn source_name(&self) -> &str;

    /// Human-readable blog name
    fn display_name(&self) -> &str;

    fn home_page(&self) -> &str;

    /// Listing pages to scan, in scan order.
    fn page_urls(&self) -> Vec<String>;

    /// Candidate post links on one listing page, in page order.
    async fn links_from_page(&self, page_url: &str) -> Result<Vec<String>>;

    /// Fetch one post and extract a fully populated record.
    async fn fetch_record(&self, link: &str) -> Result<Record>;

    /// Meta document describing this source.
    fn meta(&self) -> Meta {
        Meta {
            source: self.source_name().to_string(),
            home_page: self.home_page().to_string(),
            name: self.display_name().to_string(),
        }
    }
}
