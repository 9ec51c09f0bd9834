use crate::scrapers::types::FetchedPage;
use anyhow::Result;
use async_trait::async_trait;

/// Supplies raw listing pages to the extraction engine.
/// Implementations decide how a page is obtained (HTTP, browser, saved files).
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch the page at `url`
    async fn fetch(&self, url: &str) -> Result<FetchedPage>;

    /// Get the name of the page source
    fn source_name(&self) -> &'static str;
}
