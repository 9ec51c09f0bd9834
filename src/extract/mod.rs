pub mod listings;
pub mod locate;
pub mod normalize;
pub mod pagination;
pub mod property;

use crate::config::SiteConfig;
use crate::models::Property;
use scraper::Html;
use tracing::{info, warn};

pub use listings::{find_container, find_listings};
pub use locate::{locate, locate_attribute, locate_candidates};
pub use normalize::{normalize_floor, normalize_integer};
pub use pagination::resolve_page_count;
pub use property::PropertyExtractor;

/// Extraction engine bound to one site configuration. Performs no I/O;
/// a field that cannot be found takes its default instead of failing.
pub struct Extractor<'c> {
    config: &'c SiteConfig,
    properties: PropertyExtractor<'c>,
}

impl<'c> Extractor<'c> {
    pub fn new(config: &'c SiteConfig) -> Self {
        Self {
            config,
            properties: PropertyExtractor::new(config),
        }
    }

    pub fn config(&self) -> &SiteConfig {
        self.config
    }

    /// Records of every listing on the page, in document order.
    pub fn extract_page(&self, html: &str, city: &str) -> Vec<Property> {
        let document = Html::parse_document(html);
        self.extract_document(&document, city)
    }

    pub fn extract_document(&self, document: &Html, city: &str) -> Vec<Property> {
        let selectors = &self.config.selectors;

        let Some(container) = find_container(document, selectors) else {
            warn!("No listings container found for {}", self.config.site_name);
            return Vec::new();
        };

        let listings = find_listings(container, &selectors.listing_item);
        let properties: Vec<Property> = listings
            .iter()
            .filter_map(|listing| self.properties.extract(*listing, city))
            .collect();

        info!(
            "Extracted {} of {} listings for {}",
            properties.len(),
            listings.len(),
            self.config.site_name
        );
        properties
    }

    /// Total page count advertised by a first listing page.
    pub fn page_count(&self, html: &str) -> u32 {
        self.page_count_document(&Html::parse_document(html))
    }

    pub fn page_count_document(&self, document: &Html) -> u32 {
        match (&self.config.selectors.pagination, self.config.has_pagination) {
            (Some(spec), true) => resolve_page_count(document, spec, self.config.default_pages),
            _ => self.config.default_pages,
        }
    }
}
