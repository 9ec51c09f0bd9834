use crate::models::Property;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Parameters of one site scrape
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeParams {
    /// City to search in, as typed by the user
    pub city: String,
    /// Upper bound on the number of pages visited
    pub max_pages: Option<u32>,
    /// Pause between consecutive page fetches
    pub page_delay: Duration,
}

impl ScrapeParams {
    pub fn new(city: &str) -> Self {
        Self {
            city: city.to_string(),
            ..Self::default()
        }
    }
}

impl Default for ScrapeParams {
    fn default() -> Self {
        Self {
            city: "katowice".to_string(),
            max_pages: None,
            page_delay: Duration::from_millis(500),
        }
    }
}

/// A fetched HTML page and the URL it was finally served from
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: String,
    pub html: String,
}

/// Result of a site scrape
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScrapeOutcome {
    pub properties: Vec<Property>,
    pub pages_scraped: u32,
}
