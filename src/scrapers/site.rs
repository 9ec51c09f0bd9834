use crate::config::{city_slug, LocationMap, LocationSource, SiteConfig};
use crate::extract::Extractor;
use crate::jobs::JobHandle;
use crate::models::Property;
use crate::scrapers::traits::PageSource;
use crate::scrapers::types::{ScrapeOutcome, ScrapeParams};
use anyhow::Result;
use tracing::{info, warn};

/// Non-paginated sites stop after this many empty pages in a row.
const MAX_EMPTY_PAGES: u32 = 2;

/// Drives a whole-site scrape: page URLs, page count, stopping rules and
/// job progress. Every page is handed to the extraction engine.
pub struct SiteScraper<S: PageSource> {
    source: S,
    config: SiteConfig,
    locations: Option<LocationMap>,
}

async fn report(job: Option<&JobHandle>, message: &str) {
    if let Some(job) = job {
        job.status(message).await;
    }
}

/// Whether a request for `page` was redirected back to the first page.
fn redirected_to_first_page(final_url: &str, page: u32) -> bool {
    !final_url.contains(&format!("page={}", page))
        && (final_url.contains("page=1") || !final_url.contains("page="))
}

impl<S: PageSource> SiteScraper<S> {
    pub fn new(source: S, config: SiteConfig) -> Self {
        Self {
            source,
            config,
            locations: None,
        }
    }

    /// Use an already loaded city mapping instead of the configured CSV file
    pub fn with_locations(mut self, locations: LocationMap) -> Self {
        self.locations = Some(locations);
        self
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// URL path segment for `city`, `None` when a CSV mapping has no entry.
    pub fn city_path(&self, city: &str) -> Option<String> {
        let file = match &self.config.location {
            LocationSource::Slug => return Some(city_slug(city)),
            LocationSource::CsvMapping { file } => file,
        };

        let loaded;
        let map = match &self.locations {
            Some(map) => map,
            None => match LocationMap::from_csv(file) {
                Ok(map) => {
                    loaded = map;
                    &loaded
                }
                Err(e) => {
                    warn!("{:#}", e);
                    return None;
                }
            },
        };

        let path = map.lookup(city).map(str::to_string);
        if path.is_none() {
            warn!("City '{}' not found in location mapping", city);
        }
        path
    }

    /// Scrape every listing page of the site for `params.city`.
    pub async fn scrape(&self, params: &ScrapeParams, job: Option<&JobHandle>) -> Result<ScrapeOutcome> {
        if let Some(job) = job {
            job.start().await;
        }

        match self.run(params, job).await {
            Ok(outcome) => {
                if let Some(job) = job {
                    job.complete(outcome.properties.len()).await;
                }
                Ok(outcome)
            }
            Err(e) => {
                if let Some(job) = job {
                    job.fail(&format!("{:#}", e)).await;
                }
                Err(e)
            }
        }
    }

    async fn run(&self, params: &ScrapeParams, job: Option<&JobHandle>) -> Result<ScrapeOutcome> {
        let name = self.config.display_name();
        let extractor = Extractor::new(&self.config);
        info!("Starting {} scrape for {}", name, params.city);
        report(job, &format!("Zbieranie ogłoszeń z {}", name)).await;

        let Some(city_path) = self.city_path(&params.city) else {
            return Ok(ScrapeOutcome::default());
        };

        let (total_pages, mut preloaded) = if self.config.has_pagination {
            let url = SiteConfig::render_url(&self.config.base_url, &city_path, 1);
            let first = self.source.fetch(&url).await?;
            let pages = extractor.page_count(&first.html);
            let pages = params.max_pages.map_or(pages, |max| pages.min(max));
            info!("Will scrape {} pages", pages);
            report(job, &format!("Zbieranie ogłoszeń z {} (znaleziono {} stron)", name, pages)).await;
            (pages, Some(first.html))
        } else {
            let pages = params.max_pages.unwrap_or(self.config.default_pages);
            info!("Will scrape until empty pages (max {} pages)", pages);
            (pages, None)
        };

        let mut properties = Vec::new();
        let mut pages_scraped = 0;
        let mut empty_pages = 0;

        for page in 1..=total_pages {
            if let Some(job) = job {
                let progress = (page - 1) * 100 / total_pages;
                job.progress(progress as u8).await;
            }
            let message = if self.config.has_pagination {
                format!("Zbieranie ogłoszeń z {}, strona {}/{}", name, page, total_pages)
            } else {
                format!("Zbieranie ogłoszeń z {}, strona {}", name, page)
            };
            report(job, &message).await;

            let found = match preloaded.take().filter(|_| page == 1) {
                Some(html) => extractor.extract_page(&html, &params.city),
                None => self.fetch_page(&extractor, &city_path, page, &params.city).await,
            };
            pages_scraped += 1;

            if found.is_empty() {
                empty_pages += 1;
                info!("Page {} is empty ({} empty pages in a row)", page, empty_pages);
                if self.config.has_pagination || empty_pages >= MAX_EMPTY_PAGES {
                    info!("Stopping after empty page");
                    break;
                }
            } else {
                empty_pages = 0;
            }

            info!("Page {} done: {} properties", page, found.len());
            properties.extend(found);

            if page < total_pages && !params.page_delay.is_zero() {
                tokio::time::sleep(params.page_delay).await;
            }
        }

        report(job, &format!("Zapisywanie wyników z {}", name)).await;
        info!("✅ Scraped {} properties from {} pages of {}", properties.len(), pages_scraped, name);

        Ok(ScrapeOutcome {
            properties,
            pages_scraped,
        })
    }

    async fn fetch_page(&self, extractor: &Extractor<'_>, city_path: &str, page: u32, city: &str) -> Vec<Property> {
        let url = SiteConfig::render_url(&self.config.page_url, city_path, page);
        info!("Scraping page {}: {}", page, url);

        let fetched = match self.source.fetch(&url).await {
            Ok(fetched) => fetched,
            Err(e) => {
                warn!("Failed to fetch page {}: {:#}", page, e);
                return Vec::new();
            }
        };

        if page > 1 && self.config.detect_page_redirects && redirected_to_first_page(&fetched.url, page) {
            info!("Page {} redirected to {}, treating as empty", page, fetched.url);
            return Vec::new();
        }

        extractor.extract_page(&fetched.html, city)
    }
}
