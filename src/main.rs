use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mieszkanie_scout::config::{LocationMap, SiteConfig};
use mieszkanie_scout::jobs::JobTracker;
use mieszkanie_scout::models::Property;
use mieszkanie_scout::scrapers::{HttpPageSource, ScrapeParams, SiteScraper};
use mieszkanie_scout::store::{PropertyFilter, PropertyStore, SortOrder};
use mieszkanie_scout::Extractor;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "mieszkanie-scout", about = "Real-estate listing scraper for Polish classifieds sites")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Extract listings from a saved HTML page
    Extract {
        #[arg(long)]
        site: PathBuf,
        #[arg(long)]
        html: PathBuf,
        #[arg(long, default_value = "katowice")]
        city: String,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Scrape a site over HTTP and upsert the results into a store file
    Scrape {
        #[arg(long)]
        site: PathBuf,
        #[arg(long, default_value = "katowice")]
        city: String,
        #[arg(long)]
        max_pages: Option<u32>,
        /// CSV city mapping overriding the one named in the site configuration
        #[arg(long)]
        locations: Option<PathBuf>,
        #[arg(long, default_value = "scraped_properties.json")]
        store: PathBuf,
        #[arg(long, default_value_t = 500)]
        delay_ms: u64,
    },
    /// Query a store file
    Query {
        #[arg(long, default_value = "scraped_properties.json")]
        store: PathBuf,
        #[arg(long = "site")]
        sites: Vec<String>,
        #[arg(long)]
        price_min: Option<i64>,
        #[arg(long)]
        price_max: Option<i64>,
        #[arg(long)]
        area_min: Option<i64>,
        #[arg(long)]
        area_max: Option<i64>,
        #[arg(long)]
        rooms_min: Option<i64>,
        #[arg(long)]
        rooms_max: Option<i64>,
        #[arg(long)]
        level_min: Option<i64>,
        #[arg(long)]
        level_max: Option<i64>,
        #[arg(long)]
        address: Option<String>,
        #[arg(long, default_value = "price_asc")]
        sort: SortOrder,
    },
}

fn print_property(i: usize, property: &Property) {
    println!("{}. {} ({} zł)", i + 1, property.title, property.price);
    let rooms = property.rooms.map_or("?".to_string(), |r| r.to_string());
    let level = match property.level {
        Some(0) => "parter".to_string(),
        Some(level) => level.to_string(),
        None => "?".to_string(),
    };
    println!("   {} pokoje, {} m², piętro {}", rooms, property.area, level);
    println!("   {}", property.address);
    println!("   ID: {}", property.id);
    println!("   URL: {}", property.link);
    println!();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match Cli::parse().command {
        Command::Extract {
            site,
            html,
            city,
            output,
        } => {
            let config = SiteConfig::from_file(&site)?;
            let page = tokio::fs::read_to_string(&html)
                .await
                .with_context(|| format!("Failed to read {}", html.display()))?;

            let properties = Extractor::new(&config).extract_page(&page, &city);
            info!("✅ Extracted {} properties from {}", properties.len(), html.display());

            for (i, property) in properties.iter().enumerate() {
                print_property(i, property);
            }

            if let Some(output) = output {
                let json = serde_json::to_string_pretty(&properties)?;
                tokio::fs::write(&output, json).await?;
                info!("💾 Saved properties to {}", output.display());
            }
        }
        Command::Scrape {
            site,
            city,
            max_pages,
            locations,
            store,
            delay_ms,
        } => {
            let config = SiteConfig::from_file(&site)?;
            let site_name = config.site_name.clone();

            let mut scraper = SiteScraper::new(HttpPageSource::new()?, config);
            if let Some(path) = locations {
                scraper = scraper.with_locations(LocationMap::from_csv(&path)?);
            }

            let tracker = JobTracker::new();
            let job_id = tracker.create(&city, &site_name).await;
            let job = tracker.handle(&job_id);

            let params = ScrapeParams {
                city,
                max_pages,
                page_delay: Duration::from_millis(delay_ms),
            };
            let outcome = scraper.scrape(&params, Some(&job)).await?;

            let mut property_store = PropertyStore::load(&store).await?;
            property_store.upsert_batch(outcome.properties);
            property_store.save(&store).await?;

            if let Some(job) = tracker.get(&job_id).await {
                info!(
                    "Job {} {:?}: {} properties from {} pages",
                    job.id, job.status, job.total_found, outcome.pages_scraped
                );
            }
        }
        Command::Query {
            store,
            sites,
            price_min,
            price_max,
            area_min,
            area_max,
            rooms_min,
            rooms_max,
            level_min,
            level_max,
            address,
            sort,
        } => {
            let property_store = PropertyStore::load(&store).await?;
            let filter = PropertyFilter {
                sites: if sites.is_empty() { None } else { Some(sites) },
                price_min,
                price_max,
                area_min,
                area_max,
                rooms_min,
                rooms_max,
                level_min,
                level_max,
                address,
                sort,
            };

            let results = property_store.query(&filter);
            info!("Found {} of {} stored properties", results.len(), property_store.len());
            for (i, stored) in results.iter().enumerate() {
                print_property(i, &stored.property);
            }
        }
    }

    Ok(())
}
