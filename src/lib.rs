//! Real-estate listing extraction for Polish classifieds sites.
//!
//! The [`extract`] engine turns one fetched HTML page plus a declarative
//! [`config::SiteConfig`] into normalized [`models::Property`] records.
//! [`scrapers`] fetches pages and drives pagination, [`store`] keeps records
//! deduplicated by link, and [`jobs`] tracks scrape progress.

pub mod config;
pub mod extract;
pub mod jobs;
pub mod models;
pub mod scrapers;
pub mod store;

pub use config::{SiteConfig, SiteRegistry};
pub use extract::Extractor;
pub use models::{property_id, Property};
