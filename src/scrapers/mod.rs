pub mod http;
pub mod site;
pub mod traits;
pub mod types;

pub use http::HttpPageSource;
pub use site::SiteScraper;
pub use traits::PageSource;
pub use types::{FetchedPage, ScrapeOutcome, ScrapeParams};
