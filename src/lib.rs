pub mod config;
pub mod error;
pub mod extract;
pub mod fetcher;
pub mod output;
pub mod performer;
pub mod query;
pub mod record;
pub mod scrape_engine;

pub use config::{ConfigBuilder, SiteConfig};
pub use error::ScrapeError;
pub use fetcher::{HttpFetcher, PageFetcher};
pub use record::{CatalogRecord, Gender, PerformerBuckets, PerformerInfo, Trailers};
pub use scrape_engine::ScrapeEngine;
