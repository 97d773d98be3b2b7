use reqwest::Url;
use tracing::info;

use crate::config::SiteConfig;
use crate::error::ScrapeError;
use crate::extract::FieldExtractor;
use crate::fetcher::PageFetcher;
use crate::performer::{ProfileParser, resolve_performers};
use crate::query::resolve_query;
use crate::record::CatalogRecord;

/// Drives one input through resolution, fetching, extraction and performer
/// lookup.
#[derive(Debug)]
pub struct ScrapeEngine<F> {
    config: SiteConfig,
    fetcher: F,
    extractor: FieldExtractor,
    profiles: ProfileParser,
}

impl<F: PageFetcher> ScrapeEngine<F> {
    pub fn new(config: SiteConfig, fetcher: F) -> Result<Self, ScrapeError> {
        let extractor = FieldExtractor::new(&config)?;
        let profiles = ProfileParser::new(&config)?;

        Ok(Self {
            config,
            fetcher,
            extractor,
            profiles,
        })
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Builds the record for a page URL or a free-text query.
    pub async fn scrape(&self, input: &str) -> Result<CatalogRecord, ScrapeError> {
        let url = self.resolve_input(input).await?;
        info!("Scraping {}", url);

        let html = self.fetcher.fetch(&url).await?;
        let page = self.extractor.extract(&html)?;
        info!(
            "Found \"{}\" with {} performer link(s)",
            page.fields.title(),
            page.performer_urls.len()
        );

        let performers = resolve_performers(&self.fetcher, &self.profiles, &page.performer_urls).await?;

        Ok(page.fields.build(performers))
    }

    /// Direct URLs pass through. Anything else goes to the site search.
    pub async fn resolve_input(&self, input: &str) -> Result<String, ScrapeError> {
        if is_page_url(input) {
            return Ok(input.to_string());
        }

        resolve_query(&self.fetcher, &self.config, input)
            .await?
            .ok_or_else(|| ScrapeError::Resolution(input.to_string()))
    }
}

/// An absolute http(s) URL with a host.
pub fn is_page_url(input: &str) -> bool {
    match Url::parse(input.trim()) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host_str().is_some(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_page_url() {
        assert!(is_page_url("https://www.analvids.com/watch/123/scene"));
        assert!(is_page_url("http://localhost:8080/page"));
        assert!(!is_page_url("scene name 2023"));
        assert!(!is_page_url("ftp://example.com/file"));
        assert!(!is_page_url("www.analvids.com/watch/123"));
    }
}
