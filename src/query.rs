use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::SiteConfig;
use crate::error::ScrapeError;
use crate::fetcher::PageFetcher;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    terms: Vec<SearchTerm>,
}

#[derive(Debug, Deserialize)]
struct SearchTerm {
    #[serde(default)]
    url: Option<String>,
}

/// Turns release-style names (`scene.name_2023`) into plain words.
pub fn normalize_query(text: &str) -> String {
    text.replace(['_', '.', '-'], " ")
}

pub fn search_url(config: &SiteConfig, text: &str) -> String {
    format!(
        "{}?q={}",
        config.search_endpoint(),
        urlencoding::encode(&normalize_query(text))
    )
}

/// Asks the site's autocomplete endpoint for the best page matching `text`.
/// `Ok(None)` means the search ran but found nothing usable.
pub async fn resolve_query<F>(
    fetcher: &F,
    config: &SiteConfig,
    text: &str,
) -> Result<Option<String>, ScrapeError>
where
    F: PageFetcher + ?Sized,
{
    let url = search_url(config, text);
    info!("Searching catalog for {:?}", normalize_query(text));

    let body = fetcher.fetch(&url).await?;
    let response: SearchResponse = serde_json::from_str(&body)?;
    debug!("Search returned {} term(s)", response.terms.len());

    let Some(url) = response
        .terms
        .into_iter()
        .next()
        .and_then(|term| term.url)
        .filter(|url| !url.trim().is_empty())
    else {
        return Ok(None);
    };

    absolute_url(config, url.trim()).map(Some)
}

/// Resolves a possibly site-relative link (`/watch/1/x`) against the base URL.
pub fn absolute_url(config: &SiteConfig, link: &str) -> Result<String, ScrapeError> {
    if let Ok(url) = Url::parse(link) {
        return Ok(url.to_string());
    }

    let base = Url::parse(&config.base_url)
        .map_err(|e| ScrapeError::Config(format!("base URL `{}`: {}", config.base_url, e)))?;
    base.join(link)
        .map(|url| url.to_string())
        .map_err(|e| ScrapeError::Resolution(format!("{} ({})", link, e)))
}
