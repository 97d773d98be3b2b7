use reqwest::Url;

use crate::error::ScrapeError;

pub const DEFAULT_BASE_URL: &str = "https://www.analvids.com";
pub const DEFAULT_TITLE_SUFFIX: &str = " - AnalVids";
pub const DEFAULT_SEARCH_PATH: &str = "/api/autocomplete/search";

/// Site-specific settings shared by the extractor, the profile parser and the
/// query resolver.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteConfig {
    /// Scheme and host without a trailing slash, e.g. `https://www.analvids.com`.
    pub base_url: String,
    /// Brand marker appended to every page title.
    pub title_suffix: String,
    pub search_path: String,
    /// Treat a missing release date as a validation error.
    pub require_date: bool,
}

impl SiteConfig {
    pub fn studio_prefix(&self) -> String {
        format!("{}/studios/", self.base_url)
    }

    pub fn model_prefix(&self) -> String {
        format!("{}/model/", self.base_url)
    }

    pub fn search_endpoint(&self) -> String {
        format!("{}{}", self.base_url, self.search_path)
    }
}

/// Everything before the first `suffix` in `title`, trimmed.
pub fn strip_suffix<'a>(title: &'a str, suffix: &str) -> &'a str {
    if suffix.is_empty() {
        return title.trim();
    }
    title.split(suffix).next().unwrap_or(title).trim()
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            title_suffix: DEFAULT_TITLE_SUFFIX.to_string(),
            search_path: DEFAULT_SEARCH_PATH.to_string(),
            require_date: false,
        }
    }
}

pub struct ConfigBuilder {
    base_url: Option<String>,
    title_suffix: Option<String>,
    search_path: Option<String>,
    require_date: bool,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            base_url: None,
            title_suffix: None,
            search_path: None,
            require_date: false,
        }
    }

    pub fn base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn title_suffix<S: Into<String>>(mut self, suffix: S) -> Self {
        self.title_suffix = Some(suffix.into());
        self
    }

    pub fn search_path<S: Into<String>>(mut self, path: S) -> Self {
        self.search_path = Some(path.into());
        self
    }

    pub fn require_date(mut self, require_date: bool) -> Self {
        self.require_date = require_date;
        self
    }

    pub fn build(self) -> Result<SiteConfig, ScrapeError> {
        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base_url = base_url.trim().trim_end_matches('/').to_string();

        let parsed = Url::parse(&base_url)
            .map_err(|e| ScrapeError::Config(format!("base URL `{}`: {}", base_url, e)))?;
        if parsed.host_str().is_none() {
            return Err(ScrapeError::Config(format!(
                "base URL `{}` has no host",
                base_url
            )));
        }

        let search_path = self
            .search_path
            .unwrap_or_else(|| DEFAULT_SEARCH_PATH.to_string());
        let search_path = if search_path.starts_with('/') {
            search_path
        } else {
            format!("/{}", search_path)
        };

        Ok(SiteConfig {
            base_url,
            title_suffix: self
                .title_suffix
                .unwrap_or_else(|| DEFAULT_TITLE_SUFFIX.to_string()),
            search_path,
            require_date: self.require_date,
        })
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
