use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};

use crate::config::{SiteConfig, strip_suffix};
use crate::error::ScrapeError;
use crate::extract::{element_text, non_empty, parse_selector};
use crate::fetcher::PageFetcher;
use crate::record::{Gender, PerformerBuckets, PerformerInfo};

/// Leftovers of an inline CSS `url("...")` that sometimes trail photo URLs.
const IMAGE_ARTIFACTS: &[&str] = &["&quot;);", "\");"];

/// Everything read from one profile page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub name: Option<String>,
    pub info: PerformerInfo,
    pub gender: Gender,
}

#[derive(Debug)]
pub struct ProfileParser {
    title_suffix: String,
    title: Selector,
    nationality: Selector,
    cell: Selector,
    photo: Selector,
    primary_text: Selector,
    anchor: Selector,
}

impl ProfileParser {
    pub fn new(config: &SiteConfig) -> Result<Self, ScrapeError> {
        Ok(Self {
            title_suffix: config.title_suffix.clone(),
            title: parse_selector("title")?,
            nationality: parse_selector(r#"a[href*="/nationality"]"#)?,
            cell: parse_selector("td")?,
            photo: parse_selector(".model__left.model__left--photo img")?,
            primary_text: parse_selector(".text-primary")?,
            anchor: parse_selector("a")?,
        })
    }

    /// Reads a profile page. Every call starts from an empty profile.
    pub fn parse(&self, html: &str) -> Profile {
        let document = Html::parse_document(html);

        Profile {
            name: self.name(&document),
            info: PerformerInfo {
                age: self.age(&document),
                nationality: self.nationality(&document),
                image: self.image(&document),
            },
            gender: self.gender(&document),
        }
    }

    fn name(&self, document: &Html) -> Option<String> {
        let title = document.select(&self.title).next()?;
        let has_text = document
            .root_element()
            .text()
            .any(|t| !t.trim().is_empty());
        if !has_text {
            return None;
        }

        let text = title.text().collect::<String>();
        non_empty(strip_suffix(&text, &self.title_suffix).to_string())
    }

    /// Text right at the start of the first nationality link.
    fn nationality(&self, document: &Html) -> Option<String> {
        let link = document.select(&self.nationality).next()?;
        let first = link.first_child()?;
        let text = match first.value().as_text() {
            Some(text) => text.trim().to_string(),
            None => ElementRef::wrap(first).map(element_text)?,
        };
        non_empty(text)
    }

    /// Integer in the cell after the `Age:` label.
    fn age(&self, document: &Html) -> Option<u32> {
        let label = document
            .select(&self.cell)
            .find(|td| element_text(*td) == "Age:")?;
        let value = label.next_siblings().find_map(ElementRef::wrap)?;
        let raw = element_text(value);

        match raw.parse::<u32>() {
            Ok(age) => Some(age),
            Err(e) => {
                debug!("Ignoring non-numeric age {:?}: {}", raw, e);
                None
            }
        }
    }

    fn image(&self, document: &Html) -> Option<String> {
        let img = document.select(&self.photo).next()?;
        let mut src = img.value().attr("src")?;
        for artifact in IMAGE_ARTIFACTS {
            if let Some(idx) = src.find(artifact) {
                src = &src[..idx];
            }
        }
        non_empty(src.to_string())
    }

    fn gender(&self, document: &Html) -> Gender {
        document
            .select(&self.primary_text)
            .next()
            .and_then(|block| block.select(&self.anchor).next())
            .and_then(|a| a.value().attr("href"))
            .and_then(gender_segment)
            .map_or(Gender::Unknown, Gender::from_segment)
    }
}

/// Path segment after `/sex/`, e.g. `female` in
/// `https://www.analvids.com/models/sex/female/nationality/czech`.
pub fn gender_segment(href: &str) -> Option<&str> {
    const MARKER: &str = "/sex/";
    let start = href.rfind(MARKER)? + MARKER.len();
    let rest = &href[start..];
    let rest = rest.split("/nationality/").next().unwrap_or(rest);
    rest.split(['/', '?', '#']).next().filter(|s| !s.is_empty())
}

/// Fetches each profile in order and files it under its bucket. The first
/// failed fetch aborts the whole resolution.
pub async fn resolve_performers<F>(
    fetcher: &F,
    parser: &ProfileParser,
    hrefs: &[String],
) -> Result<PerformerBuckets, ScrapeError>
where
    F: PageFetcher + ?Sized,
{
    let mut buckets = PerformerBuckets::default();

    for (index, href) in hrefs.iter().enumerate() {
        info!("Resolving performer {} of {}: {}", index + 1, hrefs.len(), href);
        let html = fetcher.fetch(href).await?;
        let profile = parser.parse(&html);
        debug!(
            "{:?} -> {:?} (age {:?}, nationality {:?})",
            profile.name, profile.gender, profile.info.age, profile.info.nationality
        );
        buckets.insert(profile.gender, profile.name, profile.info);
    }

    Ok(buckets)
}
