use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::config::{SiteConfig, strip_suffix};
use crate::error::ScrapeError;
use crate::record::{RecordBuilder, Trailers};

/// Fields read from a catalog page plus the performer profiles it links to.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimaryPage {
    pub fields: RecordBuilder,
    /// Sorted and de-duplicated.
    pub performer_urls: Vec<String>,
}

pub(crate) fn parse_selector(css: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(css).map_err(|e| ScrapeError::Selector {
        css: css.to_string(),
        message: format!("{:?}", e),
    })
}

/// All text below `element`, trimmed.
pub(crate) fn element_text(element: ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

pub(crate) fn non_empty(text: String) -> Option<String> {
    if text.is_empty() { None } else { Some(text) }
}

/// Reads catalog-page fields with patterns compiled once per site.
#[derive(Debug)]
pub struct FieldExtractor {
    require_date: bool,
    title_suffix: String,
    code_pattern: Regex,
    calendar_pattern: Regex,
    studio_pattern: Regex,
    genre_pattern: Regex,
    model_pattern: Regex,
    title: Selector,
    classed: Selector,
    watch: Selector,
    video: Selector,
    source: Selector,
    link: Selector,
}

impl FieldExtractor {
    pub fn new(config: &SiteConfig) -> Result<Self, ScrapeError> {
        let studio_pattern = Regex::new(&format!("^{}.*$", regex::escape(&config.studio_prefix())))?;
        let model_pattern = Regex::new(&format!("^{}.*$", regex::escape(&config.model_prefix())))?;

        Ok(Self {
            require_date: config.require_date,
            title_suffix: config.title_suffix.clone(),
            code_pattern: Regex::new(r"\b[A-Za-z]{2,4}\d{2,4}\b")?,
            calendar_pattern: Regex::new(r"-calendar")?,
            studio_pattern,
            genre_pattern: Regex::new(r"/genre/*")?,
            model_pattern,
            title: parse_selector("title")?,
            classed: parse_selector("[class]")?,
            watch: parse_selector(".watch")?,
            video: parse_selector("video")?,
            source: parse_selector("source")?,
            link: parse_selector("a[href]")?,
        })
    }

    pub fn extract(&self, html: &str) -> Result<PrimaryPage, ScrapeError> {
        let document = Html::parse_document(html);

        let title = self.title(&document).ok_or(ScrapeError::Validation("Title"))?;
        let code = self.code(&title);
        debug!("Title: {:?}, Code: {:?}", title, code);

        let date = self.date(&document);
        if date.is_none() && self.require_date {
            return Err(ScrapeError::Validation("Date"));
        }

        let (poster, runtime, trailers) = self.video(&document);
        let studio = self.studio(&document);
        let tags = self.tags(&document);
        let performer_urls = self.performer_urls(&document);
        debug!(
            "Studio: {:?}, {} tag(s), {} performer link(s)",
            studio,
            tags.as_ref().map_or(0, Vec::len),
            performer_urls.len()
        );

        let fields = RecordBuilder::new(title)
            .code(code)
            .date(date)
            .runtime(runtime)
            .poster(poster)
            .trailers(trailers)
            .studio(studio)
            .tags(tags);

        Ok(PrimaryPage {
            fields,
            performer_urls,
        })
    }

    fn title(&self, document: &Html) -> Option<String> {
        let element = document.select(&self.title).next()?;
        let text = element.text().collect::<String>();
        non_empty(strip_suffix(&text, &self.title_suffix).to_string())
    }

    /// First catalog code such as `XY1234` in the title.
    pub fn code(&self, title: &str) -> Option<String> {
        self.code_pattern
            .find(title)
            .map(|m| m.as_str().to_string())
    }

    fn date(&self, document: &Html) -> Option<String> {
        document
            .select(&self.classed)
            .find(|el| el.value().classes().any(|c| self.calendar_pattern.is_match(c)))
            .and_then(|el| non_empty(element_text(el)))
    }

    /// Poster, runtime and trailers of the first video in the watch block.
    fn video(
        &self,
        document: &Html,
    ) -> (Option<String>, Option<String>, Option<Trailers>) {
        let Some(video) = document
            .select(&self.watch)
            .next()
            .and_then(|watch| watch.select(&self.video).next())
        else {
            return (None, None, None);
        };

        let poster = video.value().attr("data-poster").map(str::to_string);
        let runtime = video.value().attr("data-duration").map(str::to_string);

        let mut trailers = Trailers::default();
        for source in video.select(&self.source) {
            let el = source.value();
            if let (Some(size), Some(src)) = (el.attr("size"), el.attr("src")) {
                trailers.insert(size.to_string(), src.to_string());
            }
        }

        let trailers = if trailers.is_empty() { None } else { Some(trailers) };
        (poster, runtime, trailers)
    }

    fn studio(&self, document: &Html) -> Option<String> {
        self.links_matching(document, &self.studio_pattern)
            .next()
            .and_then(|a| non_empty(element_text(a)))
    }

    /// Genre link texts. The first genre link is the "all genres" entry and
    /// is skipped.
    fn tags(&self, document: &Html) -> Option<Vec<String>> {
        let texts: Vec<String> = self
            .links_matching(document, &self.genre_pattern)
            .map(element_text)
            .collect();

        if texts.is_empty() {
            None
        } else {
            Some(texts.into_iter().skip(1).collect())
        }
    }

    fn performer_urls(&self, document: &Html) -> Vec<String> {
        let mut hrefs: Vec<String> = self
            .links_matching(document, &self.model_pattern)
            .filter_map(|a| a.value().attr("href"))
            .map(str::to_string)
            .collect();
        hrefs.sort();
        hrefs.dedup();
        hrefs
    }

    fn links_matching<'a>(
        &'a self,
        document: &'a Html,
        pattern: &'a Regex,
    ) -> impl Iterator<Item = ElementRef<'a>> + 'a {
        document.select(&self.link).filter(move |a| {
            a.value()
                .attr("href")
                .is_some_and(|href| pattern.is_match(href))
        })
    }
}
