//! Monthly archive pages scanned over plain HTTP.
//!
//! Archive pages live at `{archive_url}/{YYYY}/{MM}` and list every headline
//! of that month. Each requested month is scanned in full, newest month
//! first; headlines mentioning the search phrase (and the category, when one
//! is set) are followed to their article page for the title, date,
//! description and picture. There is no date-based early exit: the month
//! range is the window.

use chrono::NaiveDate;
use itertools::Itertools;
use scraper::{ElementRef, Html, Selector};
use std::collections::VecDeque;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use super::{Listing, Step, StopReason};
use crate::config::ArchiveSelectors;
use crate::error::{ExtractionError, NetworkError};
use crate::fetcher::PageFetcher;
use crate::http::HttpTransport;
use crate::models::ArticleSummary;

pub struct ArchiveListing<H> {
    fetcher: PageFetcher<H>,
    archive_url: String,
    phrase: String,
    category: Option<String>,
    selectors: ArchiveSelectors,
    months: VecDeque<NaiveDate>,
    cancel: CancellationToken,
    position: usize,
    stopped: Option<StopReason>,
}

impl<H: HttpTransport> ArchiveListing<H> {
    /// `months` are first-of-month dates in scan order (see
    /// [`crate::dates::archive_months`]).
    pub fn new(
        fetcher: PageFetcher<H>,
        archive_url: &str,
        phrase: &str,
        category: Option<&str>,
        selectors: ArchiveSelectors,
        months: Vec<NaiveDate>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            fetcher,
            archive_url: archive_url.trim_end_matches('/').to_string(),
            phrase: phrase.to_lowercase(),
            category: category.map(str::to_lowercase).filter(|c| !c.is_empty()),
            selectors,
            months: months.into(),
            cancel,
            position: 0,
            stopped: None,
        }
    }

    pub fn month_url(&self, month: NaiveDate) -> String {
        format!("{}/{}", self.archive_url, month.format("%Y/%m"))
    }

    /// Article links on an archive page whose headline matches the search.
    fn matching_links(&self, page_url: &str, html: &str) -> Result<Vec<String>, ExtractionError> {
        let headline = parse_selector(&self.selectors.headline)?;
        let anchor = parse_selector("a[href]")?;
        let base = Url::parse(page_url).ok();
        let document = Html::parse_document(html);

        let links = document
            .select(&headline)
            .filter(|entry| text_of(entry).to_lowercase().contains(&self.phrase))
            .filter_map(|entry| {
                let href = match entry.value().attr("href") {
                    Some(href) => href,
                    None => entry.select(&anchor).next()?.value().attr("href")?,
                };
                match &base {
                    Some(base) => base.join(href).ok().map(String::from),
                    None => Some(href.to_string()),
                }
            })
            .filter(|link| self.in_category(page_url, link))
            .unique()
            .collect();
        Ok(links)
    }

    fn in_category(&self, page_url: &str, link: &str) -> bool {
        match &self.category {
            None => true,
            Some(category) => {
                link.to_lowercase().contains(category.as_str())
                    || page_url.to_lowercase().contains(category.as_str())
            }
        }
    }

    /// Pull the summary fields out of an article page.
    fn parse_article(&self, page_url: &str, html: &str, position: usize) -> Result<ArticleSummary, ExtractionError> {
        let document = Html::parse_document(html);
        let required = |css: &str, field: &'static str| -> Result<String, ExtractionError> {
            let selector = parse_selector(css)?;
            document
                .select(&selector)
                .map(|el| text_of(&el))
                .find(|text| !text.is_empty())
                .ok_or(ExtractionError::MissingField { index: position, field })
        };

        let title = required(&self.selectors.title, "title")?;
        let raw_date = required(&self.selectors.date, "date")?;
        let description = required(&self.selectors.description, "description")?;

        let image = parse_selector(&self.selectors.image)?;
        let image_url = document
            .select(&image)
            .find_map(|el| el.value().attr("src").or_else(|| el.value().attr("data-src")))
            .and_then(|src| match Url::parse(page_url) {
                Ok(base) => base.join(src).ok().map(String::from),
                Err(_) => Some(src.to_string()),
            });

        Ok(ArticleSummary {
            title,
            description,
            raw_date,
            image_url,
            position,
        })
    }

    /// Scan one month; `Err` carries the reason to stop after this batch.
    #[instrument(level = "info", skip(self, batch))]
    async fn scan_month(&mut self, month_url: &str, batch: &mut Vec<ArticleSummary>) -> Result<(), StopReason> {
        let html = match self.fetcher.fetch_text(month_url).await {
            Ok(html) => html,
            Err(NetworkError::Cancelled) => return Err(StopReason::Cancelled),
            Err(e) => {
                error!(error = %e, "Failed to retrieve news for month");
                return Ok(());
            }
        };

        let links = match self.matching_links(month_url, &html) {
            Ok(links) => links,
            Err(e) => {
                error!(error = %e, "Cannot read archive page");
                return Err(StopReason::ExtractionFailed);
            }
        };
        info!(matches = links.len(), "Scanning news for month");

        for link in links {
            if self.cancel.is_cancelled() {
                return Err(StopReason::Cancelled);
            }
            let html = match self.fetcher.fetch_text(&link).await {
                Ok(html) => html,
                Err(NetworkError::Cancelled) => return Err(StopReason::Cancelled),
                Err(e) => {
                    warn!(%link, error = %e, "Skipping article that could not be fetched");
                    continue;
                }
            };
            let position = self.position + 1;
            match self.parse_article(&link, &html, position) {
                Ok(summary) => {
                    debug!(%link, title = %summary.title, "Read article");
                    self.position = position;
                    batch.push(summary);
                }
                Err(e) => {
                    error!(%link, error = %e, "Article is missing expected fields");
                    return Err(StopReason::ExtractionFailed);
                }
            }
        }
        Ok(())
    }
}

impl<H: HttpTransport> Listing for ArchiveListing<H> {
    async fn next_batch(&mut self) -> Step {
        if let Some(reason) = self.stopped {
            return Step::Exhausted(reason);
        }
        if self.cancel.is_cancelled() {
            self.halt(StopReason::Cancelled);
            return Step::Exhausted(StopReason::Cancelled);
        }
        let Some(month) = self.months.pop_front() else {
            self.halt(StopReason::SourceExhausted);
            return Step::Exhausted(StopReason::SourceExhausted);
        };

        let url = self.month_url(month);
        let mut batch = Vec::new();
        if let Err(reason) = self.scan_month(&url, &mut batch).await {
            self.halt(reason);
            if batch.is_empty() {
                return Step::Exhausted(reason);
            }
        }
        Step::Batch(batch)
    }

    fn halt(&mut self, reason: StopReason) {
        if self.stopped.is_none() {
            self.stopped = Some(reason);
        }
    }
}

fn parse_selector(css: &str) -> Result<Selector, ExtractionError> {
    Selector::parse(css).map_err(|e| ExtractionError::Selector {
        selector: css.to_string(),
        reason: e.to_string(),
    })
}

fn text_of(element: &ElementRef<'_>) -> String {
    element.text().collect::<Vec<_>>().join(" ").split_whitespace().join(" ")
}
