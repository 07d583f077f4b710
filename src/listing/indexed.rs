//! Search results walked one card at a time in a browser session.
//!
//! The results page is reverse-chronological and grows as it is scrolled,
//! so the listing reads card `i`, then `i + 1`, and stops at the first card
//! that is missing, broken, undated or older than the window. Skipping a
//! bad card is not safe: the page state left behind would no longer line
//! up with the index.

use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::{Listing, Step, StopReason, split_excerpt};
use crate::config::IndexedSelectors;
use crate::dates::{DateResolver, DateWindow};
use crate::error::ExtractionError;
use crate::models::ArticleSummary;
use crate::session::BrowserSession;
use crate::utils::truncate_for_log;

/// What to search for.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub listing_url: String,
    pub phrase: String,
    pub category: Option<String>,
}

pub struct IndexedListing<S> {
    session: S,
    query: SearchQuery,
    selectors: IndexedSelectors,
    resolver: DateResolver,
    window: DateWindow,
    cancel: CancellationToken,
    next_index: usize,
    stopped: Option<StopReason>,
}

impl<S: BrowserSession> IndexedListing<S> {
    pub fn new(
        session: S,
        query: SearchQuery,
        selectors: IndexedSelectors,
        resolver: DateResolver,
        window: DateWindow,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            session,
            query,
            selectors,
            resolver,
            window,
            cancel,
            next_index: 1,
            stopped: None,
        }
    }

    /// Open the portal and run the search.
    ///
    /// Each step failing is logged and skipped; a half-prepared page still
    /// gets read, and an unusable one simply yields no cards.
    #[instrument(level = "info", skip_all, fields(url = %self.query.listing_url))]
    pub async fn prepare(&mut self) {
        if let Err(e) = self.session.open(&self.query.listing_url).await {
            error!(error = %e, "Error opening website");
            return;
        }

        let field = self.selectors.search_field.clone();
        let searched = async {
            self.session.input_text(&field, &self.query.phrase).await?;
            self.session.press_enter(&field).await
        }
        .await;
        match searched {
            Ok(()) => info!(phrase = %self.query.phrase, "Entered search phrase"),
            Err(e) => error!(error = %e, "Error entering search phrase"),
        }

        if let Some(category) = self.query.category.clone() {
            let selector = self.selectors.category_filter.replace("{category}", &category);
            let wait = Duration::from_secs(self.selectors.category_wait_secs);
            let selected = async {
                self.session.wait_until_visible(&selector, wait).await?;
                self.session.click(&selector).await
            }
            .await;
            match selected {
                Ok(()) => info!(%category, "Selected news category"),
                Err(e) => warn!(%category, error = %e, "Error selecting news category"),
            }
        }

        let sort = self.selectors.sort_control.clone();
        let wait = Duration::from_secs(self.selectors.sort_wait_secs);
        let sorted = async {
            self.session.wait_until_visible(&sort, wait).await?;
            self.session.click(&sort).await
        }
        .await;
        match sorted {
            Ok(()) => info!("Sorted results by newest"),
            Err(e) => error!(error = %e, "Error choosing latest news"),
        }
    }

    /// Give the session back, e.g. to close it.
    pub fn into_session(self) -> S {
        self.session
    }

    /// Read card `index`, or say why the listing ends here.
    async fn read_item(&mut self, index: usize) -> Result<ArticleSummary, StopReason> {
        let link = IndexedSelectors::item(&self.selectors.result_link, index);
        let wait = Duration::from_secs(self.selectors.item_wait_secs);

        if let Err(e) = self.session.wait_until_enabled(&link, wait).await {
            info!(index, error = %e, "No further results");
            return Err(StopReason::SourceExhausted);
        }
        if let Err(e) = self.session.scroll_into_view(&link).await {
            debug!(index, error = %e, "Could not scroll result into view");
        }

        let excerpt_selector = IndexedSelectors::item(&self.selectors.excerpt, index);
        let excerpt = match self.session.text(&excerpt_selector).await {
            Ok(text) => text,
            Err(e) => {
                let e = ExtractionError::from(e);
                error!(index, error = %e, "Result has no excerpt");
                return Err(StopReason::ExtractionFailed);
            }
        };

        let Some((raw_date, description)) = split_excerpt(&excerpt) else {
            let e = ExtractionError::MissingDelimiter {
                index,
                excerpt: truncate_for_log(&excerpt, 120),
            };
            error!(error = %e, "Cannot split excerpt");
            return Err(StopReason::ExtractionFailed);
        };

        let date = match self.resolver.resolve(raw_date) {
            Ok(date) => date,
            Err(e) => {
                error!(index, error = %e, "Cannot resolve result date");
                return Err(StopReason::DateUnresolved);
            }
        };
        if !self.window.contains(date) {
            info!(index, %date, start = %self.window.start(), "Reached results older than the window");
            return Err(StopReason::CutoffReached);
        }

        let title = match self.session.text(&link).await {
            Ok(title) if !title.trim().is_empty() => title.trim().to_string(),
            Ok(_) => {
                let e = ExtractionError::MissingField { index, field: "title" };
                error!(error = %e, "Result has an empty title");
                return Err(StopReason::ExtractionFailed);
            }
            Err(e) => {
                let e = ExtractionError::from(e);
                error!(index, error = %e, "Cannot read result title");
                return Err(StopReason::ExtractionFailed);
            }
        };

        let picture = IndexedSelectors::item(&self.selectors.picture, index);
        let image_url = match self.session.attribute(&picture, "src").await {
            Ok(src) => src.filter(|s| !s.trim().is_empty()),
            Err(e) => {
                debug!(index, error = %e, "Result has no picture");
                None
            }
        };

        Ok(ArticleSummary {
            title,
            description: description.to_string(),
            raw_date: raw_date.to_string(),
            image_url,
            position: index,
        })
    }
}

impl<S: BrowserSession> Listing for IndexedListing<S> {
    async fn next_batch(&mut self) -> Step {
        if let Some(reason) = self.stopped {
            return Step::Exhausted(reason);
        }
        if self.cancel.is_cancelled() {
            self.halt(StopReason::Cancelled);
            return Step::Exhausted(StopReason::Cancelled);
        }

        let index = self.next_index;
        match self.read_item(index).await {
            Ok(summary) => {
                debug!(index, title = %summary.title, "Read result");
                self.next_index += 1;
                Step::Batch(vec![summary])
            }
            Err(reason) => {
                self.halt(reason);
                Step::Exhausted(reason)
            }
        }
    }

    fn halt(&mut self, reason: StopReason) {
        if self.stopped.is_none() {
            self.stopped = Some(reason);
        }
    }
}
