//! Listing → metrics → pictures → result set.
//!
//! The pipeline is strategy-agnostic: it pulls batches from any
//! [`Listing`], re-checks each summary's date against the window, scores
//! it, downloads its picture and appends the record. Everything runs one
//! await at a time, so records keep the order the listing produced them in.

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use crate::content::ContentMetrics;
use crate::dates::{DateResolver, DateWindow};
use crate::error::OutputError;
use crate::http::HttpTransport;
use crate::listing::{Listing, Step, StopReason};
use crate::media::{MediaFetcher, MediaStore};
use crate::models::{ArticleRecord, ResultSet};
use crate::outputs::TabularSink;

/// Outcome of one pass over a listing.
#[derive(Debug)]
pub struct RunReport {
    pub results: ResultSet,
    pub stop: StopReason,
}

pub struct ExtractionPipeline<H, S> {
    phrase: String,
    resolver: DateResolver,
    window: DateWindow,
    media: MediaFetcher<H, S>,
    cancel: CancellationToken,
}

impl<H: HttpTransport, S: MediaStore> ExtractionPipeline<H, S> {
    pub fn new(
        phrase: impl Into<String>,
        resolver: DateResolver,
        window: DateWindow,
        media: MediaFetcher<H, S>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            phrase: phrase.into(),
            resolver,
            window,
            media,
            cancel,
        }
    }

    /// Drain `listing` into a result set.
    ///
    /// Stops when the listing reports exhaustion; an undatable summary or a
    /// cancellation halts the listing first so the reason is recorded there.
    #[instrument(level = "info", skip_all, fields(phrase = %self.phrase, window_start = %self.window.start()))]
    pub async fn collect<L: Listing>(&self, listing: &mut L) -> RunReport {
        let mut results = ResultSet::new();

        let stop = loop {
            if self.cancel.is_cancelled() {
                listing.halt(StopReason::Cancelled);
            }

            let batch = match listing.next_batch().await {
                Step::Batch(batch) => batch,
                Step::Exhausted(reason) => break reason,
            };
            debug!(size = batch.len(), "Processing batch");

            for summary in batch {
                let date = match self.resolver.resolve(&summary.raw_date) {
                    Ok(date) => date,
                    Err(e) => {
                        error!(position = summary.position, raw_date = %summary.raw_date, error = %e, "Could not resolve article date");
                        listing.halt(StopReason::DateUnresolved);
                        break;
                    }
                };

                if !self.window.contains(date) {
                    debug!(position = summary.position, %date, "Article predates window; dropping");
                    continue;
                }

                let metrics = ContentMetrics::compute(&summary.title, &summary.description, &self.phrase);
                let picture = self.media.fetch(summary.image_url.as_deref()).await;

                info!(
                    position = summary.position,
                    title = %summary.title,
                    %date,
                    title_count = metrics.title_count,
                    description_count = metrics.description_count,
                    money = metrics.money_present,
                    "Collected article"
                );
                results.push(ArticleRecord::new(summary, date, metrics, picture));
            }
        };

        info!(count = results.len(), %stop, "Listing pass finished");
        RunReport { results, stop }
    }

    /// Collect and hand the results to `sink`.
    ///
    /// Whatever was collected is written, including after cancellation.
    pub async fn run<L: Listing, T: TabularSink>(
        &self,
        listing: &mut L,
        sink: &T,
    ) -> Result<RunReport, OutputError> {
        let report = self.collect(listing).await;
        sink.write(&report.results)?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexedSelectors;
    use crate::fetcher::PageFetcher;
    use crate::http::testing::ScriptedTransport;
    use crate::listing::IndexedListing;
    use crate::listing::indexed::tests::{five_card_page, now, query};
    use crate::media::DirectoryStore;
    use crate::models::ArticleSummary;
    use crate::retry::RetryPolicy;
    use crate::session::testing::ReplaySession;
    use std::cell::RefCell;
    use std::path::Path;
    use std::time::Duration;

    const ONE: &str = "https://cdn.example/img/one.jpg";
    const THREE: &str = "https://cdn.example/img/three.jpg";

    #[derive(Default)]
    struct MemorySink {
        written: RefCell<Option<Vec<String>>>,
    }

    impl TabularSink for MemorySink {
        fn write(&self, results: &ResultSet) -> Result<(), OutputError> {
            *self.written.borrow_mut() = Some(results.iter().map(|r| r.title().to_string()).collect());
            Ok(())
        }
    }

    /// Hands out fixed batches, then a fixed stop reason.
    struct FixedListing {
        batches: Vec<Vec<ArticleSummary>>,
        end: StopReason,
        halted: Option<StopReason>,
        pulls: usize,
    }

    impl FixedListing {
        fn new(batches: Vec<Vec<ArticleSummary>>, end: StopReason) -> Self {
            Self { batches, end, halted: None, pulls: 0 }
        }
    }

    impl Listing for FixedListing {
        async fn next_batch(&mut self) -> Step {
            self.pulls += 1;
            if let Some(reason) = self.halted {
                return Step::Exhausted(reason);
            }
            if self.batches.is_empty() {
                Step::Exhausted(self.end)
            } else {
                Step::Batch(self.batches.remove(0))
            }
        }

        fn halt(&mut self, reason: StopReason) {
            self.halted.get_or_insert(reason);
        }
    }

    fn summary(position: usize, title: &str, raw_date: &str) -> ArticleSummary {
        ArticleSummary {
            title: title.to_string(),
            description: "tech tech and $40".to_string(),
            raw_date: raw_date.to_string(),
            image_url: None,
            position,
        }
    }

    fn pipeline(
        transport: &ScriptedTransport,
        pictures: &Path,
        cancel: CancellationToken,
    ) -> ExtractionPipeline<ScriptedTransport, DirectoryStore> {
        let fetcher = PageFetcher::new(
            transport.clone(),
            RetryPolicy::new(3, Duration::ZERO),
            cancel.clone(),
        );
        ExtractionPipeline::new(
            "tech",
            DateResolver::new(now()),
            DateWindow::from_months(now(), 1),
            MediaFetcher::new(fetcher, DirectoryStore::new(pictures)),
            cancel,
        )
    }

    #[tokio::test]
    async fn test_indexed_pass_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let transport = ScriptedTransport::new();
        transport.ok(ONE, b"one").ok(THREE, b"three");
        let cancel = CancellationToken::new();
        let mut listing = IndexedListing::new(
            five_card_page(),
            query(),
            IndexedSelectors::default(),
            DateResolver::new(now()),
            DateWindow::from_months(now(), 1),
            cancel.clone(),
        );
        let sink = MemorySink::default();

        let report = pipeline(&transport, dir.path(), cancel)
            .run(&mut listing, &sink)
            .await
            .unwrap();

        assert_eq!(report.stop, StopReason::CutoffReached);
        let records: Vec<&ArticleRecord> = report.results.iter().collect();
        assert_eq!(records.len(), 3);

        assert_eq!(records[0].title(), "Tech stocks rally");
        assert_eq!(records[0].title_count(), 1);
        assert_eq!(records[0].description_count(), 1);
        assert!(records[0].money_present());
        assert_eq!(records[0].picture_filename(), "one.jpg");
        assert_eq!(records[0].date(), now() - chrono::Duration::hours(3));

        assert_eq!(records[1].title(), "Rain expected");
        assert_eq!(records[1].title_count(), 0);
        assert!(!records[1].money_present());
        assert_eq!(records[1].picture_filename(), "");

        assert_eq!(records[2].title(), "TECH layoffs");
        assert_eq!(records[2].title_count(), 1);
        assert_eq!(records[2].description_count(), 1);
        assert!(records[2].money_present());
        assert_eq!(records[2].picture_filename(), "three.jpg");

        assert_eq!(std::fs::read(dir.path().join("one.jpg")).unwrap(), b"one");
        assert_eq!(std::fs::read(dir.path().join("three.jpg")).unwrap(), b"three");
        assert_eq!(
            sink.written.borrow().as_deref(),
            Some(&["Tech stocks rally".to_string(), "Rain expected".to_string(), "TECH layoffs".to_string()][..])
        );
        assert!(!listing.into_session().touched("[5]"));
    }

    #[tokio::test]
    async fn test_undatable_summary_halts_listing() {
        let dir = tempfile::tempdir().unwrap();
        let transport = ScriptedTransport::new();
        let mut listing = FixedListing::new(
            vec![
                vec![summary(1, "First", "1 hour ago"), summary(2, "Second", "whenever"), summary(3, "Third", "2 hours ago")],
                vec![summary(4, "Fourth", "3 hours ago")],
            ],
            StopReason::SourceExhausted,
        );

        let report = pipeline(&transport, dir.path(), CancellationToken::new())
            .collect(&mut listing)
            .await;

        assert_eq!(report.stop, StopReason::DateUnresolved);
        let titles: Vec<&str> = report.results.iter().map(|r| r.title()).collect();
        assert_eq!(titles, vec!["First"]);
        assert_eq!(report.results.iter().next().unwrap().description_count(), 2);
    }

    #[tokio::test]
    async fn test_out_of_window_summaries_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let transport = ScriptedTransport::new();
        let mut listing = FixedListing::new(
            vec![vec![summary(1, "Old", "January 5, 2024"), summary(2, "New", "March 19, 2024")]],
            StopReason::SourceExhausted,
        );

        let report = pipeline(&transport, dir.path(), CancellationToken::new())
            .collect(&mut listing)
            .await;

        assert_eq!(report.stop, StopReason::SourceExhausted);
        let titles: Vec<&str> = report.results.iter().map(|r| r.title()).collect();
        assert_eq!(titles, vec!["New"]);
    }

    #[tokio::test]
    async fn test_cancelled_run_still_writes_partial_results() {
        let dir = tempfile::tempdir().unwrap();
        let transport = ScriptedTransport::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut listing = FixedListing::new(vec![vec![summary(1, "Never", "1 hour ago")]], StopReason::SourceExhausted);
        let sink = MemorySink::default();

        let report = pipeline(&transport, dir.path(), cancel)
            .run(&mut listing, &sink)
            .await
            .unwrap();

        assert_eq!(report.stop, StopReason::Cancelled);
        assert!(report.results.is_empty());
        assert_eq!(listing.pulls, 1);
        assert_eq!(sink.written.borrow().as_deref(), Some(&[][..]));
    }

    #[tokio::test]
    async fn test_empty_listing_yields_empty_results() {
        let dir = tempfile::tempdir().unwrap();
        let transport = ScriptedTransport::new();
        let mut listing = IndexedListing::new(
            ReplaySession::new(),
            query(),
            IndexedSelectors::default(),
            DateResolver::new(now()),
            DateWindow::from_months(now(), 1),
            CancellationToken::new(),
        );

        let report = pipeline(&transport, dir.path(), CancellationToken::new())
            .collect(&mut listing)
            .await;

        assert_eq!(report.stop, StopReason::SourceExhausted);
        assert!(report.results.is_empty());
        assert_eq!(transport.total_calls(), 0);
    }
}
