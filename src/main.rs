//! # News Harvest
//!
//! Collects recent news articles that match a search phrase, scores them
//! and saves them to a spreadsheet.
//!
//! ## Features
//!
//! - Two ways to discover articles: walking a search results page in a
//!   headless browser (`--strategy indexed`, needs the `browser` feature) or
//!   scanning monthly archive pages over plain HTTP (`--strategy archive`)
//! - Resolves relative ("3 hours ago") and absolute publication dates
//! - Counts search-phrase occurrences and detects money mentions
//! - Downloads each article's picture
//! - Writes one `.xlsx` row per article
//!
//! ## Usage
//!
//! ```sh
//! SEARCH_PHRASE=climate NUM_MONTHS=2 news_harvest -o results/ap_news.xlsx
//! ```
//!
//! ## Architecture
//!
//! 1. **Listing**: page through candidate articles until the source runs out
//!    or the dates fall outside the requested window
//! 2. **Extraction**: resolve dates, compute metrics, download pictures
//! 3. **Output**: write the spreadsheet, even after `Ctrl-C`

use clap::Parser;
use std::error::Error as StdError;
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod content;
mod dates;
mod error;
mod fetcher;
mod http;
mod listing;
mod media;
mod models;
mod outputs;
mod pipeline;
mod retry;
#[cfg(any(test, feature = "browser"))]
mod session;
mod utils;

use cli::Cli;
use config::{ListingStrategy, Settings};
use dates::{DateResolver, DateWindow, archive_months};
use error::ConfigError;
use fetcher::PageFetcher;
use http::ReqwestTransport;
use listing::ArchiveListing;
use media::{DirectoryStore, MediaFetcher};
use outputs::xlsx::XlsxSink;
use pipeline::{ExtractionPipeline, RunReport};
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn StdError>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("news_harvest starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(?args.strategy, ?args.config, ?args.output, "Parsed CLI arguments");

    let settings = match load_settings(&args) {
        Ok(settings) => settings,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };
    info!(
        phrase = %settings.search_phrase,
        category = ?settings.news_category,
        num_months = settings.num_months,
        strategy = ?settings.strategy,
        "Settings resolved"
    );

    // Early check: output locations must be writable before any scraping
    let output_dir = settings
        .output_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    for dir in [output_dir, settings.picture_dir.as_path()] {
        if let Err(e) = ensure_writable_dir(dir).await {
            error!(
                path = %dir.display(),
                error = %e,
                "Output directory is not writable (fix perms or choose a different path)"
            );
            return Err(e.into());
        }
    }

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted; saving what has been collected so far");
                cancel.cancel();
            }
        });
    }

    let report = match run(&settings, cancel).await {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "Run failed");
            return Err(e.into());
        }
    };

    info!(
        count = report.results.len(),
        stop = %report.stop,
        output = %settings.output_file.display(),
        elapsed_secs = start_time.elapsed().as_secs_f64(),
        "news_harvest finished"
    );
    Ok(())
}

/// Defaults < config file < CLI and environment, then validation.
fn load_settings(args: &Cli) -> Result<Settings, ConfigError> {
    let mut settings = Settings::load(args.config.as_deref())?;
    settings.apply_cli(args);
    settings.validate()?;
    if settings.strategy == ListingStrategy::Indexed && !cfg!(feature = "browser") {
        return Err(ConfigError::BrowserUnavailable);
    }
    Ok(settings)
}

#[instrument(level = "info", skip_all, fields(strategy = ?settings.strategy))]
async fn run(settings: &Settings, cancel: CancellationToken) -> error::Result<RunReport> {
    let resolver = DateResolver::now_local();
    let window = DateWindow::from_months(resolver.now(), settings.num_months);
    info!(window_start = %window.start(), "Collecting articles");

    let policy = settings.retry_policy();
    info!(attempts = policy.max_attempts(), delay = ?policy.delay(), "Retry policy");
    let fetcher = PageFetcher::new(
        ReqwestTransport::new(settings.http_timeout()),
        policy,
        cancel.clone(),
    );
    let media = MediaFetcher::new(fetcher.clone(), DirectoryStore::new(&settings.picture_dir));
    let pipeline = ExtractionPipeline::new(
        &settings.search_phrase,
        resolver,
        window,
        media,
        cancel.clone(),
    );
    let sink = XlsxSink::new(&settings.output_file);

    match settings.strategy {
        ListingStrategy::Archive => {
            let months = archive_months(resolver.now().date(), settings.num_months);
            let mut listing = ArchiveListing::new(
                fetcher,
                &settings.archive_url,
                &settings.search_phrase,
                settings.news_category.as_deref(),
                settings.archive.clone(),
                months,
                cancel,
            );
            Ok(pipeline.run(&mut listing, &sink).await?)
        }
        #[cfg(feature = "browser")]
        ListingStrategy::Indexed => {
            use listing::IndexedListing;
            use listing::indexed::SearchQuery;
            use session::BrowserSession;
            use session::chromium::ChromiumSession;

            let session = ChromiumSession::launch(&settings.browser).await?;
            let query = SearchQuery {
                listing_url: settings.listing_url.clone(),
                phrase: settings.search_phrase.clone(),
                category: settings.news_category.clone(),
            };
            let mut listing = IndexedListing::new(
                session,
                query,
                settings.indexed.clone(),
                resolver,
                window,
                cancel,
            );
            listing.prepare().await;
            let outcome = pipeline.run(&mut listing, &sink).await;

            let mut session = listing.into_session();
            if let Err(e) = session.close().await {
                warn!(error = %e, "Failed to close browser cleanly");
            }
            Ok(outcome?)
        }
        #[cfg(not(feature = "browser"))]
        ListingStrategy::Indexed => Err(ConfigError::BrowserUnavailable.into()),
    }
}
