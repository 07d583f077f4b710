//! Command-line interface definitions for News Harvest.
//!
//! Every option may also come from the YAML config file; the search inputs
//! additionally read the environment variables a scheduler would set.

use clap::Parser;
use std::path::PathBuf;

use crate::config::ListingStrategy;

/// Command-line arguments.
///
/// # Examples
///
/// ```sh
/// # Search the last two months of Science news for "technology"
/// news_harvest -p technology --news-category Science -n 2
///
/// # Same, driving the search results page in Chrome
/// news_harvest -p technology -n 2 --strategy indexed
///
/// # Settings from a file, output elsewhere
/// news_harvest -c harvest.yaml -o /tmp/results.xlsx
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Phrase to search for and count in titles and descriptions
    #[arg(short = 'p', long, env = "SEARCH_PHRASE")]
    pub search_phrase: Option<String>,

    /// News category to restrict results to
    #[arg(long, env = "NEWS_CATEGORY")]
    pub news_category: Option<String>,

    /// Months of news to collect (0 and 1 both mean the current month)
    #[arg(short = 'n', long, env = "NUM_MONTHS")]
    pub num_months: Option<u32>,

    /// How to discover articles
    #[arg(short, long, value_enum)]
    pub strategy: Option<ListingStrategy>,

    /// Page holding the search box (indexed strategy)
    #[arg(long, env = "LISTING_URL")]
    pub listing_url: Option<String>,

    /// Root URL of the monthly archive (archive strategy)
    #[arg(long)]
    pub archive_url: Option<String>,

    /// Spreadsheet to write
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Directory for downloaded pictures
    #[arg(long)]
    pub picture_dir: Option<PathBuf>,

    /// Attempts per download before giving up
    #[arg(long)]
    pub retry_attempts: Option<u32>,

    /// Pause between attempts, in milliseconds
    #[arg(long)]
    pub retry_delay_ms: Option<u64>,

    /// Show the browser window instead of running headless
    #[arg(long)]
    pub headful: bool,

    /// Optional path to a YAML config file
    #[arg(short, long)]
    pub config: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from([
            "news_harvest",
            "--search-phrase",
            "technology",
            "--news-category",
            "Science",
            "--num-months",
            "2",
            "--strategy",
            "indexed",
        ]);

        assert_eq!(cli.search_phrase.as_deref(), Some("technology"));
        assert_eq!(cli.news_category.as_deref(), Some("Science"));
        assert_eq!(cli.num_months, Some(2));
        assert_eq!(cli.strategy, Some(ListingStrategy::Indexed));
        assert!(!cli.headful);
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from([
            "news_harvest",
            "-p",
            "climate",
            "-n",
            "3",
            "-s",
            "archive",
            "-o",
            "/tmp/out.xlsx",
            "-c",
            "harvest.yaml",
        ]);

        assert_eq!(cli.search_phrase.as_deref(), Some("climate"));
        assert_eq!(cli.num_months, Some(3));
        assert_eq!(cli.strategy, Some(ListingStrategy::Archive));
        assert_eq!(cli.output, Some(PathBuf::from("/tmp/out.xlsx")));
        assert_eq!(cli.config.as_deref(), Some("harvest.yaml"));
    }
}
