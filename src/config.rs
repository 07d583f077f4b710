//! Run settings.
//!
//! Settings come from three layers, later ones winning:
//!
//! 1. built-in defaults ([`Settings::default`])
//! 2. an optional YAML file (`--config`)
//! 3. command-line flags and their environment variables ([`crate::cli::Cli`])
//!
//! ```yaml
//! search_phrase: technology
//! news_category: Science
//! num_months: 2
//! strategy: indexed
//! retry:
//!   attempts: 3
//!   delay_ms: 2000
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, instrument};

use crate::cli::Cli;
use crate::error::ConfigError;
use crate::retry::RetryPolicy;

/// How result items are discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ListingStrategy {
    /// Walk the search results page item by item in a browser.
    Indexed,
    /// Scan monthly archive pages over plain HTTP.
    Archive,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub search_phrase: String,
    pub news_category: Option<String>,
    pub num_months: u32,
    pub strategy: ListingStrategy,
    /// Page holding the search box, for the indexed strategy.
    pub listing_url: String,
    /// Root of the `/{YYYY}/{MM}` archive pages, for the archive strategy.
    pub archive_url: String,
    pub output_file: PathBuf,
    pub picture_dir: PathBuf,
    pub http_timeout_secs: u64,
    pub retry: RetrySettings,
    pub browser: BrowserSettings,
    pub indexed: IndexedSelectors,
    pub archive: ArchiveSelectors,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            search_phrase: String::new(),
            news_category: None,
            num_months: 1,
            strategy: ListingStrategy::Archive,
            listing_url: "https://apnews.com/".to_string(),
            archive_url: "https://apnews.com".to_string(),
            output_file: PathBuf::from("results/ap_news.xlsx"),
            picture_dir: PathBuf::from("data/news_pictures"),
            http_timeout_secs: 30,
            retry: RetrySettings::default(),
            browser: BrowserSettings::default(),
            indexed: IndexedSelectors::default(),
            archive: ArchiveSelectors::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RetrySettings {
    pub attempts: u32,
    pub delay_ms: u64,
    pub jitter_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay_ms: 2000,
            jitter_ms: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BrowserSettings {
    pub headless: bool,
    pub sandbox: bool,
    pub width: u32,
    pub height: u32,
    pub chrome_path: Option<String>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            sandbox: true,
            width: 1920,
            height: 1080,
            chrome_path: None,
        }
    }
}

/// XPath selectors for the search results page.
///
/// Item selectors contain an `{i}` placeholder for the 1-based result
/// position; `category_filter` contains `{category}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct IndexedSelectors {
    pub search_field: String,
    pub category_filter: String,
    pub sort_control: String,
    pub result_link: String,
    pub excerpt: String,
    pub picture: String,
    pub item_wait_secs: u64,
    pub category_wait_secs: u64,
    pub sort_wait_secs: u64,
}

impl Default for IndexedSelectors {
    fn default() -> Self {
        Self {
            search_field: "//input[@id='search-input']".to_string(),
            category_filter: "//span[text()='{category}']".to_string(),
            sort_control: "//select[@id='search-sort-option']".to_string(),
            result_link: "(//a[@class='u-clickable-card__link'])[{i}]".to_string(),
            excerpt: "(//div[@class='gc__excerpt']//p)[{i}]".to_string(),
            picture: "(//a[@class='u-clickable-card__link'])[{i}]/ancestor::article//div[@class='gc__card__media']//img"
                .to_string(),
            item_wait_secs: 10,
            category_wait_secs: 30,
            sort_wait_secs: 10,
        }
    }
}

impl IndexedSelectors {
    /// Fill the `{i}` placeholder of an item selector.
    #[cfg(any(test, feature = "browser"))]
    pub fn item(template: &str, index: usize) -> String {
        template.replace("{i}", &index.to_string())
    }
}

/// CSS selectors for monthly archive pages and the articles they link to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ArchiveSelectors {
    pub headline: String,
    pub title: String,
    pub date: String,
    pub description: String,
    pub image: String,
}

impl Default for ArchiveSelectors {
    fn default() -> Self {
        Self {
            headline: "[class*='Component-headline']".to_string(),
            title: "h1".to_string(),
            date: "[class*='Timestamp__date'], .Page-dateModified, time".to_string(),
            description: "[class*='Article__content--prolog'], .Page-lead, .RichTextStoryBody p".to_string(),
            image: "[class*='Image__image'], .Page-lead img, picture img".to_string(),
        }
    }
}

impl Settings {
    /// Defaults, overlaid with the YAML file at `path` when given.
    #[instrument(level = "info")]
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        let settings = Self::from_yaml(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })?;
        info!(%path, "Loaded configuration file");
        Ok(settings)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(raw)
    }

    /// Overlay command-line values that were actually given.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(ref phrase) = cli.search_phrase {
            self.search_phrase = phrase.clone();
        }
        if let Some(ref category) = cli.news_category {
            self.news_category = Some(category.clone());
        }
        if let Some(months) = cli.num_months {
            self.num_months = months;
        }
        if let Some(strategy) = cli.strategy {
            self.strategy = strategy;
        }
        if let Some(ref url) = cli.listing_url {
            self.listing_url = url.clone();
        }
        if let Some(ref url) = cli.archive_url {
            self.archive_url = url.clone();
        }
        if let Some(ref path) = cli.output {
            self.output_file = path.clone();
        }
        if let Some(ref dir) = cli.picture_dir {
            self.picture_dir = dir.clone();
        }
        if let Some(attempts) = cli.retry_attempts {
            self.retry.attempts = attempts;
        }
        if let Some(delay) = cli.retry_delay_ms {
            self.retry.delay_ms = delay;
        }
        if cli.headful {
            self.browser.headless = false;
        }
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        self.search_phrase = self.search_phrase.trim().to_string();
        if self.search_phrase.is_empty() {
            return Err(ConfigError::EmptySearchPhrase);
        }
        if self.retry.attempts == 0 {
            return Err(ConfigError::NoRetryAttempts);
        }
        // An empty category from the environment means "no category".
        if self
            .news_category
            .as_deref()
            .is_some_and(|c| c.trim().is_empty())
        {
            self.news_category = None;
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry.attempts, Duration::from_millis(self.retry.delay_ms))
            .with_jitter(Duration::from_millis(self.retry.jitter_ms))
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.num_months, 1);
        assert_eq!(settings.strategy, ListingStrategy::Archive);
        assert_eq!(settings.output_file, PathBuf::from("results/ap_news.xlsx"));
        assert_eq!(settings.picture_dir, PathBuf::from("data/news_pictures"));
        assert_eq!(settings.retry_policy(), RetryPolicy::default());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let settings = Settings::from_yaml(
            "search_phrase: technology\nstrategy: indexed\nretry:\n  delay_ms: 10\n",
        )
        .unwrap();
        assert_eq!(settings.search_phrase, "technology");
        assert_eq!(settings.strategy, ListingStrategy::Indexed);
        assert_eq!(settings.retry.delay_ms, 10);
        assert_eq!(settings.retry.attempts, 3);
        assert_eq!(settings.indexed, IndexedSelectors::default());
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut settings = Settings::from_yaml("search_phrase: technology\nnum_months: 6\n").unwrap();
        // Built directly so scheduler variables in the environment cannot leak in.
        let cli = Cli {
            search_phrase: Some("climate".to_string()),
            news_category: None,
            num_months: None,
            strategy: None,
            listing_url: None,
            archive_url: None,
            output: None,
            picture_dir: None,
            retry_attempts: Some(5),
            retry_delay_ms: None,
            headful: false,
            config: None,
        };
        settings.apply_cli(&cli);

        assert_eq!(settings.search_phrase, "climate");
        assert_eq!(settings.num_months, 6);
        assert_eq!(settings.retry.attempts, 5);
        assert_eq!(settings.news_category, None);
    }

    #[test]
    fn test_validate() {
        let mut settings = Settings::default();
        assert!(matches!(settings.validate(), Err(ConfigError::EmptySearchPhrase)));

        settings.search_phrase = "  tech ".to_string();
        settings.news_category = Some(" ".to_string());
        settings.validate().unwrap();
        assert_eq!(settings.search_phrase, "tech");
        assert_eq!(settings.news_category, None);

        settings.retry.attempts = 0;
        assert!(matches!(settings.validate(), Err(ConfigError::NoRetryAttempts)));
    }

    #[test]
    fn test_item_selector_template() {
        assert_eq!(
            IndexedSelectors::item("(//a[@class='card'])[{i}]", 4),
            "(//a[@class='card'])[4]"
        );
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = Settings::load(Some("/definitely/not/here.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
