//! Data models flowing through the extraction pipeline.
//!
//! - [`ArticleSummary`]: raw item as read off a listing, not yet validated
//! - [`ArticleRecord`]: validated row destined for the spreadsheet
//! - [`ResultSet`]: ordered rows for one run

use chrono::NaiveDateTime;

use crate::content::ContentMetrics;

/// A raw listing item.
///
/// Summaries are discarded once they are turned into an [`ArticleRecord`]
/// or rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleSummary {
    pub title: String,
    pub description: String,
    /// The date exactly as printed by the portal, e.g. "3 hours ago".
    pub raw_date: String,
    pub image_url: Option<String>,
    /// 1-based position in the listing.
    pub position: usize,
}

/// A validated output row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleRecord {
    title: String,
    date: NaiveDateTime,
    description: String,
    title_count: usize,
    description_count: usize,
    money_present: bool,
    picture_filename: String,
}

impl ArticleRecord {
    /// Assemble a record from a summary, its resolved date, text metrics and
    /// the saved picture name (empty when no picture was stored).
    pub fn new(
        summary: ArticleSummary,
        date: NaiveDateTime,
        metrics: ContentMetrics,
        picture_filename: String,
    ) -> Self {
        Self {
            title: summary.title,
            date,
            description: summary.description,
            title_count: metrics.title_count,
            description_count: metrics.description_count,
            money_present: metrics.money_present,
            picture_filename,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn date(&self) -> NaiveDateTime {
        self.date
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn title_count(&self) -> usize {
        self.title_count
    }

    pub fn description_count(&self) -> usize {
        self.description_count
    }

    pub fn money_present(&self) -> bool {
        self.money_present
    }

    /// Empty when the picture was absent or could not be downloaded.
    pub fn picture_filename(&self) -> &str {
        &self.picture_filename
    }
}

/// Records of one run in discovery order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResultSet {
    records: Vec<ArticleRecord>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: ArticleRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ArticleRecord> {
        self.records.iter()
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a ArticleRecord;
    type IntoIter = std::slice::Iter<'a, ArticleRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
