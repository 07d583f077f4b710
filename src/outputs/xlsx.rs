//! Excel workbook output.
//!
//! One worksheet, a bold header row, then one row per article. Dates are
//! written as real Excel datetimes, counts as numbers and the money flag as
//! a boolean so the sheet sorts and filters properly.

use rust_xlsxwriter::{Format, Workbook};
use std::borrow::Cow;
use std::path::PathBuf;
use tracing::{info, instrument, warn};

use super::{COLUMNS, TabularSink};
use crate::error::OutputError;
use crate::models::ResultSet;

const DATE_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";

/// Longest string Excel accepts in one cell, in characters.
const MAX_CELL_CHARS: usize = 32_767;

#[derive(Debug, Clone)]
pub struct XlsxSink {
    path: PathBuf,
}

impl XlsxSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TabularSink for XlsxSink {
    #[instrument(level = "info", skip_all, fields(path = %self.path.display(), rows = results.len()))]
    fn write(&self, results: &ResultSet) -> Result<(), OutputError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        let header = Format::new().set_bold();
        let date = Format::new().set_num_format(DATE_FORMAT);

        for (col, name) in COLUMNS.iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, *name, &header)?;
        }

        for (i, record) in results.iter().enumerate() {
            let row = (i + 1) as u32;
            sheet.write_string(row, 0, cell_text(record.title()))?;
            sheet.write_datetime_with_format(row, 1, &record.date(), &date)?;
            sheet.write_string(row, 2, cell_text(record.description()))?;
            sheet.write_number(row, 3, record.title_count() as f64)?;
            sheet.write_number(row, 4, record.description_count() as f64)?;
            sheet.write_boolean(row, 5, record.money_present())?;
            sheet.write_string(row, 6, cell_text(record.picture_filename()))?;
        }
        sheet.autofit();

        workbook.save(&self.path)?;
        info!("Data saved");
        Ok(())
    }
}

/// Cut `text` to what fits in a cell; a too-long value would fail the
/// whole workbook.
fn cell_text(text: &str) -> Cow<'_, str> {
    match text.char_indices().nth(MAX_CELL_CHARS) {
        None => Cow::Borrowed(text),
        Some((end, _)) => {
            warn!(chars = text.chars().count(), "Cell text too long for Excel; truncating");
            Cow::Owned(text[..end].to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentMetrics;
    use crate::models::{ArticleRecord, ArticleSummary};
    use calamine::{Data, Reader, Xlsx, open_workbook};
    use chrono::NaiveDate;
    use std::path::Path;

    fn record(title: &str, money: bool, picture: &str) -> ArticleRecord {
        let summary = ArticleSummary {
            title: title.to_string(),
            description: format!("About {title}"),
            raw_date: "2 hours ago".to_string(),
            image_url: None,
            position: 1,
        };
        let date = NaiveDate::from_ymd_opt(2024, 3, 20)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let metrics = ContentMetrics {
            title_count: 1,
            description_count: 2,
            money_present: money,
        };
        ArticleRecord::new(summary, date, metrics, picture.to_string())
    }

    fn read_rows(path: &Path) -> Vec<Vec<Data>> {
        let mut workbook: Xlsx<_> = open_workbook(path).unwrap();
        let range = workbook.worksheet_range_at(0).unwrap().unwrap();
        range.rows().map(|row| row.to_vec()).collect()
    }

    #[test]
    fn test_header_and_one_row_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results").join("ap_news.xlsx");
        let mut results = ResultSet::new();
        results.push(record("Tech one", true, "one.jpg"));
        results.push(record("Tech two", false, "two.jpg"));

        XlsxSink::new(&path).write(&results).unwrap();

        let rows = read_rows(&path);
        assert_eq!(rows.len(), results.len() + 1);
        let header: Vec<String> = rows[0].iter().map(|c| c.to_string()).collect();
        assert_eq!(header, COLUMNS);

        assert_eq!(rows[1][0], Data::String("Tech one".to_string()));
        assert!(matches!(rows[1][1], Data::DateTime(_) | Data::Float(_)));
        assert_eq!(rows[1][2], Data::String("About Tech one".to_string()));
        assert_eq!(rows[1][3], Data::Float(1.0));
        assert_eq!(rows[1][4], Data::Float(2.0));
        assert_eq!(rows[1][5], Data::Bool(true));
        assert_eq!(rows[1][6], Data::String("one.jpg".to_string()));
        assert_eq!(rows[2][0], Data::String("Tech two".to_string()));
        assert_eq!(rows[2][5], Data::Bool(false));
    }

    #[test]
    fn test_empty_result_set_writes_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.xlsx");

        XlsxSink::new(&path).write(&ResultSet::new()).unwrap();

        let rows = read_rows(&path);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].len(), COLUMNS.len());
    }

    #[test]
    fn test_oversized_text_is_truncated_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("long.xlsx");
        let mut results = ResultSet::new();
        results.push(record(&"é".repeat(40_000), false, ""));
        results.push(record("Tech after", false, ""));

        XlsxSink::new(&path).write(&results).unwrap();

        let rows = read_rows(&path);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1][0].to_string().chars().count(), MAX_CELL_CHARS);
        assert_eq!(rows[2][0], Data::String("Tech after".to_string()));
    }

    #[test]
    fn test_cell_text_keeps_short_text() {
        assert!(matches!(cell_text("short"), Cow::Borrowed("short")));
        assert_eq!(cell_text(&"a".repeat(MAX_CELL_CHARS)).len(), MAX_CELL_CHARS);
    }
}
