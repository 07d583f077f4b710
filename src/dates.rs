//! Date resolution and the recency window.
//!
//! Listings publish dates either as elapsed time ("3 hours ago") or as a
//! calendar date in one of several house styles ("Jan. 5, 2024",
//! "5 Jan 2024", "2024-01-05T10:00:00Z"). [`DateResolver`] turns both into a
//! local wall-clock [`NaiveDateTime`] relative to a fixed "now" captured once
//! per run, so every item in a run is judged against the same instant.

use chrono::{DateTime, Datelike, Days, Duration, Local, Months, NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::DateParseError;

static RELATIVE_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(\d+)\s+([a-z]+)\s+ago$").expect("relative date regex"));

static LEADING_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:(?:published|updated|posted)\s*(?:on)?|on)\s*:?\s*").expect("label regex")
});

static TRAILING_ZONE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s+(?:et|est|edt|gmt|utc)$").expect("zone regex"));

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%B %d, %Y %I:%M %p",
    "%B %d, %Y, %I:%M %p",
    "%B %d, %Y %H:%M",
    "%d %B %Y %H:%M",
    "%d %B %Y %I:%M %p",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%B %d, %Y",
    "%B %d %Y",
    "%d %B %Y",
    "%m/%d/%Y",
    "%Y/%m/%d",
];

/// Resolves raw date tokens against a fixed reference instant.
#[derive(Debug, Clone, Copy)]
pub struct DateResolver {
    now: NaiveDateTime,
}

impl DateResolver {
    pub fn new(now: NaiveDateTime) -> Self {
        Self { now }
    }

    /// A resolver anchored at the current local wall-clock time.
    pub fn now_local() -> Self {
        Self::new(Local::now().naive_local())
    }

    pub fn now(&self) -> NaiveDateTime {
        self.now
    }

    /// Convert a raw listing date into an absolute timestamp.
    ///
    /// Relative tokens of the form `<n> <unit> ago` are subtracted from the
    /// reference instant; `unit` is minute, hour or day in any case, singular
    /// or plural. Anything else goes through the calendar formats.
    ///
    /// # Errors
    ///
    /// * [`DateParseError::Empty`] for blank input
    /// * [`DateParseError::UnknownUnit`] for a relative token with another unit
    /// * [`DateParseError::Unrecognized`] when no format matches
    pub fn resolve(&self, raw: &str) -> Result<NaiveDateTime, DateParseError> {
        // Portals hyphenate long words with soft hyphens ("min\u{ad}utes").
        let cleaned = raw.replace('\u{ad}', "");
        let cleaned = LEADING_LABEL.replace(cleaned.trim(), "");
        let cleaned = cleaned.trim();
        if cleaned.is_empty() {
            return Err(DateParseError::Empty);
        }

        if let Some(caps) = RELATIVE_DATE.captures(cleaned) {
            let unit = caps[2].to_lowercase();
            let amount: i64 = caps[1]
                .parse()
                .map_err(|_| DateParseError::Unrecognized(raw.to_string()))?;
            let delta = match unit.as_str() {
                "minute" | "minutes" => Duration::try_minutes(amount),
                "hour" | "hours" => Duration::try_hours(amount),
                "day" | "days" => Duration::try_days(amount),
                _ => {
                    return Err(DateParseError::UnknownUnit {
                        raw: raw.to_string(),
                        unit,
                    });
                }
            };
            return delta
                .and_then(|d| self.now.checked_sub_signed(d))
                .ok_or_else(|| DateParseError::Unrecognized(raw.to_string()));
        }

        parse_absolute(cleaned).ok_or_else(|| DateParseError::Unrecognized(raw.to_string()))
    }
}

/// Permissive calendar parser for the styles news portals print.
fn parse_absolute(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Local).naive_local());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Local).naive_local());
    }

    let s = LEADING_LABEL.replace(s, "");
    let s = TRAILING_ZONE.replace(&s, "");
    // "Jan. 5" and "Sept. 5" are AP style; chrono wants "Jan 5" and "Sep 5".
    let s = s.replace("Sept.", "Sep").replace("Sept ", "Sep ").replace(". ", " ");
    let s = s.trim();

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

/// Inclusive lower bound on article dates for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    start: NaiveDateTime,
}

impl DateWindow {
    /// Build the window for `num_months` months back from `now`.
    ///
    /// Zero and one both mean "this month so far"; each further month moves
    /// the start back by one calendar month, always landing on the first day
    /// at midnight.
    pub fn from_months(now: NaiveDateTime, num_months: u32) -> Self {
        let back = num_months.saturating_sub(1);
        let start = first_of_month(now.date())
            .checked_sub_months(Months::new(back))
            .unwrap_or(NaiveDate::MIN)
            .and_time(NaiveTime::MIN);
        Self { start }
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        ts >= self.start
    }
}

/// First-of-month dates for the archive walk, newest first.
///
/// Always yields at least the current month.
pub fn archive_months(today: NaiveDate, num_months: u32) -> Vec<NaiveDate> {
    let first = first_of_month(today);
    (0..num_months.max(1))
        .map_while(|back| first.checked_sub_months(Months::new(back)))
        .collect()
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.day0()))
}
