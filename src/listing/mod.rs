//! Result listings: where candidate articles come from.
//!
//! A [`Listing`] hands out batches of [`ArticleSummary`] until it reports
//! why it stopped. Two strategies exist, picked by configuration:
//!
//! | Strategy | Module | Source | Early exit on old dates |
//! |----------|--------|--------|-------------------------|
//! | Indexed | [`indexed`] | search results page in a browser, one card at a time | yes |
//! | Archive | [`archive`] | monthly archive pages over HTTP, one month at a time | no |
//!
//! Once a listing has stopped it keeps returning the same
//! [`Step::Exhausted`] reason.

use std::fmt;

use crate::models::ArticleSummary;

pub mod archive;
#[cfg(any(test, feature = "browser"))]
pub mod indexed;

pub use archive::ArchiveListing;
#[cfg(any(test, feature = "browser"))]
pub use indexed::IndexedListing;

/// Why pagination ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// No more items to read.
    SourceExhausted,
    /// An item older than the window start was reached.
    #[cfg_attr(not(feature = "browser"), allow(dead_code))]
    CutoffReached,
    /// An item was missing an expected field.
    ExtractionFailed,
    /// An item's date could not be resolved.
    DateUnresolved,
    Cancelled,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StopReason::SourceExhausted => "source exhausted",
            StopReason::CutoffReached => "cutoff date reached",
            StopReason::ExtractionFailed => "extraction failed",
            StopReason::DateUnresolved => "date could not be resolved",
            StopReason::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// One pagination step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// More items; may be empty when a page had nothing relevant.
    Batch(Vec<ArticleSummary>),
    Exhausted(StopReason),
}

/// Something that yields article summaries page by page.
pub trait Listing {
    async fn next_batch(&mut self) -> Step;

    /// Stop early; later calls return `Exhausted(reason)`.
    fn halt(&mut self, reason: StopReason);
}

/// Split a listing excerpt like `"3 hours ago ... Lawmakers voted"` into its
/// date and description parts at the first ellipsis.
#[cfg(any(test, feature = "browser"))]
pub fn split_excerpt(excerpt: &str) -> Option<(&str, &str)> {
    let ascii = excerpt.find("...").map(|at| (at, 3));
    let unicode = excerpt.find('\u{2026}').map(|at| (at, '\u{2026}'.len_utf8()));
    let (at, len) = match (ascii, unicode) {
        (Some(a), Some(u)) => {
            if a.0 <= u.0 {
                a
            } else {
                u
            }
        }
        (Some(a), None) => a,
        (None, Some(u)) => u,
        (None, None) => return None,
    };
    Some((excerpt[..at].trim(), excerpt[at + len..].trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_excerpt_at_first_delimiter() {
        assert_eq!(
            split_excerpt("3 hours ago ... Lawmakers voted... again"),
            Some(("3 hours ago", "Lawmakers voted... again"))
        );
        assert_eq!(
            split_excerpt("Jan 5, 2024 \u{2026} Markets fell"),
            Some(("Jan 5, 2024", "Markets fell"))
        );
        assert_eq!(split_excerpt("no delimiter here"), None);
    }

    #[test]
    fn test_stop_reason_display() {
        assert_eq!(StopReason::CutoffReached.to_string(), "cutoff date reached");
    }
}
