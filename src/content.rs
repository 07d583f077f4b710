//! Phrase counting and money detection on article text.

use once_cell::sync::Lazy;
use regex::Regex;

/// `$` glued to a token, digits followed by "dollars", or digits followed by "USD".
static MONEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\$\S|\d+\s*dollars|\d+\s*usd").expect("money regex"));

/// Text metrics attached to every extracted article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContentMetrics {
    pub title_count: usize,
    pub description_count: usize,
    pub money_present: bool,
}

impl ContentMetrics {
    pub fn compute(title: &str, description: &str, phrase: &str) -> Self {
        Self {
            title_count: count_phrase(title, phrase),
            description_count: count_phrase(description, phrase),
            money_present: mentions_money(title) || mentions_money(description),
        }
    }
}

/// Case-insensitive, non-overlapping occurrences of `phrase` in `text`.
pub fn count_phrase(text: &str, phrase: &str) -> usize {
    if phrase.is_empty() {
        return 0;
    }
    text.to_lowercase().matches(&phrase.to_lowercase()).count()
}

pub fn mentions_money(text: &str) -> bool {
    MONEY.is_match(text)
}
