//! Error taxonomy for the harvesting pipeline.
//!
//! Each external concern gets its own enum so call sites can decide how a
//! failure degrades the run:
//!
//! | Error | Raised by | Effect on the run |
//! |-------|-----------|-------------------|
//! | [`SessionError`] | browser session actions | step logged and skipped |
//! | [`NetworkError`] | HTTP fetches | retried, then the page or image is skipped |
//! | [`DateParseError`] | date resolution | current pagination pass ends |
//! | [`ExtractionError`] | missing listing fields | pagination treated as exhausted |
//! | [`OutputError`] | spreadsheet writing | fatal |
//! | [`ConfigError`] | settings validation | fatal |

use std::time::Duration;
use thiserror::Error;

/// A browser session action failed.
#[derive(Error, Debug)]
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
pub enum SessionError {
    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("timed out after {timeout:?} waiting for {selector}")]
    Timeout { selector: String, timeout: Duration },

    #[error("action on {selector} failed: {reason}")]
    Action { selector: String, reason: String },

    #[error("session is closed")]
    Closed,
}

/// Why a network operation produced no payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("request timed out")]
    Timeout,

    #[error("non-success status {0}")]
    Status(u16),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("cancelled")]
    Cancelled,
}

/// A raw date token could not be turned into a timestamp.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DateParseError {
    #[error("empty date string")]
    Empty,

    #[error("unknown time unit {unit:?} in {raw:?}")]
    UnknownUnit { raw: String, unit: String },

    #[error("unrecognized date {0:?}")]
    Unrecognized(String),
}

/// An expected field was missing from a listing item or article page.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[cfg_attr(not(feature = "browser"), allow(dead_code))]
    #[error("item {index}: excerpt has no date delimiter: {excerpt:?}")]
    MissingDelimiter { index: usize, excerpt: String },

    #[error("item {index}: missing {field}")]
    MissingField { index: usize, field: &'static str },

    #[error("invalid selector {selector:?}: {reason}")]
    Selector { selector: String, reason: String },

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Writing the results spreadsheet failed.
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("spreadsheet error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

/// Settings could not be loaded or are invalid.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("search phrase must not be empty")]
    EmptySearchPhrase,

    #[error("retry attempts must be at least 1")]
    NoRetryAttempts,

    #[error("the indexed listing strategy needs the `browser` feature")]
    BrowserUnavailable,
}

/// Top-level error surfaced by `main`.
#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("session error: {0}")]
    Session(#[from] SessionError),

    #[error("output error: {0}")]
    Output(#[from] OutputError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
