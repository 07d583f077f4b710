//! Article picture download and storage.
//!
//! A picture that cannot be fetched or saved never fails the article: the
//! record is kept with an empty picture filename.

use std::io;
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::fetcher::PageFetcher;
use crate::http::HttpTransport;

/// Somewhere to put downloaded pictures.
pub trait MediaStore {
    /// Persist `bytes` as `name`, returning where they landed.
    async fn save(&self, name: &str, bytes: &[u8]) -> io::Result<PathBuf>;
}

/// Stores pictures as files in one directory, created on first use.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl MediaStore for DirectoryStore {
    async fn save(&self, name: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.root).await?;
        let path = self.root.join(name);
        fs::write(&path, bytes).await?;
        Ok(path)
    }
}

/// Downloads pictures through a [`PageFetcher`] into a [`MediaStore`].
#[derive(Debug, Clone)]
pub struct MediaFetcher<H, S> {
    fetcher: PageFetcher<H>,
    store: S,
}

impl<H: HttpTransport, S: MediaStore> MediaFetcher<H, S> {
    pub fn new(fetcher: PageFetcher<H>, store: S) -> Self {
        Self { fetcher, store }
    }

    /// Download and store the picture at `url`.
    ///
    /// Returns the stored filename, or an empty string when there is no URL
    /// or anything along the way fails.
    #[instrument(level = "info", skip(self))]
    pub async fn fetch(&self, url: Option<&str>) -> String {
        let Some(url) = url else {
            debug!("No picture for this article");
            return String::new();
        };

        let Some(filename) = filename_from_url(url) else {
            warn!(%url, "Picture URL has no usable file name");
            return String::new();
        };

        let bytes = match self.fetcher.fetch_bytes(url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(%url, error = %e, "Failed to download picture");
                return String::new();
            }
        };

        match self.store.save(&filename, &bytes).await {
            Ok(path) => {
                info!(path = %path.display(), bytes = bytes.len(), "Saved picture");
                filename
            }
            Err(e) => {
                warn!(%filename, error = %e, "Failed to save picture");
                String::new()
            }
        }
    }
}

/// Last non-empty segment of the URL path, percent-decoded, e.g.
/// `photo.jpg` for `https://cdn.example/img/photo.jpg?w=600`.
///
/// A segment that decodes into something with a path separator is refused.
pub fn filename_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let segment = parsed
        .path_segments()?
        .filter(|segment| !segment.is_empty())
        .last()?;
    let name = urlencoding::decode(segment).ok()?.into_owned();
    if name.contains(['/', '\\']) || name == ".." {
        return None;
    }
    Some(name)
}
