//! Page fetching with bounded retry.

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::error::NetworkError;
use crate::http::HttpTransport;
use crate::retry::{Cancelled, RetryPolicy};
use crate::utils::truncate_for_log;

/// Result of a network operation: the payload or why there is none.
pub type FetchOutcome<T> = Result<T, NetworkError>;

impl From<Cancelled> for NetworkError {
    fn from(_: Cancelled) -> Self {
        NetworkError::Cancelled
    }
}

/// GETs pages through an [`HttpTransport`] under a [`RetryPolicy`].
///
/// Bad statuses and transport failures both consume an attempt; they only
/// differ in what gets logged.
#[derive(Debug, Clone)]
pub struct PageFetcher<H> {
    transport: H,
    policy: RetryPolicy,
    cancel: CancellationToken,
}

impl<H: HttpTransport> PageFetcher<H> {
    pub fn new(transport: H, policy: RetryPolicy, cancel: CancellationToken) -> Self {
        Self {
            transport,
            policy,
            cancel,
        }
    }

    /// Fetch `url`, returning the body of the first successful response.
    #[instrument(level = "info", skip(self))]
    pub async fn fetch_bytes(&self, url: &str) -> FetchOutcome<Vec<u8>> {
        let outcome = self
            .policy
            .run(&self.cancel, |e| *e != NetworkError::Cancelled, |attempt| async move {
                match self.transport.get(url).await {
                    Ok(response) if response.is_success() => Ok(response.body),
                    Ok(response) => {
                        warn!(
                            attempt,
                            status = response.status,
                            %url,
                            body_preview = %truncate_for_log(&String::from_utf8_lossy(&response.body), 200),
                            "Failed to get response"
                        );
                        Err(NetworkError::Status(response.status))
                    }
                    Err(e) => {
                        warn!(attempt, error = %e, %url, "Request failed");
                        Err(e)
                    }
                }
            })
            .await;

        match &outcome {
            Ok(body) => info!(bytes = body.len(), "Fetched"),
            Err(e) => warn!(error = %e, "Giving up on URL"),
        }
        outcome
    }

    /// Fetch `url` as text, replacing invalid UTF-8.
    pub async fn fetch_text(&self, url: &str) -> FetchOutcome<String> {
        self.fetch_bytes(url)
            .await
            .map(|body| String::from_utf8_lossy(&body).into_owned())
    }
}
