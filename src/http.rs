//! HTTP transport capability.
//!
//! The pipeline only needs "GET a URL, give me status and bytes". Keeping
//! that behind [`HttpTransport`] lets tests script responses without a
//! server.

use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::error::NetworkError;

const USER_AGENT: &str = "Mozilla/5.0 (compatible; news_harvest/0.1)";

/// Raw response of a completed request, whatever its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs GET requests.
///
/// An `Err` means no response arrived (DNS, TLS, timeout, reset). A
/// response with a failing status is still `Ok`.
pub trait HttpTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse, NetworkError>;
}

/// [`HttpTransport`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Self {
        Self::with_user_agent(timeout, USER_AGENT)
    }

    /// Falls back to reqwest's defaults, with a warning, if the configured
    /// client cannot be built.
    pub fn with_user_agent(timeout: Duration, user_agent: &str) -> Self {
        let client = match Client::builder().timeout(timeout).user_agent(user_agent).build() {
            Ok(client) => client,
            Err(e) => {
                warn!(error = %e, ?timeout, "Failed to build configured HTTP client; using defaults");
                Client::new()
            }
        };
        Self { client }
    }
}

impl HttpTransport for ReqwestTransport {
    #[instrument(level = "debug", skip(self))]
    async fn get(&self, url: &str) -> Result<HttpResponse, NetworkError> {
        let response = self.client.get(url).send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(classify)?.to_vec();
        debug!(status, bytes = body.len(), "response received");
        Ok(HttpResponse { status, body })
    }
}

fn classify(e: reqwest::Error) -> NetworkError {
    if e.is_timeout() {
        NetworkError::Timeout
    } else {
        NetworkError::Transport(e.to_string())
    }
}
