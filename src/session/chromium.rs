//! Chrome DevTools implementation of [`BrowserSession`].

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::Page;
use futures::StreamExt;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep, timeout};
use tracing::{debug, info, instrument, warn};

use super::BrowserSession;
use crate::config::BrowserSettings;
use crate::error::SessionError;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// A launched Chrome with a single working page.
pub struct ChromiumSession {
    browser: Browser,
    handler: JoinHandle<()>,
    page: Option<Page>,
}

impl ChromiumSession {
    #[instrument(level = "info", skip_all, fields(headless = settings.headless))]
    pub async fn launch(settings: &BrowserSettings) -> Result<Self, SessionError> {
        let mut builder = BrowserConfig::builder().window_size(settings.width, settings.height);
        if !settings.headless {
            builder = builder.with_head();
        }
        if !settings.sandbox {
            builder = builder.arg("--no-sandbox");
        }
        if let Some(ref path) = settings.chrome_path {
            builder = builder.chrome_executable(path);
        }
        let config = builder.build().map_err(SessionError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| SessionError::Launch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    warn!("Browser handler event error");
                    break;
                }
            }
            debug!("Browser handler finished");
        });

        info!("Browser launched");
        Ok(Self {
            browser,
            handler,
            page: None,
        })
    }

    fn page(&self) -> Result<&Page, SessionError> {
        self.page.as_ref().ok_or(SessionError::Closed)
    }

    async fn element(&self, selector: &str) -> Result<Element, SessionError> {
        self.page()?
            .find_xpath(selector)
            .await
            .map_err(|_| SessionError::ElementNotFound(selector.to_string()))
    }

    /// Poll for the element until `ready` accepts it or `limit` passes.
    async fn wait_for<F>(&self, selector: &str, limit: Duration, ready: F) -> Result<(), SessionError>
    where
        F: AsyncFn(&Element) -> bool,
    {
        let deadline = Instant::now() + limit;
        loop {
            if let Ok(element) = self.element(selector).await {
                if ready(&element).await {
                    return Ok(());
                }
            }
            if Instant::now() >= deadline {
                return Err(SessionError::Timeout {
                    selector: selector.to_string(),
                    timeout: limit,
                });
            }
            sleep(POLL_INTERVAL).await;
        }
    }
}

fn action_error(selector: &str, e: impl std::fmt::Display) -> SessionError {
    SessionError::Action {
        selector: selector.to_string(),
        reason: e.to_string(),
    }
}

impl BrowserSession for ChromiumSession {
    async fn open(&mut self, url: &str) -> Result<(), SessionError> {
        let navigation_error = |e: chromiumoxide::error::CdpError| SessionError::Navigation {
            url: url.to_string(),
            reason: e.to_string(),
        };
        match &self.page {
            Some(page) => {
                page.goto(url).await.map_err(navigation_error)?;
                page.wait_for_navigation().await.map_err(navigation_error)?;
            }
            None => {
                let page = self.browser.new_page(url).await.map_err(navigation_error)?;
                self.page = Some(page);
            }
        }
        info!(%url, "Opened page");
        Ok(())
    }

    async fn input_text(&mut self, selector: &str, text: &str) -> Result<(), SessionError> {
        let element = self.element(selector).await?;
        element.click().await.map_err(|e| action_error(selector, e))?;
        element.type_str(text).await.map_err(|e| action_error(selector, e))?;
        Ok(())
    }

    async fn press_enter(&mut self, selector: &str) -> Result<(), SessionError> {
        let element = self.element(selector).await?;
        element.press_key("Enter").await.map_err(|e| action_error(selector, e))?;
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> Result<(), SessionError> {
        let element = self.element(selector).await?;
        element.click().await.map_err(|e| action_error(selector, e))?;
        Ok(())
    }

    async fn wait_until_visible(&mut self, selector: &str, limit: Duration) -> Result<(), SessionError> {
        self.wait_for(selector, limit, async |element: &Element| {
            element
                .bounding_box()
                .await
                .map(|b| b.width > 0.0 && b.height > 0.0)
                .unwrap_or(false)
        })
        .await
    }

    async fn wait_until_enabled(&mut self, selector: &str, limit: Duration) -> Result<(), SessionError> {
        self.wait_for(selector, limit, async |element: &Element| {
            matches!(element.attribute("disabled").await, Ok(None))
        })
        .await
    }

    async fn scroll_into_view(&mut self, selector: &str) -> Result<(), SessionError> {
        let element = self.element(selector).await?;
        element.scroll_into_view().await.map_err(|e| action_error(selector, e))?;
        Ok(())
    }

    async fn text(&mut self, selector: &str) -> Result<String, SessionError> {
        let element = self.element(selector).await?;
        let text = element.inner_text().await.map_err(|e| action_error(selector, e))?;
        Ok(text.unwrap_or_default())
    }

    async fn attribute(&mut self, selector: &str, name: &str) -> Result<Option<String>, SessionError> {
        let element = self.element(selector).await?;
        element.attribute(name).await.map_err(|e| action_error(selector, e))
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        self.page = None;
        self.browser
            .close()
            .await
            .map_err(|e| SessionError::Action {
                selector: "browser".to_string(),
                reason: e.to_string(),
            })?;
        let _ = timeout(Duration::from_secs(5), &mut self.handler).await;
        info!("Browser closed");
        Ok(())
    }
}
