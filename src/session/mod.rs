//! Browser session capability.
//!
//! The indexed listing drives a live, stateful results page: type the search
//! phrase, press Enter, click filters, then read result cards one by one.
//! [`BrowserSession`] is the narrow set of actions it needs, addressed by
//! XPath selectors. The Chrome implementation lives in [`chromium`] behind
//! the `browser` feature; tests use a replaying double.

use std::time::Duration;

use crate::error::SessionError;

#[cfg(feature = "browser")]
pub mod chromium;

/// Actions on one open browser page.
pub trait BrowserSession {
    /// Navigate to `url`, opening a page if none is open yet.
    async fn open(&mut self, url: &str) -> Result<(), SessionError>;

    /// Focus the element and type `text` into it.
    async fn input_text(&mut self, selector: &str, text: &str) -> Result<(), SessionError>;

    /// Simulate the Enter key on the element.
    async fn press_enter(&mut self, selector: &str) -> Result<(), SessionError>;

    async fn click(&mut self, selector: &str) -> Result<(), SessionError>;

    async fn wait_until_visible(&mut self, selector: &str, timeout: Duration) -> Result<(), SessionError>;

    async fn wait_until_enabled(&mut self, selector: &str, timeout: Duration) -> Result<(), SessionError>;

    async fn scroll_into_view(&mut self, selector: &str) -> Result<(), SessionError>;

    /// Rendered text of the element.
    async fn text(&mut self, selector: &str) -> Result<String, SessionError>;

    /// Attribute value, `None` when the element lacks it.
    async fn attribute(&mut self, selector: &str, name: &str) -> Result<Option<String>, SessionError>;

    async fn close(&mut self) -> Result<(), SessionError>;
}

#[cfg(test)]
pub(crate) mod testing {
    //! Session double that replays a canned DOM.

    use super::*;
    use std::collections::{HashMap, HashSet};

    /// Elements are keyed by their exact selector string. Every action is
    /// logged so tests can assert what was (and was not) touched.
    #[derive(Debug, Default)]
    pub struct ReplaySession {
        texts: HashMap<String, String>,
        attributes: HashMap<(String, String), String>,
        present: HashSet<String>,
        failing: HashSet<String>,
        pub log: Vec<String>,
        pub typed: Vec<(String, String)>,
    }

    impl ReplaySession {
        pub fn new() -> Self {
            Self::default()
        }

        /// Register an element, optionally with text.
        pub fn with_element(&mut self, selector: &str, text: Option<&str>) -> &mut Self {
            self.present.insert(selector.to_string());
            if let Some(text) = text {
                self.texts.insert(selector.to_string(), text.to_string());
            }
            self
        }

        pub fn with_attribute(&mut self, selector: &str, name: &str, value: &str) -> &mut Self {
            self.present.insert(selector.to_string());
            self.attributes
                .insert((selector.to_string(), name.to_string()), value.to_string());
            self
        }

        /// Make every action on `selector` fail.
        pub fn broken(&mut self, selector: &str) -> &mut Self {
            self.failing.insert(selector.to_string());
            self
        }

        pub fn touched(&self, needle: &str) -> bool {
            self.log.iter().any(|entry| entry.contains(needle))
        }

        fn find(&mut self, action: &str, selector: &str) -> Result<(), SessionError> {
            self.log.push(format!("{action} {selector}"));
            if self.failing.contains(selector) {
                return Err(SessionError::Action {
                    selector: selector.to_string(),
                    reason: "scripted failure".to_string(),
                });
            }
            if !self.present.contains(selector) {
                return Err(SessionError::ElementNotFound(selector.to_string()));
            }
            Ok(())
        }
    }

    impl BrowserSession for ReplaySession {
        async fn open(&mut self, url: &str) -> Result<(), SessionError> {
            self.log.push(format!("open {url}"));
            Ok(())
        }

        async fn input_text(&mut self, selector: &str, text: &str) -> Result<(), SessionError> {
            self.find("input", selector)?;
            self.typed.push((selector.to_string(), text.to_string()));
            Ok(())
        }

        async fn press_enter(&mut self, selector: &str) -> Result<(), SessionError> {
            self.find("enter", selector)
        }

        async fn click(&mut self, selector: &str) -> Result<(), SessionError> {
            self.find("click", selector)
        }

        async fn wait_until_visible(&mut self, selector: &str, timeout: Duration) -> Result<(), SessionError> {
            self.find("wait_visible", selector).map_err(|_| SessionError::Timeout {
                selector: selector.to_string(),
                timeout,
            })
        }

        async fn wait_until_enabled(&mut self, selector: &str, timeout: Duration) -> Result<(), SessionError> {
            self.find("wait_enabled", selector).map_err(|_| SessionError::Timeout {
                selector: selector.to_string(),
                timeout,
            })
        }

        async fn scroll_into_view(&mut self, selector: &str) -> Result<(), SessionError> {
            self.find("scroll", selector)
        }

        async fn text(&mut self, selector: &str) -> Result<String, SessionError> {
            self.find("text", selector)?;
            Ok(self.texts.get(selector).cloned().unwrap_or_default())
        }

        async fn attribute(&mut self, selector: &str, name: &str) -> Result<Option<String>, SessionError> {
            self.find("attribute", selector)?;
            Ok(self
                .attributes
                .get(&(selector.to_string(), name.to_string()))
                .cloned())
        }

        async fn close(&mut self) -> Result<(), SessionError> {
            self.log.push("close".to_string());
            Ok(())
        }
    }
}
