//! The browser side of a crawl.
//!
//! [`Renderer`] is the narrow surface the crawler needs from a rendering
//! session; [`webdriver::WebDriverRenderer`] implements it on top of a
//! WebDriver server. A session is stateful and used by one site crawl at a time.

pub mod cookies;
pub mod webdriver;

pub use webdriver::{WebDriverRenderer, WebDriverSessions};

use crate::error::RenderError;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// When a navigation counts as finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitCondition {
    /// The DOM is parsed; images and late scripts may still be loading
    DomContentLoaded,
    /// The document and its subresources have finished loading
    Load,
}

#[async_trait]
pub trait Renderer: Send + Sync {
    /// Load `url` and wait for `wait`, giving up after `timeout`
    async fn navigate(
        &self,
        url: &str,
        wait: WaitCondition,
        timeout: Duration,
    ) -> Result<(), RenderError>;

    /// Evaluate the JavaScript expression `extractor` for every element matching
    /// `selector`. The expression sees the element as `e`.
    async fn evaluate_on_all(&self, selector: &str, extractor: &str)
    -> Result<Vec<Value>, RenderError>;

    /// Serialized markup of the current document
    async fn current_markup(&self) -> Result<String, RenderError>;

    async fn title(&self) -> Result<String, RenderError>;

    /// Click the first button whose label contains `label`, ignoring case
    async fn click_button(&self, label: &str, timeout: Duration) -> Result<(), RenderError>;

    /// End the session
    async fn close(&self) -> Result<(), RenderError>;
}

/// Opens a fresh rendering session for each site crawl
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self) -> Result<Box<dyn Renderer>, RenderError>;
}
