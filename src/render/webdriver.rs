use super::{Renderer, SessionFactory, WaitCondition};
use crate::config::Timeouts;
use crate::error::RenderError;
use async_trait::async_trait;
use fantoccini::wd::TimeoutConfiguration;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::{Value, json};
use std::time::{Duration, Instant};
use tokio::time::timeout;

/// Buttons and button-like elements a user could press
pub const BUTTON_SELECTOR: &str =
    "button, [role='button'], input[type='button'], input[type='submit']";

/// A WebDriver session rendering pages for one site crawl
pub struct WebDriverRenderer {
    client: Client,
    script_timeout: Duration,
}

impl WebDriverRenderer {
    /// Opens a headless session, trying common WebDriver ports when `webdriver_url` is unreachable
    pub async fn connect(webdriver_url: &str, timeouts: &Timeouts) -> Result<Self, RenderError> {
        match open_session(webdriver_url).await {
            Ok(client) => {
                ::log::debug!("Connected to WebDriver at {}", webdriver_url);
                return Self::configure(client, timeouts).await;
            }
            Err(e) => {
                ::log::error!("Failed to connect to WebDriver at {}: {}", webdriver_url, e);
            }
        }

        let fallback_urls = [
            "http://localhost:9515", // ChromeDriver default
            "http://localhost:4444", // Selenium / geckodriver default
            "http://127.0.0.1:4444",
        ];

        for url in fallback_urls.iter() {
            if *url == webdriver_url {
                continue;
            }

            ::log::info!("Trying fallback WebDriver URL: {}", url);
            if let Ok(client) = open_session(url).await {
                ::log::debug!("Connected to fallback WebDriver at {}", url);
                return Self::configure(client, timeouts).await;
            }
        }

        ::log::error!(
            "Make sure a WebDriver server is running or set the WEBDRIVER_URL environment variable"
        );
        Err(RenderError::Session(format!(
            "no WebDriver reachable at {} or the fallback ports",
            webdriver_url
        )))
    }

    /// Bound every page load on the server side, so a stalled load does not
    /// hold the session after the client gave up on it.
    async fn configure(client: Client, timeouts: &Timeouts) -> Result<Self, RenderError> {
        let script_timeout = Duration::from_secs(timeouts.script_secs);
        let page_load = Duration::from_secs(timeouts.slow_navigation_secs);
        client
            .update_timeouts(session_timeouts(script_timeout, page_load))
            .await?;
        Ok(Self {
            client,
            script_timeout,
        })
    }

    async fn wait_for_ready_state(&self, wait: WaitCondition) -> Result<(), RenderError> {
        loop {
            let state = self
                .client
                .execute("return document.readyState;", vec![])
                .await?;
            let ready = match (wait, state.as_str()) {
                (WaitCondition::DomContentLoaded, Some("interactive" | "complete")) => true,
                (WaitCondition::Load, Some("complete")) => true,
                _ => false,
            };
            if ready {
                return Ok(());
            }
            tokio::time::sleep(Duration::from_millis(250)).await;
        }
    }
}

/// Opens one [`WebDriverRenderer`] per site against the same server
#[derive(Debug, Clone)]
pub struct WebDriverSessions {
    webdriver_url: String,
    timeouts: Timeouts,
}

impl WebDriverSessions {
    pub fn new(webdriver_url: impl Into<String>, timeouts: Timeouts) -> Self {
        Self {
            webdriver_url: webdriver_url.into(),
            timeouts,
        }
    }
}

#[async_trait]
impl SessionFactory for WebDriverSessions {
    async fn open(&self) -> Result<Box<dyn Renderer>, RenderError> {
        let renderer = WebDriverRenderer::connect(&self.webdriver_url, &self.timeouts).await?;
        Ok(Box::new(renderer))
    }
}

/// Session timeouts with the server-side page load capped at `page_load`
pub fn session_timeouts(script: Duration, page_load: Duration) -> TimeoutConfiguration {
    TimeoutConfiguration::new(Some(script), Some(page_load), None)
}

async fn open_session(webdriver_url: &str) -> Result<Client, fantoccini::error::NewSessionError> {
    let mut capabilities = serde_json::Map::new();
    // Return from navigation once the DOM is ready; slower waits poll readyState.
    capabilities.insert("pageLoadStrategy".to_string(), json!("eager"));
    capabilities.insert(
        "goog:chromeOptions".to_string(),
        json!({ "args": ["--headless=new", "--disable-gpu", "--no-sandbox"] }),
    );
    capabilities.insert(
        "moz:firefoxOptions".to_string(),
        json!({ "args": ["-headless"] }),
    );

    ClientBuilder::native()
        .capabilities(capabilities)
        .connect(webdriver_url)
        .await
}

#[async_trait]
impl Renderer for WebDriverRenderer {
    async fn navigate(
        &self,
        url: &str,
        wait: WaitCondition,
        limit: Duration,
    ) -> Result<(), RenderError> {
        let started = Instant::now();
        let result = timeout(limit, async {
            self.client
                .update_timeouts(session_timeouts(self.script_timeout, limit))
                .await?;
            self.client.goto(url).await?;
            self.wait_for_ready_state(wait).await
        })
        .await;

        match result {
            Ok(Ok(())) => {
                ::log::debug!(
                    "Loaded {} ({:?}) in {:.2} seconds",
                    url,
                    wait,
                    started.elapsed().as_secs_f64()
                );
                Ok(())
            }
            Ok(Err(e)) => Err(RenderError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            }),
            Err(_) => Err(RenderError::Timeout {
                op: "navigation",
                millis: limit.as_millis() as u64,
            }),
        }
    }

    async fn evaluate_on_all(
        &self,
        selector: &str,
        extractor: &str,
    ) -> Result<Vec<Value>, RenderError> {
        let script = format!(
            "return Array.from(document.querySelectorAll(arguments[0])).map(e => {});",
            extractor
        );
        let value = self.client.execute(&script, vec![json!(selector)]).await?;
        match value {
            Value::Array(items) => Ok(items),
            Value::Null => Ok(Vec::new()),
            other => Err(RenderError::Script(format!(
                "expected an array for {}, got {}",
                selector, other
            ))),
        }
    }

    async fn current_markup(&self) -> Result<String, RenderError> {
        Ok(self.client.source().await?)
    }

    async fn title(&self) -> Result<String, RenderError> {
        Ok(self.client.title().await?)
    }

    async fn click_button(&self, label: &str, limit: Duration) -> Result<(), RenderError> {
        let wanted = label.trim().to_lowercase();
        let result = timeout(limit, async {
            let buttons = self.client.find_all(Locator::Css(BUTTON_SELECTOR)).await?;
            for button in buttons {
                let text = match button.text().await {
                    Ok(text) if !text.trim().is_empty() => text,
                    _ => button.attr("value").await?.unwrap_or_default(),
                };
                if text.to_lowercase().contains(&wanted) {
                    button.click().await?;
                    return Ok(());
                }
            }
            Err(RenderError::NotFound(format!("button labelled {:?}", label)))
        })
        .await;

        result.unwrap_or(Err(RenderError::Timeout {
            op: "click",
            millis: limit.as_millis() as u64,
        }))
    }

    async fn close(&self) -> Result<(), RenderError> {
        self.client.clone().close().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_load_follows_navigation_limit() {
        let timeouts = Timeouts::default();
        let fast = Duration::from_secs(timeouts.fast_navigation_secs);
        let config = session_timeouts(Duration::from_secs(timeouts.script_secs), fast);

        assert_eq!(config.page_load(), Some(Duration::from_secs(15)));
        assert_eq!(config.script(), Some(Duration::from_secs(10)));
        assert_eq!(config.implicit(), None);
    }
}
