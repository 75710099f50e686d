//! Crawl engine scenarios against a scripted browser and classifier.

mod runner_tests;

use super::CrawlContext;
use crate::classifier::MenuTypes;
use crate::classifier::testing::ScriptedChat;
use crate::config::CrawlConfig;
use crate::error::RenderError;
use crate::render::webdriver::BUTTON_SELECTOR;
use crate::render::{Renderer, SessionFactory, WaitCondition};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const NOISE_PROMPT: &str = "score links";
pub const MENU_PROMPT: &str = "find menus";

/// A page the fake browser can show.
#[derive(Debug, Clone, Default)]
pub struct FakePage {
    pub title: String,
    pub markup: String,
    /// `(href, text)` as written in the page
    pub anchors: Vec<(String, String)>,
    /// `(label, inside a cookie banner)`
    pub buttons: Vec<(String, bool)>,
}

impl FakePage {
    pub fn linking(anchors: &[&str]) -> Self {
        Self {
            anchors: anchors
                .iter()
                .map(|href| (href.to_string(), href.trim_start_matches('/').to_string()))
                .collect(),
            ..Self::default()
        }
    }

    pub fn titled(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self.markup = format!("<html><body><h1>{}</h1></body></html>", title);
        self
    }

    pub fn with_cookie_banner(mut self, label: &str) -> Self {
        self.buttons.push((label.to_string(), true));
        self
    }
}

/// Browser serving a fixed set of pages. Unknown URLs fail to load.
#[derive(Default)]
pub struct FakeBrowser {
    pages: HashMap<String, FakePage>,
    /// URLs whose load never finishes; navigation runs into its limit
    stalled: HashSet<String>,
    /// Button lookups never return
    stalled_buttons: bool,
    current: Mutex<Option<String>>,
    navigations: Mutex<Vec<(String, WaitCondition)>>,
    clicks: Mutex<Vec<String>>,
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, page: FakePage) -> Self {
        self.pages.insert(url.to_string(), page);
        self
    }

    pub fn stalled(mut self, url: &str) -> Self {
        self.stalled.insert(url.to_string());
        self
    }

    pub fn stalled_buttons(mut self) -> Self {
        self.stalled_buttons = true;
        self
    }

    /// A browser with the same pages and no history.
    pub fn fresh(&self) -> Self {
        Self {
            pages: self.pages.clone(),
            stalled: self.stalled.clone(),
            stalled_buttons: self.stalled_buttons,
            ..Self::default()
        }
    }

    pub fn navigations(&self) -> Vec<(String, WaitCondition)> {
        self.navigations.lock().unwrap().clone()
    }

    /// How often `url` was requested, successful or not.
    pub fn navigations_to(&self, url: &str) -> usize {
        self.navigations()
            .iter()
            .filter(|(navigated, _)| navigated == url)
            .count()
    }

    pub fn clicks(&self) -> Vec<String> {
        self.clicks.lock().unwrap().clone()
    }

    fn current_page(&self) -> Option<FakePage> {
        let current = self.current.lock().unwrap().clone()?;
        self.pages.get(&current).cloned()
    }
}

#[async_trait]
impl Renderer for FakeBrowser {
    async fn navigate(
        &self,
        url: &str,
        wait: WaitCondition,
        limit: Duration,
    ) -> Result<(), RenderError> {
        self.navigations.lock().unwrap().push((url.to_string(), wait));
        if self.stalled.contains(url) {
            tokio::time::sleep(limit).await;
            return Err(RenderError::Timeout {
                op: "navigation",
                millis: limit.as_millis() as u64,
            });
        }
        if !self.pages.contains_key(url) {
            return Err(RenderError::Navigation {
                url: url.to_string(),
                reason: "net::ERR_NAME_NOT_RESOLVED".to_string(),
            });
        }
        *self.current.lock().unwrap() = Some(url.to_string());
        Ok(())
    }

    async fn evaluate_on_all(&self, selector: &str, _: &str) -> Result<Vec<Value>, RenderError> {
        if self.stalled_buttons && selector == BUTTON_SELECTOR {
            std::future::pending::<()>().await;
        }
        let Some(page) = self.current_page() else {
            return Ok(Vec::new());
        };
        let values = match selector {
            "a[href]" => page
                .anchors
                .iter()
                .map(|(href, text)| json!({"href": href, "text": text}))
                .collect(),
            BUTTON_SELECTOR => page
                .buttons
                .iter()
                .map(|(text, in_banner)| json!({"text": text, "in_banner": in_banner}))
                .collect(),
            _ => Vec::new(),
        };
        Ok(values)
    }

    async fn current_markup(&self) -> Result<String, RenderError> {
        Ok(self
            .current_page()
            .map(|page| page.markup)
            .unwrap_or_default())
    }

    async fn title(&self) -> Result<String, RenderError> {
        Ok(self.current_page().map(|page| page.title).unwrap_or_default())
    }

    async fn click_button(&self, label: &str, _: Duration) -> Result<(), RenderError> {
        self.clicks.lock().unwrap().push(label.to_string());
        Ok(())
    }

    async fn close(&self) -> Result<(), RenderError> {
        Ok(())
    }
}

/// Hands every site a fresh copy of the same browser, or fails every time.
pub struct FakeSessions {
    pub template: Option<FakeBrowser>,
}

#[async_trait]
impl SessionFactory for FakeSessions {
    async fn open(&self) -> Result<Box<dyn Renderer>, RenderError> {
        match &self.template {
            Some(browser) => Ok(Box::new(browser.fresh())),
            None => Err(RenderError::Session("connection refused".to_string())),
        }
    }
}

/// Classifier stand-in: links containing "noise" are noise; pages whose URL
/// mentions a menu or ends in `.pdf` hold one.
pub fn scripted_model() -> ScriptedChat {
    ScriptedChat::new(|system, user| {
        let payload: Value = serde_json::from_str(user).unwrap();
        if system == NOISE_PROMPT {
            let scores: Vec<Value> = payload["links"]
                .as_array()
                .unwrap()
                .iter()
                .map(|link| {
                    let noisy = link["url"].as_str().unwrap_or("").contains("noise");
                    json!({"url": link["url"], "confidence": if noisy { 0.95 } else { 0.05 }})
                })
                .collect();
            return Ok(json!({ "links": scores }).to_string());
        }

        let url = payload["PAGE_URL"].as_str().unwrap_or("");
        if url.contains("speisekarte") || url.ends_with(".pdf") {
            let format = if url.ends_with(".pdf") { "pdf" } else { "integrated" };
            Ok(json!({"menus": [{
                "type_code": "oct_menu",
                "format": format,
                "languages": ["de"],
                "confidence": 0.9,
                "reason": "dishes with prices"
            }]})
            .to_string())
        } else {
            Ok(r#"{"menus": []}"#.to_string())
        }
    })
}

pub fn context(config: CrawlConfig, chat: Arc<ScriptedChat>) -> CrawlContext {
    let menu_types = MenuTypes::from([
        ("oct_menu".to_string(), "Speisekarte".to_string()),
        ("wine_menu".to_string(), "Weinkarte".to_string()),
    ]);
    CrawlContext::new(config, chat, menu_types, NOISE_PROMPT, MENU_PROMPT).unwrap()
}
