use crate::error::CrawlError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Connection settings for the OpenAI-compatible classification endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL, e.g. `http://localhost:1234/v1`
    #[serde(default = "default_api_base")]
    pub api_base: String,

    #[serde(default = "default_api_key")]
    pub api_key: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Per-request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub request_timeout_secs: u64,
}

/// Timeouts for the interactive steps of a crawl
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timeouts {
    /// First navigation attempt, waiting for the DOM only
    #[serde(default = "default_fast_navigation")]
    pub fast_navigation_secs: u64,

    /// Fallback navigation attempt, waiting for the full page load
    #[serde(default = "default_slow_navigation")]
    pub slow_navigation_secs: u64,

    /// Cookie-button clicks and similar UI interactions
    #[serde(default = "default_click_millis")]
    pub click_millis: u64,

    /// Scripts evaluated in the page
    #[serde(default = "default_script")]
    pub script_secs: u64,

    /// HTTP document downloads
    #[serde(default = "default_pdf_request")]
    pub pdf_request_secs: u64,
}

/// Configuration for a menu crawl run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// Links with a noise confidence above this are dropped
    #[serde(default = "default_noise_threshold")]
    pub noise_confidence_threshold: f64,

    /// Menu classifications below this confidence are discarded
    #[serde(default = "default_menu_threshold")]
    pub menu_confidence_threshold: f64,

    /// Deepest link level followed from the seed page
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    #[serde(default = "default_max_pdf_bytes")]
    pub max_pdf_bytes: usize,

    #[serde(default = "default_max_text_chars")]
    pub max_pdf_text_chars: usize,

    #[serde(default = "default_max_text_chars")]
    pub max_page_text_chars: usize,

    /// Links per noise-classifier request
    #[serde(default = "default_noise_batch_size")]
    pub noise_batch_size: usize,

    /// URL for the WebDriver instance
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// Sites crawled at the same time, each with its own browser session
    #[serde(default = "default_site_concurrency")]
    pub site_concurrency: usize,

    /// Wall-clock budget per site in seconds
    #[serde(default)]
    pub site_budget_secs: Option<u64>,

    #[serde(default)]
    pub noise_prompt_path: Option<PathBuf>,

    #[serde(default)]
    pub menu_prompt_path: Option<PathBuf>,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub timeouts: Timeouts,
}

fn default_api_base() -> String {
    "http://localhost:1234/v1".to_string()
}

fn default_api_key() -> String {
    "sk-noauth".to_string()
}

fn default_model() -> String {
    "gpt-oss-20b".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_llm_timeout() -> u64 {
    30
}

fn default_fast_navigation() -> u64 {
    15
}

fn default_slow_navigation() -> u64 {
    60
}

fn default_click_millis() -> u64 {
    1000
}

fn default_script() -> u64 {
    10
}

fn default_pdf_request() -> u64 {
    10
}

fn default_noise_threshold() -> f64 {
    0.3
}

fn default_menu_threshold() -> f64 {
    0.7
}

fn default_max_depth() -> usize {
    3
}

fn default_max_pdf_bytes() -> usize {
    1_000_000
}

fn default_max_text_chars() -> usize {
    3500
}

fn default_noise_batch_size() -> usize {
    20
}

/// Default value for webdriver_url
fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_site_concurrency() -> usize {
    1
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            api_key: default_api_key(),
            model: default_model(),
            temperature: default_temperature(),
            request_timeout_secs: default_llm_timeout(),
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            fast_navigation_secs: default_fast_navigation(),
            slow_navigation_secs: default_slow_navigation(),
            click_millis: default_click_millis(),
            script_secs: default_script(),
            pdf_request_secs: default_pdf_request(),
        }
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            noise_confidence_threshold: default_noise_threshold(),
            menu_confidence_threshold: default_menu_threshold(),
            max_depth: default_max_depth(),
            max_pdf_bytes: default_max_pdf_bytes(),
            max_pdf_text_chars: default_max_text_chars(),
            max_page_text_chars: default_max_text_chars(),
            noise_batch_size: default_noise_batch_size(),
            webdriver_url: default_webdriver_url(),
            site_concurrency: default_site_concurrency(),
            site_budget_secs: None,
            noise_prompt_path: None,
            menu_prompt_path: None,
            llm: LlmConfig::default(),
            timeouts: Timeouts::default(),
        }
    }
}

impl CrawlConfig {
    /// Defaults overlaid with the recognised environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Load configuration from a JSON file; missing fields take their defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CrawlError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| CrawlError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = serde_json::from_str(&contents).map_err(|source| CrawlError::Input {
            path: path.display().to_string(),
            source,
        })?;
        Ok(config.clamped())
    }

    /// Overlay values from `lookup`, keeping the current value when a variable
    /// is missing, empty or unparseable
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        env_value(&lookup, "NOISE_CONFIDENCE_THRESHOLD", &mut self.noise_confidence_threshold);
        env_value(
            &lookup,
            "MENU_ITEM_CLASSIFIER_CONFIDENCE_THRESHOLD",
            &mut self.menu_confidence_threshold,
        );
        env_value(&lookup, "MAX_CRAWL_DEPTH", &mut self.max_depth);
        env_value(&lookup, "MAX_PDF_BYTES", &mut self.max_pdf_bytes);
        env_value(&lookup, "MAX_PDF_TEXT_CHARS", &mut self.max_pdf_text_chars);
        env_value(&lookup, "MAX_PAGE_TEXT_CHARS", &mut self.max_page_text_chars);
        env_value(&lookup, "NOISE_BATCH_SIZE", &mut self.noise_batch_size);
        env_value(&lookup, "SITE_CONCURRENCY", &mut self.site_concurrency);
        env_value(&lookup, "LLM_TIMEOUT_SECS", &mut self.llm.request_timeout_secs);

        if let Some(budget) = lookup("SITE_BUDGET_SECS") {
            match budget.trim().parse() {
                Ok(secs) => self.site_budget_secs = Some(secs),
                Err(_) => ::log::warn!("Ignoring invalid SITE_BUDGET_SECS={}", budget),
            }
        }
        if let Some(url) = lookup("WEBDRIVER_URL") {
            self.webdriver_url = url;
        }
        if let Some(base) = lookup("OPENAI_API_BASE") {
            self.llm.api_base = base;
        }
        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.llm.api_key = key;
        }
        if let Some(model) = lookup("OPENAI_MODEL") {
            self.llm.model = model;
        }

        *self = std::mem::take(self).clamped();
    }

    /// Keep thresholds within [0, 1] and counts at least one. Non-finite
    /// thresholds fall back to their defaults.
    fn clamped(mut self) -> Self {
        self.noise_confidence_threshold =
            unit_interval("noise", self.noise_confidence_threshold, default_noise_threshold());
        self.menu_confidence_threshold =
            unit_interval("menu", self.menu_confidence_threshold, default_menu_threshold());
        self.noise_batch_size = self.noise_batch_size.max(1);
        self.site_concurrency = self.site_concurrency.max(1);
        self
    }
}

fn unit_interval(name: &str, value: f64, default: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        ::log::warn!("Ignoring {} confidence threshold {}, using {}", name, value, default);
        default
    }
}

fn env_value<T, F>(lookup: &F, key: &str, target: &mut T)
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(key) {
        match raw.trim().parse() {
            Ok(value) => *target = value,
            Err(_) => ::log::warn!("Ignoring invalid {}={}", key, raw),
        }
    }
}
