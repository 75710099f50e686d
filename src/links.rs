use crate::error::ExtractionError;
use crate::parsers::html;
use crate::render::Renderer;
use crate::results::{CrawlTask, LinkInfo};
use crate::urls::{normalize, same_site, strip_fragment};
use crate::utils::dedup_by_key;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// Quoted path or http(s) URL inside an inline click handler.
static QUOTED_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"['"](/[^'"]+|https?://[^'"]+)['"]"#).expect("quoted URL pattern is valid")
});

/// A DOM query feeding the extractor
struct LinkSource {
    name: &'static str,
    selector: &'static str,
    extractor: &'static str,
}

const ANCHORS: LinkSource = LinkSource {
    name: "anchors",
    selector: "a[href]",
    extractor: "({href: e.getAttribute('href'), text: e.innerText})",
};

const CLICK_HANDLERS: LinkSource = LinkSource {
    name: "click handlers",
    selector: "[onclick]",
    extractor: "e.getAttribute('onclick')",
};

const DATA_ATTRIBUTES: LinkSource = LinkSource {
    name: "data attributes",
    selector: "[data-href], [data-url]",
    extractor: "(e.getAttribute('data-href') || e.getAttribute('data-url'))",
};

const LINK_ROLES: LinkSource = LinkSource {
    name: "link roles",
    selector: "[role=\"link\"]",
    extractor: "({href: e.getAttribute('href'), text: e.innerText})",
};

/// Collects candidate links from a rendered page.
#[derive(Debug, Clone)]
pub struct LinkExtractor {
    max_depth: usize,
}

impl LinkExtractor {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Links of the rendered page behind `task`, deduplicated by URL and
    /// restricted to the task's site. `markup` is the page's current source.
    ///
    /// Order is anchors, click handlers, data attributes, link roles, then PDF
    /// references from the markup; the first text seen for a URL is kept.
    pub async fn extract(
        &self,
        renderer: &dyn Renderer,
        task: &CrawlTask,
        markup: &str,
    ) -> Vec<LinkInfo> {
        if task.depth > self.max_depth {
            return Vec::new();
        }

        let mut links = Vec::new();
        for source in [&ANCHORS, &CLICK_HANDLERS, &DATA_ATTRIBUTES, &LINK_ROLES] {
            match evaluate_source(renderer, source).await {
                Ok(values) => {
                    let found = links_from_values(source.name, &values, &task.url);
                    ::log::debug!("{} yielded {} links on {}", source.name, found.len(), task.url);
                    links.extend(found);
                }
                Err(e) => ::log::warn!("{} on {}", e, task.url),
            }
        }
        links.extend(pdf_links(markup, &task.url));

        restrict_to_site(links, &task.url)
    }
}

async fn evaluate_source(
    renderer: &dyn Renderer,
    source: &LinkSource,
) -> Result<Vec<Value>, ExtractionError> {
    renderer
        .evaluate_on_all(source.selector, source.extractor)
        .await
        .map_err(|e| ExtractionError {
            source_name: source.name,
            reason: e.to_string(),
        })
}

/// Turn the records of one source into absolute links. Records whose URL
/// cannot be resolved are skipped.
fn links_from_values(source: &str, values: &[Value], base: &str) -> Vec<LinkInfo> {
    let mut candidates: Vec<(String, String)> = Vec::new();
    for value in values {
        match value {
            Value::Object(record) => {
                let href = record.get("href").and_then(Value::as_str).unwrap_or("");
                let text = record.get("text").and_then(Value::as_str).unwrap_or("");
                if !href.trim().is_empty() {
                    candidates.push((href.to_string(), text.trim().to_string()));
                }
            }
            Value::String(handler) if source == CLICK_HANDLERS.name => {
                candidates.extend(
                    QUOTED_URL
                        .captures_iter(handler)
                        .map(|caps| (caps[1].to_string(), String::new())),
                );
            }
            Value::String(url) if !url.trim().is_empty() => {
                candidates.push((url.to_string(), String::new()));
            }
            _ => {}
        }
    }

    candidates
        .into_iter()
        .filter_map(|(reference, text)| match normalize(base, &reference) {
            Ok(url) => Some(LinkInfo::new(strip_fragment(&url), text)),
            Err(e) => {
                ::log::debug!("Dropping link from {}: {}", source, e);
                None
            }
        })
        .collect()
}

/// PDF documents embedded in or linked from the markup, resolved against `base`.
pub fn pdf_links(markup: &str, base: &str) -> Vec<LinkInfo> {
    html::pdf_references(markup)
        .into_iter()
        .filter_map(|reference| normalize(base, &reference).ok())
        .map(|url| LinkInfo::new(strip_fragment(&url), ""))
        .collect()
}

/// Deduplicate by URL, first occurrence first, and keep links on `root`'s site.
pub fn restrict_to_site(links: Vec<LinkInfo>, root: &str) -> Vec<LinkInfo> {
    dedup_by_key(links, |link| link.url.clone())
        .into_iter()
        .filter(|link| same_site(root, &link.url))
        .collect()
}
