pub mod html;
pub mod pdf;
pub mod site_override;

use crate::classifier::menu::{GENERIC_MENU_TYPE, normalize_languages};
use crate::classifier::{MenuClassifier, PageContext};
use crate::error::ParseError;
use crate::results::{CrawlTask, MenuFormat, MenuItem, PageRecord};
use crate::utils::detect_languages;
use pdf::DocumentFetcher;

/// Documents with more text than this are reported even when the classifier
/// has nothing to say about them.
const FALLBACK_MIN_CHARS: usize = 100;
const FALLBACK_CONFIDENCE: f64 = 0.8;

/// Enum to represent the different ways a task can yield a menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserKind {
    /// Hard-coded menu for a known problem site
    SiteOverride,
    /// PDF document, downloaded and read directly
    Document,
    /// Image document (not supported)
    Image,
    /// The page as rendered by the browser
    RenderedPage,
}

impl ParserKind {
    /// Determines the parser based on the task URL
    pub fn select(url: &str) -> Self {
        let lowered = url.to_lowercase();
        let kind = if site_override::matches(url) {
            ParserKind::SiteOverride
        } else if lowered.ends_with(".pdf") {
            ParserKind::Document
        } else if [".png", ".jpg", ".jpeg", ".webp"]
            .iter()
            .any(|ext| lowered.ends_with(ext))
        {
            ParserKind::Image
        } else {
            ParserKind::RenderedPage
        };
        ::log::debug!("Parsing {} as {:?}", url, kind);
        kind
    }
}

/// Everything a parser may draw on besides the task itself
pub struct ParseContext<'a> {
    pub site_name: &'a str,
    pub site_url: &'a str,
    /// The rendered page, when the task was navigated
    pub page: Option<&'a PageRecord>,
    pub classifier: &'a MenuClassifier,
    pub fetcher: &'a DocumentFetcher,
}

/// Run `kind` on `task`. `Ok(None)` means the task holds no menu; errors are
/// per-task outcomes the crawl reports and moves past.
pub async fn parse(
    kind: ParserKind,
    task: &CrawlTask,
    ctx: &ParseContext<'_>,
) -> Result<Option<MenuItem>, ParseError> {
    match kind {
        ParserKind::SiteOverride => Ok(site_override::parse(
            &task.url,
            ctx.classifier.menu_types(),
        )),
        ParserKind::Document => Ok(parse_document(task, ctx).await),
        ParserKind::Image => Err(ParseError::Unsupported("image")),
        ParserKind::RenderedPage => Ok(parse_rendered_page(task, ctx).await),
    }
}

async fn parse_document(task: &CrawlTask, ctx: &ParseContext<'_>) -> Option<MenuItem> {
    let document = ctx.fetcher.fetch_text(&task.url).await;
    let languages = detect_languages(&document.text);
    ::log::debug!(
        "{} has {} characters of text, languages {:?}",
        task.url,
        document.text.chars().count(),
        languages
    );

    let context = PageContext {
        site_name: ctx.site_name,
        site_url: ctx.site_url,
        page_url: &task.url,
        page_text: &document.text,
        page_title: "PDF Document",
        content_disposition: document.content_disposition.as_deref(),
    };
    if let Some(item) = ctx.classifier.classify(&context).await {
        return Some(item);
    }

    let chars = document.text.chars().count();
    if chars <= FALLBACK_MIN_CHARS {
        return None;
    }

    ::log::info!("Reporting unclassified PDF {} as a menu", task.url);
    Some(MenuItem {
        link: task.url.clone(),
        type_code: GENERIC_MENU_TYPE.to_string(),
        type_label: ctx
            .classifier
            .menu_types()
            .get(GENERIC_MENU_TYPE)
            .cloned()
            .unwrap_or_else(|| "Menu".to_string()),
        format: MenuFormat::Pdf,
        languages: normalize_languages(&languages),
        button_text: None,
        confidence: FALLBACK_CONFIDENCE,
        notes: Some(format!("PDF document with {} characters of text", chars)),
        content_disposition: document.content_disposition,
    })
}

async fn parse_rendered_page(task: &CrawlTask, ctx: &ParseContext<'_>) -> Option<MenuItem> {
    let Some(page) = ctx.page else {
        ::log::debug!("No rendered page for {}, nothing to classify", task.url);
        return None;
    };

    let context = PageContext {
        site_name: ctx.site_name,
        site_url: ctx.site_url,
        page_url: &task.url,
        page_text: &page.text,
        page_title: &page.title,
        content_disposition: None,
    };
    ctx.classifier.classify(&context).await
}
