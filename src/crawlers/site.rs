use super::CrawlContext;
use crate::error::RenderError;
use crate::parsers::{self, ParseContext, ParserKind, html};
use crate::render::{Renderer, WaitCondition, cookies};
use crate::results::{CrawlTask, LinkInfo, MenuSet, PageRecord, RestaurantResult, Site};
use crate::urls::{canonicalize_language, is_renderable};
use std::collections::{HashSet, VecDeque};
use std::time::{Duration, Instant};

pub const BUDGET_EXCEEDED: &str = "crawl budget exceeded";

/// Breadth-first crawl of one site.
///
/// Owns the frontier, the `visited` and `seen` sets (both keyed by canonical
/// URL) and the menu records of the site. Tasks are processed one at a time on
/// a single rendering session.
pub struct SiteCrawler<'a> {
    site: &'a Site,
    renderer: &'a dyn Renderer,
    ctx: &'a CrawlContext,
    queue: VecDeque<CrawlTask>,
    visited: HashSet<String>,
    seen: HashSet<String>,
    menus: MenuSet,
    /// `Some` once cookie detection has run; the inner value is the button label
    cookie_accept: Option<Option<String>>,
    warnings: Vec<String>,
    pages: Vec<PageRecord>,
    deadline: Option<Instant>,
}

impl<'a> SiteCrawler<'a> {
    pub fn new(site: &'a Site, renderer: &'a dyn Renderer, ctx: &'a CrawlContext) -> Self {
        let mut seen = HashSet::new();
        seen.insert(canonicalize_language(&site.url));

        Self {
            site,
            renderer,
            ctx,
            queue: VecDeque::from([CrawlTask::seed(site.url.clone())]),
            visited: HashSet::new(),
            seen,
            menus: MenuSet::new(),
            cookie_accept: None,
            warnings: Vec::new(),
            pages: Vec::new(),
            deadline: ctx
                .config
                .site_budget_secs
                .map(|secs| Instant::now() + Duration::from_secs(secs)),
        }
    }

    /// Crawl until the frontier is empty or the budget runs out.
    pub async fn crawl(mut self) -> RestaurantResult {
        self.run().await;
        self.into_result()
    }

    /// Process the queue without consuming the crawler, so its state can be inspected.
    pub async fn run(&mut self) {
        let started = Instant::now();
        while let Some(task) = self.queue.pop_front() {
            if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                ::log::warn!(
                    "{}: budget exceeded with {} tasks left",
                    self.site.name,
                    self.queue.len() + 1
                );
                self.warnings.push(BUDGET_EXCEEDED.to_string());
                break;
            }
            self.process(task).await;
        }

        ::log::info!(
            "{}: visited {} pages in {:.2} seconds, found {} menus",
            self.site.name,
            self.visited.len(),
            started.elapsed().as_secs_f64(),
            self.menus.len()
        );
    }

    async fn process(&mut self, task: CrawlTask) {
        if task.depth > self.ctx.config.max_depth {
            ::log::debug!("Discarding {} beyond max depth", task);
            return;
        }
        let canonical = canonicalize_language(&task.url);
        if self.visited.contains(&canonical) {
            ::log::debug!("Already visited {}", canonical);
            return;
        }
        ::log::info!("Processing {}", task);

        let page = if is_renderable(&task.url) {
            match self.render(&task, &canonical).await {
                Ok(page) => Some(page),
                Err(e) => {
                    ::log::warn!("Navigation to {} failed: {}", task.url, e);
                    self.warnings.push(format!("nav_error: {}: {}", task.url, e));
                    self.pages.push(PageRecord::failed(
                        &task.url,
                        task.call_stack.clone(),
                        e.to_string(),
                    ));
                    self.visited.insert(canonical);
                    return;
                }
            }
        } else {
            ::log::debug!("{} is not renderable, skipping navigation", task.url);
            None
        };

        let kind = ParserKind::select(&task.url);
        let parse_ctx = ParseContext {
            site_name: &self.site.name,
            site_url: &self.site.url,
            page: page.as_ref(),
            classifier: &self.ctx.classifier,
            fetcher: &self.ctx.fetcher,
        };
        match parsers::parse(kind, &task, &parse_ctx).await {
            Ok(Some(item)) => {
                let link = item.link.clone();
                if self.menus.insert(item) {
                    ::log::info!("{}: found menu at {}", self.site.name, link);
                }
            }
            Ok(None) => {}
            Err(e) => {
                ::log::warn!("Could not parse {}: {}", task.url, e);
                self.warnings.push(format!("unsupported: {}: {}", task.url, e));
            }
        }

        if let Some(mut page) = page {
            // Markup is only needed while the task is processed.
            page.raw_markup = String::new();
            self.pages.push(page);
        }
        self.visited.insert(canonical);
    }

    /// Load the task's page, handle the cookie banner and queue its links.
    async fn render(&mut self, task: &CrawlTask, canonical: &str) -> Result<PageRecord, RenderError> {
        self.navigate(&task.url).await?;
        self.handle_cookie_banner().await;

        let markup = self.renderer.current_markup().await?;
        let title = self.renderer.title().await.unwrap_or_else(|e| {
            ::log::debug!("No title for {}: {}", task.url, e);
            String::new()
        });

        let links = self.ctx.links.extract(self.renderer, task, &markup).await;
        if task.depth < self.ctx.config.max_depth {
            self.enqueue_links(task, canonical, &links).await;
        } else {
            ::log::debug!("{} is at max depth, not following its links", task.url);
        }

        let pdf_embeds = html::pdf_references(&markup);
        Ok(PageRecord {
            url: task.url.clone(),
            title,
            text: html::visible_text(&markup, self.ctx.config.max_page_text_chars),
            raw_markup: markup,
            links,
            has_menu_pdfs: !pdf_embeds.is_empty(),
            pdf_embeds,
            call_stack: task.call_stack.clone(),
            error: None,
        })
    }

    /// Fast wait first, full page load as the fallback.
    async fn navigate(&self, url: &str) -> Result<(), RenderError> {
        let timeouts = &self.ctx.config.timeouts;
        let fast = Duration::from_secs(timeouts.fast_navigation_secs);
        match self
            .renderer
            .navigate(url, WaitCondition::DomContentLoaded, fast)
            .await
        {
            Ok(()) => Ok(()),
            Err(e) => {
                ::log::debug!("Fast navigation to {} failed ({}), waiting for full load", url, e);
                let slow = Duration::from_secs(timeouts.slow_navigation_secs);
                self.renderer.navigate(url, WaitCondition::Load, slow).await
            }
        }
    }

    /// Look for a consent button once per site and press it if found.
    async fn handle_cookie_banner(&mut self) {
        if self.cookie_accept.is_some() {
            return;
        }

        let click = Duration::from_millis(self.ctx.config.timeouts.click_millis);
        let label = cookies::detect(self.renderer, click).await;
        if let Some(label) = &label {
            ::log::info!("{}: accepting cookies via {:?}", self.site.name, label);
            cookies::accept(self.renderer, label, click).await;
        }
        self.cookie_accept = Some(label);
    }

    /// Queue the links not seen before that survive the noise filter.
    async fn enqueue_links(&mut self, task: &CrawlTask, canonical: &str, links: &[LinkInfo]) {
        let fresh: Vec<LinkInfo> = links
            .iter()
            .filter(|link| self.seen.insert(canonicalize_language(&link.url)))
            .cloned()
            .collect();
        if fresh.is_empty() {
            return;
        }

        let found = fresh.len();
        let kept = self.ctx.noise_filter.filter(fresh).await;
        ::log::info!(
            "Queueing {} of {} new links from {}",
            kept.len(),
            found,
            task.url
        );
        self.queue
            .extend(kept.into_iter().map(|link| task.child(link.url, canonical)));
    }

    pub fn visited(&self) -> &HashSet<String> {
        &self.visited
    }

    pub fn seen(&self) -> &HashSet<String> {
        &self.seen
    }

    pub fn pages(&self) -> &[PageRecord] {
        &self.pages
    }

    pub fn into_result(self) -> RestaurantResult {
        RestaurantResult::new(
            self.site.name.clone(),
            self.site.url.clone(),
            self.cookie_accept.flatten(),
            self.warnings,
            self.menus.into_vec(),
        )
    }
}
