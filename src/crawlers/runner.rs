use super::{CrawlContext, SiteCrawler};
use crate::render::SessionFactory;
use crate::results::{RestaurantResult, Site};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Crawl every site, at most `site_concurrency` at a time, each on its own
/// rendering session. Results come back in input order; a site that cannot
/// be crawled is reported with a warning instead of failing the run.
pub async fn run_sites(
    sites: Vec<Site>,
    ctx: Arc<CrawlContext>,
    sessions: Arc<dyn SessionFactory>,
) -> Vec<RestaurantResult> {
    let concurrency = ctx.config.site_concurrency.max(1);
    ::log::info!("Crawling {} sites, {} at a time", sites.len(), concurrency);

    let semaphore = Arc::new(Semaphore::new(concurrency));
    let mut crawls = JoinSet::new();
    for (index, site) in sites.iter().cloned().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        let ctx = Arc::clone(&ctx);
        let sessions = Arc::clone(&sessions);
        crawls.spawn(async move {
            // The semaphore is never closed.
            let _permit = semaphore.acquire_owned().await.ok();
            (index, crawl_site(&site, &ctx, sessions.as_ref()).await)
        });
    }

    let mut results: Vec<Option<RestaurantResult>> = vec![None; sites.len()];
    while let Some(joined) = crawls.join_next().await {
        match joined {
            Ok((index, result)) => results[index] = Some(result),
            Err(e) => ::log::error!("Site crawl task failed: {}", e),
        }
    }

    results
        .into_iter()
        .zip(sites)
        .map(|(result, site)| {
            result.unwrap_or_else(|| {
                RestaurantResult::new(
                    site.name,
                    site.url,
                    None,
                    vec!["crawl aborted".to_string()],
                    Vec::new(),
                )
            })
        })
        .collect()
}

/// Crawl one site on a fresh session.
pub async fn crawl_site(
    site: &Site,
    ctx: &CrawlContext,
    sessions: &dyn SessionFactory,
) -> RestaurantResult {
    ::log::info!("Starting crawl of {} at {}", site.name, site.url);

    let renderer = match sessions.open().await {
        Ok(renderer) => renderer,
        Err(e) => {
            ::log::error!("No rendering session for {}: {}", site.name, e);
            return RestaurantResult::new(
                site.name.clone(),
                site.url.clone(),
                None,
                vec![format!("session_error: {}", e)],
                Vec::new(),
            );
        }
    };

    let result = SiteCrawler::new(site, renderer.as_ref(), ctx).crawl().await;
    if let Err(e) = renderer.close().await {
        ::log::warn!("Failed to close session for {}: {}", site.name, e);
    }

    ::log::info!(
        "Finished {}: {} menus, {} warnings",
        site.name,
        result.menus.len(),
        result.warnings.len()
    );
    result
}
