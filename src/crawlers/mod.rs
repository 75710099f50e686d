//! The crawl engine: one breadth-first traversal per site ([`site`]) and the
//! runner that drives several sites at once ([`runner`]).

pub mod runner;
pub mod site;

#[cfg(test)]
mod tests;

pub use runner::run_sites;
pub use site::SiteCrawler;

use crate::classifier::{ChatModel, MenuClassifier, MenuTypes, NoiseClassifier};
use crate::config::CrawlConfig;
use crate::error::CrawlError;
use crate::filter::{HeuristicConfig, HeuristicFilter, NoiseFilter};
use crate::links::LinkExtractor;
use crate::parsers::pdf::DocumentFetcher;
use std::sync::Arc;

/// The collaborators every site crawl of a run shares. Holds no per-site state.
pub struct CrawlContext {
    pub config: CrawlConfig,
    pub links: LinkExtractor,
    pub noise_filter: NoiseFilter,
    pub classifier: MenuClassifier,
    pub fetcher: DocumentFetcher,
}

impl CrawlContext {
    pub fn new(
        config: CrawlConfig,
        model: Arc<dyn ChatModel>,
        menu_types: MenuTypes,
        noise_prompt: &str,
        menu_prompt: &str,
    ) -> Result<Self, CrawlError> {
        let fetcher =
            DocumentFetcher::new(&config).map_err(|e| CrawlError::Config(e.to_string()))?;
        let heuristic = HeuristicFilter::new(HeuristicConfig::default())
            .map_err(|e| CrawlError::Config(format!("invalid exclusion pattern: {}", e)))?;
        let noise_filter = NoiseFilter::new(
            heuristic,
            NoiseClassifier::new(
                model.clone(),
                noise_prompt,
                config.noise_confidence_threshold,
                config.noise_batch_size,
            ),
        );
        let classifier = MenuClassifier::new(
            model,
            menu_prompt,
            Arc::new(menu_types),
            config.menu_confidence_threshold,
        );

        Ok(Self {
            links: LinkExtractor::new(config.max_depth),
            noise_filter,
            classifier,
            fetcher,
            config,
        })
    }
}
