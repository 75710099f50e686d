use crate::classifier::NoiseClassifier;
use crate::results::LinkInfo;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Configuration for the heuristic stage of link filtering
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeuristicConfig {
    /// Keywords that mark a link as certainly not leading to a menu, matched
    /// against the link text and URL
    #[serde(default = "default_exclude_keywords")]
    pub exclude_keywords: Vec<String>,

    /// Regex patterns for URLs to drop (images are not supported)
    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,
}

fn default_exclude_keywords() -> Vec<String> {
    [
        // floor plans and documents
        "grundriss", "floor", "plan", "layout", "map",
        "document", "doc", "manual", "handbook", "guide", "anleitung", "bedienungsanleitung",
        // legal
        "contract", "agreement", "terms", "conditions", "privacy", "datenschutz",
        "invoice", "bill", "receipt", "quittung", "rechnung", "facture",
        // informational
        "vitrine", "tapas", "events", "news", "gallery", "printers",
        "agb", "infos", "about", "contact", "faq", "help", "support", "kontakt",
        "impressum",
        // reservations
        "reservation", "reservierung", "booking", "buchung", "reservieren",
        "tel.", "mailto:",
    ]
    .iter()
    .map(|keyword| keyword.to_string())
    .collect()
}

fn default_exclude_patterns() -> Vec<String> {
    vec![r"(?i)\.(jpg|jpeg|png|gif|bmp|svg|webp|ico)$".to_string()]
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            exclude_keywords: default_exclude_keywords(),
            exclude_patterns: default_exclude_patterns(),
        }
    }
}

/// Fast keyword and pattern filter for links that are certainly not menus
#[derive(Debug)]
pub struct HeuristicFilter {
    keywords: Vec<String>,
    exclude_regexes: Vec<Regex>,
}

impl Default for HeuristicFilter {
    fn default() -> Self {
        Self::new(HeuristicConfig::default()).expect("Default regex patterns should be valid")
    }
}

impl HeuristicFilter {
    /// Create a new filter from configuration
    pub fn new(config: HeuristicConfig) -> Result<Self, regex::Error> {
        let mut exclude_regexes = Vec::with_capacity(config.exclude_patterns.len());
        for pattern in &config.exclude_patterns {
            exclude_regexes.push(Regex::new(pattern)?);
        }

        Ok(Self {
            keywords: config
                .exclude_keywords
                .iter()
                .map(|keyword| keyword.to_lowercase())
                .collect(),
            exclude_regexes,
        })
    }

    /// Whether a link may lead to a menu, as far as cheap rules can tell
    pub fn keeps(&self, link: &LinkInfo) -> bool {
        let text = link.text.to_lowercase();
        let url = link.url.to_lowercase();
        if self
            .keywords
            .iter()
            .any(|keyword| text.contains(keyword) || url.contains(keyword))
        {
            return false;
        }

        !self
            .exclude_regexes
            .iter()
            .any(|regex| regex.is_match(&link.url))
    }

    pub fn apply(&self, links: Vec<LinkInfo>) -> Vec<LinkInfo> {
        links.into_iter().filter(|link| self.keeps(link)).collect()
    }
}

/// Two-stage link rejection: heuristics first, then the external classifier
/// for whatever survives
pub struct NoiseFilter {
    heuristic: HeuristicFilter,
    classifier: NoiseClassifier,
}

impl NoiseFilter {
    pub fn new(heuristic: HeuristicFilter, classifier: NoiseClassifier) -> Self {
        Self {
            heuristic,
            classifier,
        }
    }

    pub async fn filter(&self, links: Vec<LinkInfo>) -> Vec<LinkInfo> {
        let total = links.len();
        let candidates = self.heuristic.apply(links);
        ::log::debug!(
            "Heuristics kept {} of {} links for classification",
            candidates.len(),
            total
        );
        self.classifier.classify(candidates).await
    }
}
