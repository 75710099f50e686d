use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// A URL waiting in the crawl queue together with how it was reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTask {
    pub url: String,
    pub depth: usize,
    /// Canonical URLs of the pages that led here, seed first.
    pub call_stack: Vec<String>,
}

impl CrawlTask {
    /// The seed task of a site crawl.
    pub fn seed(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            depth: 0,
            call_stack: Vec::new(),
        }
    }

    /// Derive a task one level deeper, recording `parent_canonical` on the stack.
    pub fn child(&self, url: impl Into<String>, parent_canonical: &str) -> Self {
        let mut call_stack = self.call_stack.clone();
        call_stack.push(parent_canonical.to_string());
        Self {
            url: url.into(),
            depth: self.depth + 1,
            call_stack,
        }
    }
}

impl fmt::Display for CrawlTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CrawlTask(url={}, depth={}, stack_len={})",
            self.url,
            self.depth,
            self.call_stack.len()
        )
    }
}

/// A link found on a page. Two links are the same link when their URLs match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkInfo {
    pub url: String,
    #[serde(default)]
    pub text: String,
}

impl LinkInfo {
    pub fn new(url: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            text: text.into(),
        }
    }
}

/// How a menu is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MenuFormat {
    Pdf,
    Viewer,
    #[default]
    Integrated,
    Image,
    None,
}

impl MenuFormat {
    /// Formats the classifier is allowed to answer with.
    pub const CLASSIFIABLE: [&'static str; 4] = ["pdf", "viewer", "integrated", "none"];

    /// Lenient parse of a classifier answer; unknown values map to `Integrated`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "pdf" => MenuFormat::Pdf,
            "viewer" => MenuFormat::Viewer,
            "image" => MenuFormat::Image,
            "none" => MenuFormat::None,
            _ => MenuFormat::Integrated,
        }
    }
}

/// A classified menu offering found on one page or document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub link: String,
    pub type_code: String,
    pub type_label: String,
    pub format: MenuFormat,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub button_text: Option<String>,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub content_disposition: Option<String>,
}

/// Menu records of one site, keyed by `link`. The first record for a link wins.
#[derive(Debug, Clone, Default)]
pub struct MenuSet {
    items: Vec<MenuItem>,
    links: HashSet<String>,
}

impl MenuSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `item` unless its link is already present. Returns whether it was added.
    pub fn insert(&mut self, item: MenuItem) -> bool {
        if self.links.contains(&item.link) {
            ::log::debug!("Menu for {} already recorded, keeping the first", item.link);
            return false;
        }
        self.links.insert(item.link.clone());
        self.items.push(item);
        true
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    pub fn into_vec(self) -> Vec<MenuItem> {
        self.items
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SiteStatus {
    #[default]
    Ok,
    NoMenusFound,
}

/// Output record of one site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestaurantResult {
    pub name: String,
    pub url: String,
    pub cookie_banner_accept: Option<String>,
    pub status: SiteStatus,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub menus: Vec<MenuItem>,
}

impl RestaurantResult {
    /// Build the result of a site crawl; the status follows from whether any menu was found.
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        cookie_banner_accept: Option<String>,
        warnings: Vec<String>,
        menus: Vec<MenuItem>,
    ) -> Self {
        let status = if menus.is_empty() {
            SiteStatus::NoMenusFound
        } else {
            SiteStatus::Ok
        };
        Self {
            name: name.into(),
            url: url.into(),
            cookie_banner_accept,
            status,
            warnings,
            menus,
        }
    }
}

/// A restaurant site to crawl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    pub name: String,
    /// Seed URL of the crawl
    pub url: String,
}

impl Site {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Working state collected for one visited page.
#[derive(Debug, Clone, Default)]
pub struct PageRecord {
    pub url: String,
    pub title: String,
    pub raw_markup: String,
    pub text: String,
    pub links: Vec<LinkInfo>,
    pub pdf_embeds: Vec<String>,
    pub has_menu_pdfs: bool,
    pub call_stack: Vec<String>,
    pub error: Option<String>,
}

impl PageRecord {
    /// A record for a page that could not be loaded.
    pub fn failed(url: impl Into<String>, call_stack: Vec<String>, error: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            call_stack,
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(link: &str, type_code: &str) -> MenuItem {
        MenuItem {
            link: link.to_string(),
            type_code: type_code.to_string(),
            type_label: "Menu".to_string(),
            format: MenuFormat::Integrated,
            languages: vec!["de".to_string()],
            button_text: None,
            confidence: 0.9,
            notes: None,
            content_disposition: None,
        }
    }

    #[test]
    fn test_menu_set_first_write_wins() {
        let mut menus = MenuSet::new();
        assert!(menus.insert(item("https://example.com/menu", "oct_menu")));
        assert!(!menus.insert(item("https://example.com/menu", "wine_menu")));
        assert!(menus.insert(item("https://example.com/wine", "wine_menu")));

        let items = menus.into_vec();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].type_code, "oct_menu");
        assert_eq!(items[1].link, "https://example.com/wine");
    }

    #[test]
    fn test_child_task_extends_call_stack() {
        let seed = CrawlTask::seed("https://example.com/");
        let child = seed.child("https://example.com/menu", "https://example.com/");
        assert_eq!(child.depth, 1);
        assert_eq!(child.call_stack, vec!["https://example.com/".to_string()]);

        let grandchild = child.child("https://example.com/menu.pdf", "https://example.com/menu");
        assert_eq!(grandchild.depth, 2);
        assert_eq!(grandchild.call_stack.len(), 2);
        assert!(seed.call_stack.is_empty());
    }

    #[test]
    fn test_status_follows_menus() {
        let empty = RestaurantResult::new("A", "https://a.ch", None, vec![], vec![]);
        assert_eq!(empty.status, SiteStatus::NoMenusFound);

        let found = RestaurantResult::new(
            "B",
            "https://b.ch",
            None,
            vec![],
            vec![item("https://b.ch/menu", "oct_menu")],
        );
        assert_eq!(found.status, SiteStatus::Ok);
    }

    #[test]
    fn test_serialized_shape() {
        let result = RestaurantResult::new("A", "https://a.ch", None, vec![], vec![]);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "no_menus_found");
        assert_eq!(json["cookie_banner_accept"], serde_json::Value::Null);

        let json = serde_json::to_value(item("https://a.ch/menu", "oct_menu")).unwrap();
        assert_eq!(json["format"], "integrated");
    }

    #[test]
    fn test_format_from_label() {
        assert_eq!(MenuFormat::from_label("PDF"), MenuFormat::Pdf);
        assert_eq!(MenuFormat::from_label("viewer"), MenuFormat::Viewer);
        assert_eq!(MenuFormat::from_label("something"), MenuFormat::Integrated);
    }
}
