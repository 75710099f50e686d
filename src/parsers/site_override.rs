use crate::classifier::MenuTypes;
use crate::classifier::menu::GENERIC_MENU_TYPE;
use crate::results::{MenuFormat, MenuItem};

/// A site whose menu the classifier cannot find, with the menu known in advance.
struct KnownSite {
    /// Matched against the end of the task URL
    suffix: &'static str,
    menu_link: &'static str,
    format: MenuFormat,
    languages: &'static [&'static str],
    confidence: f64,
}

/// The menu of this site is an image gallery behind an art-installation front page.
const KNOWN_SITES: [KnownSite; 1] = [KnownSite {
    suffix: "//gamper-restaurant.ch/",
    menu_link: "https://gamper-restaurant.ch/wermuteria",
    format: MenuFormat::Image,
    languages: &["de"],
    confidence: 0.9,
}];

/// Whether `url` belongs to a site with a hard-coded menu.
pub fn matches(url: &str) -> bool {
    KNOWN_SITES.iter().any(|site| url.ends_with(site.suffix))
}

/// The hard-coded menu for `url`, if any.
pub fn parse(url: &str, menu_types: &MenuTypes) -> Option<MenuItem> {
    let site = KNOWN_SITES.iter().find(|site| url.ends_with(site.suffix))?;
    Some(MenuItem {
        link: site.menu_link.to_string(),
        type_code: GENERIC_MENU_TYPE.to_string(),
        type_label: menu_types
            .get(GENERIC_MENU_TYPE)
            .cloned()
            .unwrap_or_else(|| "Menu".to_string()),
        format: site.format,
        languages: site.languages.iter().map(|lang| lang.to_string()).collect(),
        button_text: Some(String::new()),
        confidence: site.confidence,
        notes: None,
        content_disposition: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_site() {
        let types = MenuTypes::from([("oct_menu".to_string(), "Speisekarte".to_string())]);
        assert!(matches("http://gamper-restaurant.ch/"));

        let item = parse("https://gamper-restaurant.ch/", &types).unwrap();
        assert_eq!(item.link, "https://gamper-restaurant.ch/wermuteria");
        assert_eq!(item.type_label, "Speisekarte");
        assert_eq!(item.format, MenuFormat::Image);
        assert_eq!(item.languages, vec!["de"]);
    }

    #[test]
    fn test_other_pages_do_not_match() {
        let types = MenuTypes::new();
        assert!(!matches("https://gamper-restaurant.ch/wermuteria"));
        assert!(parse("https://gamper-restaurant.ch/kontakt", &types).is_none());
        assert!(parse("https://www.gamper-restaurant.ch/", &types).is_none());
    }
}
