//! Input files, prompts and the results file.

use crate::classifier::MenuTypes;
use crate::error::CrawlError;
use crate::results::{RestaurantResult, Site};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// `{"Restaurants": {"<name>": "<url>", ...}}`, in file order
#[derive(Debug, Deserialize)]
struct RestaurantsFile {
    #[serde(rename = "Restaurants")]
    restaurants: serde_json::Map<String, serde_json::Value>,
}

/// `{"menus": {"<code>": "<label>", ...}}`
#[derive(Debug, Deserialize)]
struct VocabularyFile {
    menus: MenuTypes,
}

/// The results file
#[derive(Debug, Serialize, Deserialize)]
pub struct CrawlReport {
    pub restaurants: Vec<RestaurantResult>,
}

/// Sites to crawl, in the order the file lists them. Entries whose URL is not
/// a string are skipped.
pub fn load_sites(path: &Path) -> Result<Vec<Site>, CrawlError> {
    let file: RestaurantsFile = read_json(path)?;
    let sites: Vec<Site> = file
        .restaurants
        .into_iter()
        .filter_map(|(name, url)| match url.as_str() {
            Some(url) if !url.trim().is_empty() => Some(Site::new(name, url.trim())),
            _ => {
                ::log::warn!("Skipping {}: no URL in {}", name, path.display());
                None
            }
        })
        .collect();
    ::log::info!("Loaded {} sites from {}", sites.len(), path.display());
    Ok(sites)
}

/// A code-to-label vocabulary such as the menu types or menu formats.
pub fn load_vocabulary(path: &Path) -> Result<MenuTypes, CrawlError> {
    let file: VocabularyFile = read_json(path)?;
    if file.menus.is_empty() {
        return Err(CrawlError::Config(format!(
            "{} defines no entries under \"menus\"",
            path.display()
        )));
    }
    ::log::debug!("Loaded {} entries from {}", file.menus.len(), path.display());
    Ok(file.menus)
}

/// Read a prompt file, falling back to the built-in prompt when no path is set.
pub fn load_prompt(path: Option<&Path>, fallback: &str) -> Result<String, CrawlError> {
    match path {
        Some(path) => std::fs::read_to_string(path).map_err(|source| CrawlError::Io {
            path: path.display().to_string(),
            source,
        }),
        None => Ok(fallback.to_string()),
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CrawlError> {
    let contents = std::fs::read_to_string(path).map_err(|source| CrawlError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| CrawlError::Input {
        path: path.display().to_string(),
        source,
    })
}

/// Write the results as pretty JSON. The file is written next to `path` first
/// and renamed into place, so readers never see a partial file.
pub async fn save_results(path: &Path, results: Vec<RestaurantResult>) -> Result<(), CrawlError> {
    let io_error = |source| CrawlError::Io {
        path: path.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
    }

    let report = CrawlReport {
        restaurants: results,
    };
    let json = serde_json::to_string_pretty(&report)
        .map_err(|e| CrawlError::Config(format!("results are not serializable: {}", e)))?;

    let temp_file = temp_path(path);
    let written = async {
        tokio::fs::write(&temp_file, json).await?;
        tokio::fs::rename(&temp_file, path).await
    }
    .await;

    if let Err(e) = written {
        if temp_file.exists() {
            let _ = tokio::fs::remove_file(&temp_file).await;
        }
        return Err(io_error(e));
    }

    ::log::info!(
        "Wrote {} restaurants to {}",
        report.restaurants.len(),
        path.display()
    );
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| "results.json".into());
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::{MenuFormat, MenuItem, SiteStatus};
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn json_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_sites_keeps_file_order() {
        let file = json_file(
            r#"{"Restaurants": {
                "Zum Löwen": "https://loewen.example/",
                "Alpenblick": " https://alpenblick.example/ ",
                "Broken": 42
            }}"#,
        );

        let sites = load_sites(file.path()).unwrap();
        assert_eq!(
            sites,
            vec![
                Site::new("Zum Löwen", "https://loewen.example/"),
                Site::new("Alpenblick", "https://alpenblick.example/"),
            ]
        );
    }

    #[test]
    fn test_load_vocabulary() {
        let file = json_file(r#"{"menus": {"oct_menu": "Speisekarte", "wine_menu": "Weinkarte"}}"#);
        let types = load_vocabulary(file.path()).unwrap();
        assert_eq!(types.get("wine_menu").map(String::as_str), Some("Weinkarte"));

        let empty = json_file(r#"{"menus": {}}"#);
        assert!(matches!(load_vocabulary(empty.path()), Err(CrawlError::Config(_))));
    }

    #[test]
    fn test_input_errors() {
        let missing = Path::new("/definitely/not/here.json");
        assert!(matches!(load_sites(missing), Err(CrawlError::Io { .. })));

        let malformed = json_file("{\"Restaurants\": [");
        assert!(matches!(load_sites(malformed.path()), Err(CrawlError::Input { .. })));
    }

    #[test]
    fn test_load_prompt() {
        assert_eq!(load_prompt(None, "built-in").unwrap(), "built-in");

        let file = json_file("custom prompt");
        assert_eq!(load_prompt(Some(file.path()), "built-in").unwrap(), "custom prompt");
    }

    #[tokio::test]
    async fn test_save_results_creates_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("menus.json");
        let results = vec![
            RestaurantResult::new(
                "Alpha",
                "https://alpha.example/",
                Some("Accept".to_string()),
                Vec::new(),
                vec![MenuItem {
                    link: "https://alpha.example/karte.pdf".to_string(),
                    type_code: "oct_menu".to_string(),
                    type_label: "Speisekarte".to_string(),
                    format: MenuFormat::Pdf,
                    languages: vec!["de".to_string()],
                    button_text: None,
                    confidence: 0.8,
                    notes: None,
                    content_disposition: None,
                }],
            ),
            RestaurantResult::new("Beta", "https://beta.example/", None, Vec::new(), Vec::new()),
        ];

        save_results(&path, results).await.unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["restaurants"][0]["name"], "Alpha");
        assert_eq!(written["restaurants"][0]["status"], "ok");
        assert_eq!(written["restaurants"][0]["menus"][0]["format"], "pdf");
        assert_eq!(written["restaurants"][1]["status"], "no_menus_found");
        assert!(!temp_path(&path).exists());

        let report: CrawlReport =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(report.restaurants[1].status, SiteStatus::NoMenusFound);
    }
}
