use super::llm::{ChatModel, parse_json_answer};
use crate::error::ClassifierError;
use crate::results::{MenuFormat, MenuItem};
use crate::urls::LANGUAGE_CODES;
use crate::utils::{MAX_LANGUAGES, dedup_by_key};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Menu type vocabulary: code to human-readable label.
pub type MenuTypes = BTreeMap<String, String>;

/// Menu type used when the classifier does not name one.
pub const GENERIC_MENU_TYPE: &str = "oct_menu";

/// What the classifier gets to see of one page or document.
#[derive(Debug, Clone)]
pub struct PageContext<'a> {
    pub site_name: &'a str,
    pub site_url: &'a str,
    pub page_url: &'a str,
    pub page_text: &'a str,
    pub page_title: &'a str,
    pub content_disposition: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct MenuPayload<'a> {
    site_name: &'a str,
    site_url: &'a str,
    page_url: &'a str,
    page_content: &'a str,
    page_title: &'a str,
    menu_types: &'a MenuTypes,
    menu_formats: [&'static str; 4],
    langs: [&'static str; 4],
    content_disposition: Option<&'a str>,
}

#[derive(Deserialize)]
struct CandidateMenu {
    #[serde(default = "generic_type")]
    type_code: String,
    #[serde(default)]
    format: Option<String>,
    #[serde(default)]
    languages: Vec<String>,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    button_text: Option<String>,
}

fn generic_type() -> String {
    GENERIC_MENU_TYPE.to_string()
}

/// Turns page text into at most one menu record. Best effort: any service or
/// parsing failure yields no record.
pub struct MenuClassifier {
    model: Arc<dyn ChatModel>,
    prompt: String,
    menu_types: Arc<MenuTypes>,
    threshold: f64,
}

impl MenuClassifier {
    pub fn new(
        model: Arc<dyn ChatModel>,
        prompt: impl Into<String>,
        menu_types: Arc<MenuTypes>,
        threshold: f64,
    ) -> Self {
        Self {
            model,
            prompt: prompt.into(),
            menu_types,
            threshold,
        }
    }

    pub fn menu_types(&self) -> &MenuTypes {
        &self.menu_types
    }

    /// Label for a menu type code, `"Unknown"` when the vocabulary lacks it.
    pub fn type_label(&self, type_code: &str) -> String {
        self.menu_types
            .get(type_code)
            .cloned()
            .unwrap_or_else(|| "Unknown".to_string())
    }

    pub async fn classify(&self, context: &PageContext<'_>) -> Option<MenuItem> {
        match self.try_classify(context).await {
            Ok(item) => item,
            Err(e) => {
                ::log::warn!("Menu classification of {} failed: {}", context.page_url, e);
                None
            }
        }
    }

    async fn try_classify(
        &self,
        context: &PageContext<'_>,
    ) -> Result<Option<MenuItem>, ClassifierError> {
        let payload = MenuPayload {
            site_name: context.site_name,
            site_url: context.site_url,
            page_url: context.page_url,
            page_content: context.page_text,
            page_title: context.page_title,
            menu_types: &self.menu_types,
            menu_formats: MenuFormat::CLASSIFIABLE,
            langs: LANGUAGE_CODES,
            content_disposition: context.content_disposition,
        };
        let payload =
            serde_json::to_string(&payload).map_err(|e| ClassifierError::Malformed(e.to_string()))?;

        let answer = self.model.complete(&self.prompt, &payload).await?;
        let value = parse_json_answer(&answer)?;

        let Some(first) = value
            .get("menus")
            .and_then(|menus| menus.as_array())
            .and_then(|menus| menus.first())
        else {
            ::log::debug!("Classifier found no menu on {}", context.page_url);
            return Ok(None);
        };
        let candidate: CandidateMenu = serde_json::from_value(first.clone())
            .map_err(|e| ClassifierError::Malformed(e.to_string()))?;

        if candidate.confidence < self.threshold {
            ::log::debug!(
                "Discarding {} menu on {} with confidence {:.2}",
                candidate.type_code,
                context.page_url,
                candidate.confidence
            );
            return Ok(None);
        }

        Ok(Some(MenuItem {
            link: context.page_url.to_string(),
            type_label: self.type_label(&candidate.type_code),
            type_code: candidate.type_code,
            format: candidate
                .format
                .as_deref()
                .map(MenuFormat::from_label)
                .unwrap_or_default(),
            languages: normalize_languages(&candidate.languages),
            button_text: candidate.button_text,
            confidence: candidate.confidence.clamp(0.0, 1.0),
            notes: candidate.reason,
            content_disposition: context.content_disposition.map(str::to_string),
        }))
    }
}

/// Lower-case two-letter prefixes of the supported languages, first seen first, at most three.
pub fn normalize_languages(languages: &[String]) -> Vec<String> {
    let codes = languages
        .iter()
        .map(|lang| lang.trim().to_lowercase().chars().take(2).collect::<String>())
        .filter(|code| LANGUAGE_CODES.contains(&code.as_str()));
    let mut codes = dedup_by_key(codes, |code| code.clone());
    codes.truncate(MAX_LANGUAGES);
    codes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::testing::ScriptedChat;

    fn menu_types() -> Arc<MenuTypes> {
        Arc::new(MenuTypes::from([
            ("oct_menu".to_string(), "Menu".to_string()),
            ("wine_menu".to_string(), "Wine List".to_string()),
        ]))
    }

    fn context() -> PageContext<'static> {
        PageContext {
            site_name: "Test Restaurant",
            site_url: "https://example.com",
            page_url: "https://example.com/wine",
            page_text: "Weinkarte Rotweine Weissweine",
            page_title: "Wein",
            content_disposition: None,
        }
    }

    fn classifier(chat: Arc<ScriptedChat>) -> MenuClassifier {
        MenuClassifier::new(chat, "prompt", menu_types(), 0.7)
    }

    #[tokio::test]
    async fn test_confident_answer_becomes_menu_item() {
        let chat = Arc::new(ScriptedChat::always(
            r#"{"menus": [{"type_code": "wine_menu", "format": "integrated",
                "languages": ["DE", "de-CH", "en", "es", "fr", "it"],
                "confidence": 0.92, "reason": "wine list"}]}"#,
        ));
        let item = classifier(chat.clone()).classify(&context()).await.unwrap();

        assert_eq!(item.link, "https://example.com/wine");
        assert_eq!(item.type_code, "wine_menu");
        assert_eq!(item.type_label, "Wine List");
        assert_eq!(item.format, MenuFormat::Integrated);
        assert_eq!(item.languages, vec!["de", "en", "fr"]);
        assert_eq!(item.notes.as_deref(), Some("wine list"));

        let payload: serde_json::Value = serde_json::from_str(&chat.payloads()[0]).unwrap();
        assert_eq!(payload["PAGE_URL"], "https://example.com/wine");
        assert_eq!(payload["MENU_TYPES"]["wine_menu"], "Wine List");
        assert_eq!(payload["MENU_FORMATS"], serde_json::json!(["pdf", "viewer", "integrated", "none"]));
        assert_eq!(payload["LANGS"], serde_json::json!(["de", "en", "fr", "it"]));
        assert_eq!(payload["CONTENT_DISPOSITION"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn test_low_confidence_is_discarded() {
        let chat = Arc::new(ScriptedChat::always(
            r#"{"menus":[{"type_code":"oct_menu","confidence":0.5,"format":"pdf","languages":["de"]}]}"#,
        ));
        assert!(classifier(chat).classify(&context()).await.is_none());
    }

    #[tokio::test]
    async fn test_empty_and_malformed_answers_yield_none() {
        for answer in [r#"{"menus": []}"#, r#"{}"#, "not json", r#"{"menus":[{"confidence":"high"}]}"#] {
            let chat = Arc::new(ScriptedChat::always(answer));
            assert!(classifier(chat).classify(&context()).await.is_none(), "{}", answer);
        }

        let chat = Arc::new(ScriptedChat::unreachable());
        assert!(classifier(chat).classify(&context()).await.is_none());
    }

    #[tokio::test]
    async fn test_defaults_for_missing_fields() {
        let chat = Arc::new(ScriptedChat::always(r#"{"menus":[{"confidence":0.8}]}"#));
        let mut ctx = context();
        ctx.content_disposition = Some("inline; filename=karte.pdf");
        let item = classifier(chat).classify(&ctx).await.unwrap();

        assert_eq!(item.type_code, "oct_menu");
        assert_eq!(item.type_label, "Menu");
        assert_eq!(item.format, MenuFormat::Integrated);
        assert!(item.languages.is_empty());
        assert_eq!(item.content_disposition.as_deref(), Some("inline; filename=karte.pdf"));
    }

    #[test]
    fn test_normalize_languages() {
        let langs = vec!["EN".to_string(), "en-GB".to_string(), "it".to_string(), "x".to_string()];
        assert_eq!(normalize_languages(&langs), vec!["en", "it"]);
    }
}
