use super::Renderer;
use super::webdriver::BUTTON_SELECTOR;
use serde::Deserialize;
use std::time::Duration;

/// Words that mark a cookie-banner accept button, in the supported languages.
const ACCEPT_PATTERNS: [&str; 11] = [
    "accept",
    "agree",
    "ok",
    "allow",
    "alle akzeptieren",
    "akzeptieren",
    "zustimmen",
    "accepter",
    "d'accord",
    "accetta",
    "consenti",
];

const BANNER_CANDIDATES: usize = 5;
const ANY_BUTTON_CANDIDATES: usize = 20;

const BUTTON_EXTRACTOR: &str = "({\
    text: (e.innerText || e.value || '').trim(), \
    in_banner: /cookie/i.test((e.parentElement && e.parentElement.innerText) || '')\
})";

/// A button as seen by the detector
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ButtonCandidate {
    #[serde(default)]
    pub text: String,
    /// The button's container mentions cookies
    #[serde(default)]
    pub in_banner: bool,
}

/// Find the label of the cookie-consent accept button on the current page,
/// giving up after `limit`.
pub async fn detect(renderer: &dyn Renderer, limit: Duration) -> Option<String> {
    let lookup = tokio::time::timeout(
        limit,
        renderer.evaluate_on_all(BUTTON_SELECTOR, BUTTON_EXTRACTOR),
    )
    .await;
    let buttons = match lookup {
        Ok(Ok(values)) => values
            .into_iter()
            .filter_map(|value| serde_json::from_value::<ButtonCandidate>(value).ok())
            .collect::<Vec<_>>(),
        Ok(Err(e)) => {
            ::log::debug!("Cookie button lookup failed: {}", e);
            return None;
        }
        Err(_) => {
            ::log::debug!("Cookie button lookup timed out after {:?}", limit);
            return None;
        }
    };

    pick_accept_label(&buttons)
}

/// Prefer accept-like buttons inside a cookie banner, then any cookie or accept button.
pub fn pick_accept_label(buttons: &[ButtonCandidate]) -> Option<String> {
    let banner_match = buttons
        .iter()
        .filter(|button| button.in_banner)
        .take(BANNER_CANDIDATES)
        .find(|button| matches_accept(&button.text.to_lowercase()));
    if let Some(button) = banner_match {
        return Some(button.text.clone());
    }

    buttons
        .iter()
        .take(ANY_BUTTON_CANDIDATES)
        .find(|button| {
            let lowered = button.text.to_lowercase();
            lowered.contains("cookie") || matches_accept(&lowered)
        })
        .map(|button| button.text.clone())
}

/// Press the button labelled `label`. Failures are logged and otherwise ignored.
pub async fn accept(renderer: &dyn Renderer, label: &str, timeout: Duration) {
    match renderer.click_button(label, timeout).await {
        Ok(()) => ::log::debug!("Accepted cookie banner via {:?}", label),
        Err(e) => ::log::debug!("Could not click cookie button {:?}: {}", label, e),
    }
}

fn matches_accept(lowered: &str) -> bool {
    !lowered.is_empty() && ACCEPT_PATTERNS.iter().any(|pattern| lowered.contains(pattern))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn button(text: &str, in_banner: bool) -> ButtonCandidate {
        ButtonCandidate {
            text: text.to_string(),
            in_banner,
        }
    }

    #[test]
    fn test_prefers_banner_buttons() {
        let buttons = vec![
            button("Accept reservation terms", false),
            button("Einstellungen", true),
            button("Alle akzeptieren", true),
        ];
        assert_eq!(pick_accept_label(&buttons).as_deref(), Some("Alle akzeptieren"));
    }

    #[test]
    fn test_falls_back_to_any_button() {
        let buttons = vec![
            button("Speisekarte", false),
            button("Cookie settings", false),
            button("Accetta", false),
        ];
        assert_eq!(pick_accept_label(&buttons).as_deref(), Some("Cookie settings"));
    }

    #[test]
    fn test_no_candidate() {
        let buttons = vec![button("Reservieren", false), button("", true)];
        assert_eq!(pick_accept_label(&buttons), None);
        assert_eq!(pick_accept_label(&[]), None);
    }

    #[test]
    fn test_only_first_twenty_buttons_are_considered() {
        let mut buttons: Vec<ButtonCandidate> =
            (0..20).map(|i| button(&format!("Tab {}", i), false)).collect();
        buttons.push(button("Accept", false));
        assert_eq!(pick_accept_label(&buttons), None);
    }
}
