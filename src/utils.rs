use std::collections::HashSet;
use std::hash::Hash;

/// Maximum number of language codes reported for a menu.
pub const MAX_LANGUAGES: usize = 3;

/// Keep the first item for every key, preserving order.
pub fn dedup_by_key<T, K, F>(items: impl IntoIterator<Item = T>, mut key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: FnMut(&T) -> K,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(key(item)))
        .collect()
}

/// Cut `text` to at most `max_chars` characters without splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

/// Keyword heuristic for very short texts and for enriching detector output.
pub fn guess_languages(text: &str) -> Vec<String> {
    const KEYWORDS: [(&str, &[&str]); 4] = [
        ("de", &["und", "speisekarte", "getränke", "wein", "mittagessen"]),
        ("en", &["and", "menu", "wine"]),
        ("fr", &["et", "carte", "vin", "desserts"]),
        ("it", &["e", "vino", "carta"]),
    ];

    let lowered = text.to_lowercase();
    let langs = KEYWORDS
        .iter()
        .filter(|(_, words)| words.iter().any(|word| lowered.contains(word)))
        .map(|(code, _)| code.to_string());
    let mut langs = dedup_by_key(langs, |code| code.clone());
    langs.truncate(MAX_LANGUAGES);
    langs
}

/// Languages of a document text: statistical detection plus keyword enrichment.
///
/// Texts shorter than 50 characters only get the keyword heuristic. The result
/// is deduplicated, capped at three codes and falls back to `["unknown"]`.
pub fn detect_languages(text: &str) -> Vec<String> {
    let mut langs = Vec::new();
    if text.chars().count() >= 50 {
        if let Some(code) = whatlang::detect_lang(text).and_then(iso_639_1) {
            langs.push(code.to_string());
        }
    }
    langs.extend(guess_languages(text));

    let mut langs = dedup_by_key(langs, |code| code.clone());
    langs.truncate(MAX_LANGUAGES);
    if langs.is_empty() {
        langs.push("unknown".to_string());
    }
    langs
}

fn iso_639_1(lang: whatlang::Lang) -> Option<&'static str> {
    match lang {
        whatlang::Lang::Deu => Some("de"),
        whatlang::Lang::Eng => Some("en"),
        whatlang::Lang::Fra => Some("fr"),
        whatlang::Lang::Ita => Some("it"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_by_key_keeps_first() {
        let items = vec![("a", 1), ("b", 2), ("a", 3), ("c", 4), ("b", 5)];
        let result = dedup_by_key(items, |(key, _)| *key);
        assert_eq!(result, vec![("a", 1), ("b", 2), ("c", 4)]);
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("Getränke", 6), "Geträn");
        assert_eq!(truncate_chars("short", 100), "short");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn test_guess_languages() {
        assert!(guess_languages("Speisekarte und Getränke").contains(&"de".to_string()));
        assert!(guess_languages("Menu and wine selection").contains(&"en".to_string()));

        let mixed = guess_languages("Menu und carte e wine");
        assert_eq!(mixed.len(), 3);
        assert_eq!(mixed, vec!["de", "en", "fr"]);

        assert!(guess_languages("xyz").is_empty());
    }

    #[test]
    fn test_detect_languages_short_text_uses_keywords() {
        assert_eq!(detect_languages("und"), vec!["de"]);
        assert_eq!(detect_languages(""), vec!["unknown"]);
    }

    #[test]
    fn test_detect_languages_long_german_text() {
        let text = "Unsere Speisekarte bietet regionale Gerichte aus frischen Zutaten, \
                    dazu eine grosse Auswahl an Weinen aus der Schweiz und Italien.";
        let langs = detect_languages(text);
        assert_eq!(langs[0], "de");
        assert!(langs.len() <= MAX_LANGUAGES);
    }
}
