use crate::utils::truncate_chars;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

static BODY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").unwrap());
static SKIPPED: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("script, style, noscript, template").unwrap());
static EMBEDS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("embed, object, iframe").unwrap());
static ANCHORS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

/// Substrings of an embed target that indicate a PDF viewer.
const PDF_VIEWER_MARKERS: [&str; 2] = ["pdfjs", "viewer"];

/// Visible text of a page, one text node per line, cut to `max_chars`.
pub fn visible_text(html: &str, max_chars: usize) -> String {
    let doc = Html::parse_document(html);
    let root = doc.select(&BODY).next().unwrap_or_else(|| doc.root_element());

    let skipped: Vec<ElementRef> = root.select(&SKIPPED).collect();
    let text = root
        .descendants()
        .filter_map(|node| node.value().as_text().map(|text| (node, text)))
        .filter(|(node, _)| {
            !node.ancestors().any(|ancestor| {
                ElementRef::wrap(ancestor).is_some_and(|element| skipped.contains(&element))
            })
        })
        .map(|(_, text)| text.trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    truncate_chars(&text, max_chars).to_string()
}

/// Targets of embedded documents and anchors that point at PDFs, as written in the markup.
///
/// Embeds, objects and iframes count when their type mentions PDF, their target
/// ends in `.pdf` or the target looks like a PDF viewer. Anchors count when the
/// href ends in `.pdf`.
pub fn pdf_references(html: &str) -> Vec<String> {
    let doc = Html::parse_document(html);
    let mut references = Vec::new();

    for element in doc.select(&EMBEDS) {
        let target = element
            .value()
            .attr("src")
            .or_else(|| element.value().attr("data"))
            .unwrap_or("")
            .trim();
        if target.is_empty() {
            continue;
        }

        let lowered = target.to_lowercase();
        let typed_pdf = element
            .value()
            .attr("type")
            .is_some_and(|t| t.to_lowercase().contains("pdf"));
        if typed_pdf
            || lowered.ends_with(".pdf")
            || PDF_VIEWER_MARKERS.iter().any(|marker| lowered.contains(marker))
        {
            references.push(target.to_string());
        }
    }

    for anchor in doc.select(&ANCHORS) {
        if let Some(href) = anchor.value().attr("href") {
            if href.trim().to_lowercase().ends_with(".pdf") {
                references.push(href.trim().to_string());
            }
        }
    }

    ::log::debug!("HTML scan found {} PDF references", references.len());
    references
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visible_text() {
        let html = "<html><head><title>T</title><style>p{}</style></head><body>\
                    <h1> Speisekarte </h1><script>var x = 1;</script>\
                    <p>Rösti <b>mit</b> Ei</p></body></html>";
        assert_eq!(visible_text(html, 3500), "Speisekarte\nRösti\nmit\nEi");
        assert_eq!(visible_text(html, 5), "Speis");
    }

    #[test]
    fn test_pdf_references() {
        let html = r#"<html><body>
            <iframe src="/viewer/index.html?file=karte.pdf"></iframe>
            <embed src="/files/menu" type="application/pdf">
            <object data="/docs/wine.PDF"></object>
            <iframe src="https://www.youtube.com/embed/abc"></iframe>
            <a href="/download/Mittagsmenu.pdf">Mittag</a>
            <a href="/kontakt">Kontakt</a>
        </body></html>"#;

        assert_eq!(
            pdf_references(html),
            vec![
                "/viewer/index.html?file=karte.pdf",
                "/files/menu",
                "/docs/wine.PDF",
                "/download/Mittagsmenu.pdf",
            ]
        );
    }
}
