use crate::error::UrlError;
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

/// Language codes the sites publish mirrored content under.
pub const LANGUAGE_CODES: [&str; 4] = ["de", "en", "fr", "it"];

const LANGUAGE_QUERY_KEYS: [&str; 2] = ["lang", "language"];

/// Documents and data files that are fetched directly rather than rendered.
static NON_RENDERABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\.(pdf|png|jpe?g|gif|bmp|svg|webp|txt|csv|json|xml)([?#]|$)")
        .expect("non-renderable pattern is valid")
});

/// Resolve `reference` against `base`. Absolute references are returned unchanged.
pub fn normalize(base: &str, reference: &str) -> Result<String, UrlError> {
    let reference = reference.trim();
    if Url::parse(reference).is_ok() {
        return Ok(reference.to_string());
    }

    let base_url = Url::parse(base).map_err(|source| UrlError::Parse {
        url: base.to_string(),
        source,
    })?;
    base_url
        .join(reference)
        .map(|joined| joined.to_string())
        .map_err(|source| UrlError::Parse {
            url: reference.to_string(),
            source,
        })
}

/// Host plus explicit port, the part two URLs must share to be on one site.
pub fn authority(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host.to_ascii_lowercase(), port),
        None => host.to_ascii_lowercase(),
    })
}

/// Whether `url` lives on `root`'s authority or one of its subdomains.
pub fn same_site(root: &str, url: &str) -> bool {
    let (Ok(root), Ok(url)) = (Url::parse(root), Url::parse(url)) else {
        return false;
    };
    let (Some(root_authority), Some(url_authority)) = (authority(&root), authority(&url)) else {
        return false;
    };

    url_authority == root_authority || url_authority.ends_with(&format!(".{}", root_authority))
}

/// Strip language path segments and language query parameters so that
/// mirrored pages (`/de/menu`, `/en/menu`, `/menu?lang=fr`) share one key.
pub fn canonicalize_language(url: &str) -> String {
    let (before_fragment, fragment) = match url.split_once('#') {
        Some((head, fragment)) => (head, Some(fragment)),
        None => (url, None),
    };
    let (before_query, query) = match before_fragment.split_once('?') {
        Some((head, query)) => (head, Some(query)),
        None => (before_fragment, None),
    };
    let (origin, path) = split_origin(before_query);

    let query = query.map(strip_language_params).filter(|q| !q.is_empty());
    let mut path = strip_language_segments(path);

    if query.is_none() && fragment.is_none() && path.ends_with("//") {
        path = format!("{}/", path.trim_end_matches('/'));
    }

    let mut canonical = format!("{}{}", origin, path);
    if let Some(query) = query {
        canonical.push('?');
        canonical.push_str(&query);
    }
    if let Some(fragment) = fragment {
        canonical.push('#');
        canonical.push_str(fragment);
    }
    canonical
}

/// `url` without its `#fragment`; in-page anchors point at the same document.
pub fn strip_fragment(url: &str) -> &str {
    url.split_once('#').map_or(url, |(head, _)| head)
}

/// Whether a URL should be loaded in the browser, as opposed to a document or data file.
pub fn is_renderable(url: &str) -> bool {
    !NON_RENDERABLE.is_match(url)
}

/// Split `scheme://authority` from the path. URLs without an authority are all path.
fn split_origin(url: &str) -> (&str, &str) {
    let Some(scheme_end) = url.find("://") else {
        return ("", url);
    };
    let authority_start = scheme_end + 3;
    match url[authority_start..].find('/') {
        Some(offset) => url.split_at(authority_start + offset),
        None => (url, ""),
    }
}

fn is_language_code(segment: &str) -> bool {
    LANGUAGE_CODES
        .iter()
        .any(|code| segment.eq_ignore_ascii_case(code))
}

fn strip_language_segments(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').collect();
    let ends_with_language = segments.last().is_some_and(|last| is_language_code(last));

    let mut kept: Vec<&str> = segments
        .into_iter()
        .enumerate()
        .filter(|(index, segment)| *index == 0 || !is_language_code(segment))
        .map(|(_, segment)| segment)
        .collect();
    if ends_with_language {
        kept.push("");
    }
    kept.join("/")
}

fn strip_language_params(query: &str) -> String {
    query
        .split('&')
        .filter(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let is_language_key = LANGUAGE_QUERY_KEYS
                .iter()
                .any(|k| key.eq_ignore_ascii_case(k));
            !(is_language_key && is_language_code(value))
        })
        .collect::<Vec<_>>()
        .join("&")
}
