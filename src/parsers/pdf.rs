use crate::config::CrawlConfig;
use crate::error::DownloadError;
use crate::utils::truncate_chars;
use lopdf::content::Content;
use lopdf::{Document, Object, Stream, dictionary};
use regex::bytes::Regex;
use std::sync::LazyLock;
use std::time::Duration;

/// A direct stream length; indirect `N 0 R` lengths do not match.
static STREAM_LENGTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/Length\s+(\d+)\s*(?:/|>>)").expect("stream length pattern is valid")
});

/// Bytes of a downloaded document, possibly cut at the byte cap.
#[derive(Debug, Clone, Default)]
pub struct FetchedDocument {
    pub bytes: Vec<u8>,
    pub content_disposition: Option<String>,
    pub truncated: bool,
}

/// Text recovered from the start of a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentText {
    pub text: String,
    pub content_disposition: Option<String>,
}

/// Streams documents over HTTP up to a byte cap and extracts first-page text.
#[derive(Debug, Clone)]
pub struct DocumentFetcher {
    http: reqwest::Client,
    max_bytes: usize,
    max_chars: usize,
    timeout_secs: u64,
}

impl DocumentFetcher {
    pub fn new(config: &CrawlConfig) -> Result<Self, DownloadError> {
        let timeout_secs = config.timeouts.pdf_request_secs;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            http,
            max_bytes: config.max_pdf_bytes,
            max_chars: config.max_pdf_text_chars,
            timeout_secs,
        })
    }

    /// Download at most `max_bytes` of `url`. A connection that breaks after
    /// the headers keeps whatever arrived.
    pub async fn download(&self, url: &str) -> Result<FetchedDocument, DownloadError> {
        let mut response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| self.map_error(e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status(status.as_u16()));
        }

        let content_disposition = response
            .headers()
            .get(reqwest::header::CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let mut bytes = Vec::new();
        let mut truncated = false;
        loop {
            match response.chunk().await {
                Ok(Some(chunk)) => {
                    bytes.extend_from_slice(&chunk);
                    if bytes.len() >= self.max_bytes {
                        truncated = bytes.len() > self.max_bytes;
                        bytes.truncate(self.max_bytes);
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    ::log::warn!(
                        "Download of {} broke off after {} bytes: {}",
                        url,
                        bytes.len(),
                        self.map_error(e)
                    );
                    break;
                }
            }
        }

        ::log::debug!("Downloaded {} bytes of {}", bytes.len(), url);
        Ok(FetchedDocument {
            bytes,
            content_disposition,
            truncated,
        })
    }

    /// Download `url` and extract the text of its first page. Never fails:
    /// an unreachable or unreadable document yields empty text.
    pub async fn fetch_text(&self, url: &str) -> DocumentText {
        let document = match self.download(url).await {
            Ok(document) => document,
            Err(e) => {
                ::log::warn!("Failed to download {}: {}", url, e);
                return DocumentText::default();
            }
        };
        if document.truncated {
            ::log::debug!("{} exceeds {} bytes, reading the truncated buffer", url, self.max_bytes);
        }

        let max_chars = self.max_chars;
        let bytes = document.bytes;
        let text = match tokio::task::spawn_blocking(move || first_page_text(&bytes, max_chars)).await
        {
            Ok(text) => text,
            Err(e) => {
                ::log::warn!("PDF text extraction of {} aborted: {}", url, e);
                String::new()
            }
        };

        DocumentText {
            text,
            content_disposition: document.content_disposition,
        }
    }

    fn map_error(&self, error: reqwest::Error) -> DownloadError {
        if error.is_timeout() {
            DownloadError::Timeout(self.timeout_secs)
        } else {
            DownloadError::Http(error)
        }
    }
}

/// Text of the first page of a PDF held in memory, cut to `max_chars`.
///
/// When the page tree reports no pages, page objects are searched directly
/// and read one by one. A buffer that does not parse as a whole, such as a
/// download cut at the byte cap, is scanned for content streams instead.
pub fn first_page_text(bytes: &[u8], max_chars: usize) -> String {
    let text = match Document::load_mem(bytes) {
        Ok(doc) => document_text(&doc),
        Err(e) => {
            ::log::debug!("Could not open PDF ({} bytes): {}", bytes.len(), e);
            String::new()
        }
    };
    let text = if text.trim().is_empty() {
        raw_stream_text(bytes)
    } else {
        text
    };

    truncate_chars(&text, max_chars).to_string()
}

fn document_text(doc: &Document) -> String {
    let pages = doc.get_pages();
    match pages.keys().next() {
        Some(first) => doc.extract_text(&[*first]).unwrap_or_else(|e| {
            ::log::debug!("Could not extract text of page {}: {}", first, e);
            String::new()
        }),
        None => {
            ::log::debug!("PDF reports no pages, scanning page objects");
            loose_page_text(doc)
        }
    }
}

/// Text of the first complete `stream ... endstream` body in the raw bytes
/// that decodes to text-showing operations.
fn raw_stream_text(bytes: &[u8]) -> String {
    let mut from = 0;
    while let Some(found) = find(bytes, b"stream", from) {
        from = found + b"stream".len();
        if bytes[..found].ends_with(b"end") {
            continue;
        }

        let mut start = from;
        if bytes[start..].starts_with(b"\r\n") {
            start += 2;
        } else if bytes[start..].starts_with(b"\n") {
            start += 1;
        }
        let Some(end) = find(bytes, b"endstream", start) else {
            break;
        };
        from = end + b"endstream".len();

        let header_start = rfind(&bytes[..found], b"obj").unwrap_or(0);
        let header = &bytes[header_start..found];
        let body = stream_body(header, &bytes[start..end]);
        let data = if find(header, b"/FlateDecode", 0).is_some() {
            let stream = Stream::new(dictionary! { "Filter" => "FlateDecode" }, body.to_vec());
            match stream.decompressed_content() {
                Ok(data) => data,
                Err(_) => continue,
            }
        } else {
            body.to_vec()
        };

        let Ok(content) = Content::decode(&data) else {
            continue;
        };
        let mut text = String::new();
        for operation in &content.operations {
            if matches!(operation.operator.as_str(), "Tj" | "TJ" | "'" | "\"") {
                collect_strings(&operation.operands, &mut text);
            }
        }
        if !text.trim().is_empty() {
            ::log::debug!("Recovered {} characters from a raw content stream", text.len());
            text.push('\n');
            return text;
        }
    }
    String::new()
}

/// The stream data between `stream` and `endstream`, using a direct
/// `/Length` when the dictionary has one.
fn stream_body<'a>(header: &[u8], raw: &'a [u8]) -> &'a [u8] {
    let length = STREAM_LENGTH
        .captures(header)
        .and_then(|caps| std::str::from_utf8(&caps[1]).ok()?.parse::<usize>().ok());
    match length {
        Some(length) if length <= raw.len() => &raw[..length],
        _ => raw
            .strip_suffix(b"\r\n")
            .or_else(|| raw.strip_suffix(b"\n"))
            .or_else(|| raw.strip_suffix(b"\r"))
            .unwrap_or(raw),
    }
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|offset| from + offset)
}

fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .rposition(|window| window == needle)
}

/// Text-showing operands of every page object, in object order.
fn loose_page_text(doc: &Document) -> String {
    let page_ids = doc.objects.iter().filter_map(|(id, object)| {
        let is_page = object
            .as_dict()
            .and_then(|dict| dict.get(b"Type"))
            .and_then(Object::as_name)
            .is_ok_and(|name| name == b"Page");
        is_page.then_some(*id)
    });

    let mut text = String::new();
    for id in page_ids {
        let Ok(content) = doc.get_page_content(id) else {
            continue;
        };
        let Ok(content) = Content::decode(&content) else {
            continue;
        };
        for operation in &content.operations {
            if matches!(operation.operator.as_str(), "Tj" | "TJ" | "'" | "\"") {
                collect_strings(&operation.operands, &mut text);
            }
        }
        if !text.ends_with('\n') {
            text.push('\n');
        }
    }

    if text.trim().is_empty() {
        String::new()
    } else {
        text
    }
}

fn collect_strings(operands: &[Object], out: &mut String) {
    for operand in operands {
        match operand {
            Object::String(bytes, _) => out.push_str(&String::from_utf8_lossy(bytes)),
            Object::Array(items) => collect_strings(items, out),
            _ => {}
        }
    }
}
