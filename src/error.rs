use thiserror::Error;

/// A URL could not be parsed or resolved against its base.
#[derive(Error, Debug)]
pub enum UrlError {
    #[error("invalid URL {url}: {source}")]
    Parse {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// Failures reported by the rendering collaborator.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("{op} timed out after {millis} ms")]
    Timeout { op: &'static str, millis: u64 },

    #[error("script evaluation failed: {0}")]
    Script(String),

    #[error("no element matched {0}")]
    NotFound(String),

    #[error("webdriver command failed: {0}")]
    Command(#[from] fantoccini::error::CmdError),

    #[error("could not open webdriver session: {0}")]
    Session(String),
}

/// A single link source failed to evaluate; the other sources still count.
#[derive(Error, Debug)]
#[error("link source `{source_name}` failed: {reason}")]
pub struct ExtractionError {
    pub source_name: &'static str,
    pub reason: String,
}

/// The LLM classification service could not produce a usable answer.
#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("classifier request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("classifier returned HTTP {0}")]
    Status(u16),

    #[error("classifier timed out after {0} s")]
    Timeout(u64),

    #[error("classifier returned an empty response")]
    EmptyResponse,

    #[error("malformed classifier response: {0}")]
    Malformed(String),
}

/// Document download failures.
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("download failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("download returned HTTP {0}")]
    Status(u16),

    #[error("download timed out after {0} s")]
    Timeout(u64),
}

/// Per-task parser outcomes that are not a menu record.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("{0} parsing is not implemented")]
    Unsupported(&'static str),
}

/// Errors that end a whole run.
#[derive(Error, Debug)]
pub enum CrawlError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid input in {path}: {source}")]
    Input {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}
