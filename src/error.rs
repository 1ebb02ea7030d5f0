use thiserror::Error;

pub type Result<T> = std::result::Result<T, WikiError>;

/// Failure to retrieve a page. The tree is never touched when this happens.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("{url} is not an HTML page (content type {content_type})")]
    NotHtml { url: String, content_type: String },
    #[error("no page known for {url}")]
    NotFound { url: String },
    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// The page arrived but did not have the shape of a wiki article.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("{url} has no element with id \"{id}\"")]
    MissingContent { url: String, id: String },
    #[error("{url} has no page title")]
    MissingTitle { url: String },
}

#[derive(Debug, Error)]
pub enum WikiError {
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),
    #[error("Extract error: {0}")]
    Extract(#[from] ExtractError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Script error: {0}")]
    Script(String),
    #[error("Error: {0}")]
    Generic(String),
}

impl WikiError {
    /// Fetch and extract failures are reported to the user and otherwise
    /// ignored; everything else aborts the current command.
    pub fn is_page_failure(&self) -> bool {
        matches!(self, WikiError::Fetch(_) | WikiError::Extract(_))
    }
}

impl From<String> for WikiError {
    fn from(error: String) -> Self {
        WikiError::Generic(error)
    }
}
