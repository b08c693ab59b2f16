//! Error taxonomy for the resolution engine.
//!
//! Parse absence has no variant here: a selector that matches nothing is
//! modelled as `None` or an empty `Vec`.

use thiserror::Error;

/// Failure of a single outbound request.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("upstream returned HTTP {status} for {url}")]
    BadStatus { url: String, status: u16 },

    #[error("could not connect to {url}: {message}")]
    Connect { url: String, message: String },

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("failed to read response body from {url}: {message}")]
    Body { url: String, message: String },

    #[error("request to {url} failed: {message}")]
    Other { url: String, message: String },
}

impl FetchError {
    /// The host answered that the resource does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::BadStatus { status: 404 | 410, .. })
    }

    /// The host could not be reached at all.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, FetchError::Timeout { .. } | FetchError::Connect { .. })
    }

    /// Classify a reqwest failure for `url`.
    pub fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        let url = url.to_string();
        if err.is_timeout() {
            FetchError::Timeout { url }
        } else if err.is_connect() {
            FetchError::Connect {
                url,
                message: err.to_string(),
            }
        } else if let Some(status) = err.status() {
            FetchError::BadStatus {
                url,
                status: status.as_u16(),
            }
        } else if err.is_body() || err.is_decode() {
            FetchError::Body {
                url,
                message: err.to_string(),
            }
        } else {
            FetchError::Other {
                url,
                message: err.to_string(),
            }
        }
    }
}

/// Failure of the stream extraction delegate.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("no playable source found in {url}")]
    NoPlayableSource { url: String },

    #[error("unsupported server url: {0}")]
    Unsupported(String),
}

/// Failure of a whole use case.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The final fallback step failed against the upstream host.
    #[error("upstream request failed: {0}")]
    Upstream(#[from] FetchError),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Failure of the request dispatcher.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("missing required parameter '{0}'")]
    MissingParam(&'static str),

    #[error("unknown action '{0}'")]
    UnknownAction(String),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("failed to serialize response: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Configuration loading failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}
