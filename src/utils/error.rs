//! Error types shared across the engine
//!
//! Validation of caller input and failures of the optional live enrichment.

use thiserror::Error;

/// Caller input rejected before any estimation runs
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Keyword was empty or whitespace only
    #[error("Keyword cannot be empty")]
    EmptyKeyword,

    /// Keyword list contained no usable entries
    #[error("Keywords cannot be empty")]
    EmptyKeywordList,
}

/// Errors that can occur while fetching live related terms
#[derive(Error, Debug)]
pub enum EnrichmentError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimit,

    /// Portal answered with a non-success status
    #[error("Server error: {0}")]
    ServerError(u16),

    /// Request timeout
    #[error("Request timeout")]
    Timeout,

    /// Content decoding error
    #[error("Decoding error: {0}")]
    Decode(String),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Portal has no live lookup
    #[error("Enrichment not supported for {0}")]
    Unsupported(String),
}

impl EnrichmentError {
    /// Whether the request is worth repeating
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout | Self::RateLimit => true,
            Self::ServerError(status) => matches!(status, 429 | 500 | 502 | 503 | 504),
            Self::Http(e) => e.is_connect() || e.is_timeout(),
            Self::Decode(_) | Self::InvalidUrl(_) | Self::Unsupported(_) => false,
        }
    }
}
