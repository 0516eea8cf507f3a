//! Crate-wide error type
//!
//! Each subsystem keeps its own error enum ([`ValidationError`],
//! [`EnrichmentError`], [`StoreError`]) and [`Error`] folds them together for
//! the analyzer, the HTTP API and the history store. [`RadarErrorTrait`] gives
//! callers a uniform way to ask whether a failure is worth retrying and how to
//! label it in logs.
//!
//! ```rust,ignore
//! use keyword_radar::error::{Error, RadarErrorTrait};
//!
//! fn report(err: &Error) {
//!     tracing::warn!(kind = err.kind(), retry = err.is_recoverable(), "{err}");
//! }
//! ```

use std::io;
use thiserror::Error;

pub use crate::sync::error::StoreError;
pub use crate::utils::error::{EnrichmentError, ValidationError};

pub trait RadarErrorTrait: std::error::Error {
    /// Another attempt may succeed
    fn is_recoverable(&self) -> bool;

    fn category(&self) -> ErrorCategory;

    /// Stable snake_case label used in logs
    fn kind(&self) -> &'static str;
}

/// Which subsystem a failure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Caller supplied an unusable keyword or list
    Validation,
    /// Live portal lookups
    Network,
    /// External page store
    Sync,
    /// SQLite history, export files, JSON
    Storage,
    Config,
    Other,
}

impl RadarErrorTrait for ValidationError {
    fn is_recoverable(&self) -> bool {
        false
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Validation
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::EmptyKeyword => "empty_keyword",
            Self::EmptyKeywordList => "empty_keyword_list",
        }
    }
}

impl RadarErrorTrait for EnrichmentError {
    fn is_recoverable(&self) -> bool {
        self.is_retryable()
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Network
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Http(_) => "enrichment_http",
            Self::RateLimit => "enrichment_rate_limited",
            Self::ServerError(_) => "enrichment_status",
            Self::Timeout => "enrichment_timeout",
            Self::Decode(_) => "enrichment_decode",
            Self::InvalidUrl(_) => "enrichment_invalid_url",
            Self::Unsupported(_) => "enrichment_unsupported",
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Enrichment error: {0}")]
    Enrichment(#[from] EnrichmentError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// History database failure
    #[error("History error: {0}")]
    History(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Settings that cannot support the requested analysis
    #[error("Config error: {0}")]
    Config(String),

    #[error("{context}")]
    Other {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl RadarErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Validation(e) => e.is_recoverable(),
            Self::Enrichment(e) => e.is_recoverable(),
            Self::Store(e) => e.is_recoverable(),
            Self::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
            ),
            Self::History(_) | Self::Json(_) | Self::Config(_) | Self::Other { .. } => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_) => ErrorCategory::Validation,
            Self::Enrichment(e) => e.category(),
            Self::Store(e) => e.category(),
            Self::History(_) | Self::Io(_) | Self::Json(_) => ErrorCategory::Storage,
            Self::Config(_) => ErrorCategory::Config,
            Self::Other { .. } => ErrorCategory::Other,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Validation(e) => e.kind(),
            Self::Enrichment(e) => e.kind(),
            Self::Store(e) => e.kind(),
            Self::History(_) => "history",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
            Self::Config(_) => "config",
            Self::Other { .. } => "other",
        }
    }
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn other(context: impl Into<String>) -> Self {
        Self::Other {
            context: context.into(),
            source: None,
        }
    }

    pub fn with_source(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Other {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    fn store_status(status: u16) -> Error {
        Error::from(StoreError::Status {
            status,
            body: String::new(),
        })
    }

    #[test]
    fn test_categories_follow_subsystem() {
        assert_eq!(
            Error::from(EnrichmentError::Timeout).category(),
            ErrorCategory::Network
        );
        assert_eq!(
            Error::from(ValidationError::EmptyKeyword).category(),
            ErrorCategory::Validation
        );
        assert_eq!(store_status(400).category(), ErrorCategory::Sync);
        assert_eq!(
            Error::config("empty window").category(),
            ErrorCategory::Config
        );
    }

    #[test]
    fn test_recoverable_only_for_transient_failures() {
        assert!(Error::from(EnrichmentError::Timeout).is_recoverable());
        assert!(Error::from(StoreError::Timeout).is_recoverable());
        assert!(store_status(503).is_recoverable());
        assert!(!store_status(404).is_recoverable());
        assert!(!Error::from(ValidationError::EmptyKeywordList).is_recoverable());
        assert!(!Error::from(io::Error::from(io::ErrorKind::NotFound)).is_recoverable());
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(Error::from(ValidationError::EmptyKeyword).kind(), "empty_keyword");
        assert_eq!(store_status(500).kind(), "store_status");
        assert_eq!(Error::config("bad").kind(), "config");
    }

    #[test]
    fn test_other_displays_context_only() {
        let source = io::Error::new(io::ErrorKind::InvalidData, "bad timestamp");
        let err = Error::with_source("invalid analyzed_at in history", source);

        assert_eq!(err.to_string(), "invalid analyzed_at in history");
        assert!(std::error::Error::source(&err).is_some());
    }
}
