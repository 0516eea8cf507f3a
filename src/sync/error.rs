//! Page store errors

use thiserror::Error;

use super::DatabaseKind;
use crate::error::{ErrorCategory, RadarErrorTrait};

#[derive(Error, Debug)]
pub enum StoreError {
    /// Transport-level failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success response from the store
    #[error("Store returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Store request timed out")]
    Timeout,

    #[error("No database configured for {0}")]
    MissingDatabase(DatabaseKind),

    #[error("Failed to decode store response: {0}")]
    Decode(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Invalid store configuration: {0}")]
    InvalidConfig(String),
}

impl StoreError {
    /// Whether another attempt may succeed
    ///
    /// Transport failures, timeouts, 429 and 5xx are retryable; every other
    /// status is final.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => !e.is_builder() && !e.is_decode(),
            Self::Timeout => true,
            Self::Status { status, .. } => *status == 429 || (500..600).contains(status),
            _ => false,
        }
    }

    /// Whether a non-idempotent write may be sent again
    ///
    /// Only a 429 rejection or a connection that never opened guarantee the
    /// store did not apply the first request. A timeout or 5xx may follow a
    /// write that already landed.
    pub fn is_safe_to_resend(&self) -> bool {
        match self {
            Self::Http(e) => e.is_connect(),
            Self::Status { status, .. } => *status == 429,
            _ => false,
        }
    }

    /// Map a reqwest failure, separating timeouts
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(err)
        }
    }
}

impl RadarErrorTrait for StoreError {
    fn is_recoverable(&self) -> bool {
        self.is_retryable()
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Sync
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Http(_) => "store_http",
            Self::Status { .. } => "store_status",
            Self::Timeout => "store_timeout",
            Self::MissingDatabase(_) => "store_missing_database",
            Self::Decode(_) => "store_decode",
            Self::Cancelled => "store_cancelled",
            Self::InvalidConfig(_) => "store_invalid_config",
        }
    }
}
