use std::time::Duration;

use thiserror::Error;

use crate::code::EntropyError;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("short code not found: {0}")]
    NotFound(String),

    #[error("origin must not be empty")]
    InvalidOrigin,

    #[error("no short code could be allocated for '{origin}' after {attempts} attempt(s)")]
    AllocationExhausted {
        origin: String,
        attempts: u32,
        #[source]
        cause: Option<EntropyError>,
    },

    #[error("storage failure while {context}: {source}")]
    Storage {
        context: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("operation did not finish within {0:?}")]
    Timeout(Duration),
}

impl StoreError {
    pub(crate) fn storage(context: impl Into<String>, source: sqlx::Error) -> Self {
        Self::Storage {
            context: context.into(),
            source,
        }
    }

    /// `true` for failures the caller may retry later as a whole request.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::AllocationExhausted { .. } | Self::Timeout(_))
    }
}
