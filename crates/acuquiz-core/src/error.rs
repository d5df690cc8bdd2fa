//! Error types shared across acuquiz.
//!
//! Every enum here describes an expected, recoverable condition. Callers
//! branch on them; none of them is meant to abort a quiz run.

use thiserror::Error;

/// A single bank could not be loaded.
///
/// The catalog logs these and keeps loading the remaining banks.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The key is not present in the registry.
    #[error("unknown bank: {key}")]
    UnknownBank { key: String },

    /// The registry points at a source that cannot be read.
    #[error("bank {key}: resource unavailable: {message}")]
    ResourceMissing { key: String, message: String },

    /// The source bytes are not valid UTF-8.
    #[error("bank {key}: text is not valid UTF-8")]
    InvalidEncoding { key: String },
}

impl ParseError {
    /// Key of the bank that failed.
    pub fn bank_key(&self) -> &str {
        match self {
            ParseError::UnknownBank { key }
            | ParseError::ResourceMissing { key, .. }
            | ParseError::InvalidEncoding { key } => key,
        }
    }
}

/// Quiz session operations refused in the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("no bank selected")]
    NoBankSelected,

    #[error("quantity must be at least 1")]
    InvalidQuantity,

    /// Every entry of the bank has already been drawn.
    #[error("no remaining items in this bank")]
    NoRemainingItems,

    /// Mark-correct / mark-wrong without a live item.
    #[error("no item is currently live")]
    NoLiveItem,

    #[error("no quiz batch has been started")]
    NoBatch,
}

/// Writing the used-items document failed.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to serialize used items: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write used items to {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur when talking to a text-generation backend.
///
/// Defined here so the gateway can classify failures without string
/// matching; the providers crate returns these inside `anyhow::Error`.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Authentication failed (invalid API key).
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),
}

/// Failure of a remote gateway step. Never escapes the gateway; it selects
/// the fallback path.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("no text generator configured")]
    Offline,

    #[error("remote call exceeded {0}s")]
    Timeout(u64),

    #[error("remote call failed: {0:#}")]
    Remote(#[from] anyhow::Error),

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}
