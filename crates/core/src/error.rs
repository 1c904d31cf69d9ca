//! Error types for the petmind domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use regex_lite::Regex;
use std::sync::LazyLock;
use thiserror::Error;

/// The top-level error type for petmind setup paths.
///
/// Runtime failures stay in their bounded-context types. This wraps them where
/// a binary needs one error to report, such as loading config and building the
/// dispatcher at startup.
#[derive(Debug, Error)]
pub enum Error {
    // --- Dispatcher errors ---
    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Errors raised by an AI dispatcher.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by dispatcher, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// No usable model or credential. Raised at setup time, never on the
    /// per-event ladder.
    #[error("Dispatcher not configured: {0}")]
    NotConfigured(String),

    #[error("{0}")]
    Other(String),
}

/// How the degradation ladder treats a dispatcher failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// Connectivity lost; jumps straight to local responses.
    Network,
    /// Exceeded the level's time budget; single step down.
    Timeout,
    /// Anything else; counted towards the consecutive-error threshold.
    Other,
}

static NETWORK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)network|offline|fetch|net::|connection (refused|reset)|dns")
        .expect("network pattern is valid")
});

static TIMEOUT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)timeout|timed out|超时").expect("timeout pattern is valid")
});

impl DispatchError {
    /// Classify this error for the degradation ladder.
    ///
    /// The variant decides first. Untyped errors (`ApiError`, `Other`) fall
    /// back to message patterns, since some backends only report
    /// connectivity problems through their message text.
    pub fn classify(&self) -> FailureClass {
        match self {
            Self::Network(_) => FailureClass::Network,
            Self::Timeout(_) => FailureClass::Timeout,
            Self::ApiError { message, .. } | Self::Other(message) => classify_message(message),
            Self::RateLimited { .. } | Self::AuthenticationFailed(_) | Self::NotConfigured(_) => {
                FailureClass::Other
            }
        }
    }
}

fn classify_message(message: &str) -> FailureClass {
    if NETWORK_PATTERN.is_match(message) {
        FailureClass::Network
    } else if TIMEOUT_PATTERN.is_match(message) {
        FailureClass::Timeout
    } else {
        FailureClass::Other
    }
}

/// Errors from the key/value persistence collaborator.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Read failed for key '{key}': {reason}")]
    ReadFailed { key: String, reason: String },

    #[error("Write failed for key '{key}': {reason}")]
    WriteFailed { key: String, reason: String },

    #[error("Corrupted value under key '{key}': {reason}")]
    Corrupted { key: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_error_displays_correctly() {
        let err = Error::Dispatch(DispatchError::ApiError {
            status_code: 500,
            message: "Internal Server Error".into(),
        });
        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("Internal Server Error"));
    }

    #[test]
    fn dispatch_error_converts_with_question_mark() {
        fn startup() -> Result<()> {
            let built: std::result::Result<(), DispatchError> =
                Err(DispatchError::NotConfigured("no key".into()));
            built?;
            Ok(())
        }
        let err = startup().unwrap_err();
        assert!(matches!(
            err,
            Error::Dispatch(DispatchError::NotConfigured(_))
        ));
        assert!(err.to_string().contains("no key"));
    }

    #[test]
    fn typed_variants_classify_directly() {
        assert_eq!(
            DispatchError::Network("down".into()).classify(),
            FailureClass::Network
        );
        assert_eq!(
            DispatchError::Timeout("8000ms".into()).classify(),
            FailureClass::Timeout
        );
        assert_eq!(
            DispatchError::RateLimited { retry_after_secs: 5 }.classify(),
            FailureClass::Other
        );
    }

    #[test]
    fn untyped_errors_classify_by_message() {
        assert_eq!(
            DispatchError::Other("net::ERR_INTERNET_DISCONNECTED".into()).classify(),
            FailureClass::Network
        );
        assert_eq!(
            DispatchError::Other("device is offline".into()).classify(),
            FailureClass::Network
        );
        assert_eq!(
            DispatchError::Other("AI 响应超时".into()).classify(),
            FailureClass::Timeout
        );
        assert_eq!(
            DispatchError::ApiError {
                status_code: 504,
                message: "upstream timed out".into(),
            }
            .classify(),
            FailureClass::Timeout
        );
        assert_eq!(
            DispatchError::Other("model refused".into()).classify(),
            FailureClass::Other
        );
    }

    #[test]
    fn storage_error_names_key() {
        let err = StorageError::WriteFailed {
            key: "ai_memory".into(),
            reason: "disk full".into(),
        };
        assert!(err.to_string().contains("ai_memory"));
    }
}
