//! Error types for the httpsync CLI.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (4=argument, 5=sync failed, 6=transport, etc.)
//! - Retryability flags for scripted callers
//! - Context-aware recovery hints
//! - Structured JSON output for `--json` consumers

use thiserror::Error;

use crate::sync::SyncError;

/// Result type alias for httpsync operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
///
/// Each code maps to a SCREAMING_SNAKE string and a category-based
/// exit code. Scripts match on the string or the exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Validation (exit 4)
    InvalidArgument,

    // Sync outcome (exit 5)
    SyncFailed,
    SyncInProgress,
    Cancelled,

    // Network (exit 6)
    TransportError,
    ManifestFormatError,

    // Config (exit 7)
    ConfigError,

    // I/O (exit 8)
    IoError,
    JsonError,
    FilesystemError,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::SyncFailed => "SYNC_FAILED",
            Self::SyncInProgress => "SYNC_IN_PROGRESS",
            Self::Cancelled => "CANCELLED",
            Self::TransportError => "TRANSPORT_ERROR",
            Self::ManifestFormatError => "MANIFEST_FORMAT_ERROR",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::FilesystemError => "FILESYSTEM_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code (1-8).
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::InvalidArgument => 4,
            Self::SyncFailed | Self::SyncInProgress | Self::Cancelled => 5,
            Self::TransportError | Self::ManifestFormatError => 6,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError | Self::FilesystemError => 8,
        }
    }

    /// Whether running the same command again may succeed.
    ///
    /// True for network failures and overlapping runs. False for
    /// malformed input, configuration or internal errors.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::TransportError | Self::SyncInProgress | Self::SyncFailed
        )
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in httpsync CLI operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("Sync failed: {0}")]
    SyncFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Sync(e) => match e {
                SyncError::Transport { .. } => ErrorCode::TransportError,
                SyncError::ManifestFormat(_) => ErrorCode::ManifestFormatError,
                SyncError::Filesystem { .. } => ErrorCode::FilesystemError,
                SyncError::InProgress { .. } => ErrorCode::SyncInProgress,
                SyncError::Cancelled => ErrorCode::Cancelled,
            },
            Self::SyncFailed(_) => ErrorCode::SyncFailed,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Context-aware recovery hint.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::Sync(SyncError::Transport { url, .. }) => Some(format!(
                "Check that the server is reachable and serves {url}. \
                 Use `--timeout` to allow slower responses."
            )),

            Self::Sync(SyncError::ManifestFormat(_)) => Some(
                "The manifest must be a JSON object of path -> {\"hash\", \"size\"}. \
                 Generate one with `httpsync manifest <dir>`."
                    .to_string(),
            ),

            Self::Sync(SyncError::InProgress { root }) => Some(format!(
                "Another sync is writing to {}. Wait for it to finish.",
                root.display()
            )),

            Self::SyncFailed(_) => Some(
                "Some files could not be synced. Run again to retry, \
                 or use `-v` to see each failure."
                    .to_string(),
            ),

            Self::Config(_) => Some(
                "Check the config file (default ~/.httpsync/config.json) \
                 and the HTTPSYNC_* environment variables."
                    .to_string(),
            ),

            Self::InvalidArgument(msg) => {
                if msg.contains("algorithm") {
                    Some("Valid algorithms: md5, sha256".to_string())
                } else if msg.contains("URL") {
                    Some("Pass --url or set HTTPSYNC_URL, e.g. http://127.0.0.1:8080/".to_string())
                } else {
                    None
                }
            }

            Self::Sync(SyncError::Filesystem { .. } | SyncError::Cancelled)
            | Self::Io(_)
            | Self::Json(_)
            | Self::Other(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    ///
    /// Includes error code, message, retryability, exit code, and
    /// optional recovery hint.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_sync_errors_map_to_codes() {
        let transport: Error = SyncError::transport("http://h/md5", "HTTP 404 Not Found").into();
        assert_eq!(transport.error_code(), ErrorCode::TransportError);
        assert_eq!(transport.exit_code(), 6);

        let manifest: Error = SyncError::ManifestFormat("not an object".into()).into();
        assert_eq!(manifest.error_code().as_str(), "MANIFEST_FORMAT_ERROR");

        let busy: Error = SyncError::InProgress { root: PathBuf::from("/data") }.into();
        assert_eq!(busy.exit_code(), 5);
        assert!(busy.error_code().is_retryable());

        let cancelled: Error = SyncError::Cancelled.into();
        assert_eq!(cancelled.error_code(), ErrorCode::Cancelled);
        assert_eq!(cancelled.to_string(), "sync cancelled");
    }

    #[test]
    fn test_structured_json() {
        let err = Error::InvalidArgument("unknown algorithm 'crc32'".into());
        let json = err.to_structured_json();

        assert_eq!(json["error"]["code"], "INVALID_ARGUMENT");
        assert_eq!(json["error"]["exit_code"], 4);
        assert_eq!(json["error"]["retryable"], false);
        assert_eq!(json["error"]["hint"], "Valid algorithms: md5, sha256");
    }

    #[test]
    fn test_no_hint_for_internal() {
        let err = Error::Other("boom".into());
        assert!(err.hint().is_none());
        assert!(err.to_structured_json()["error"].get("hint").is_none());
    }
}
