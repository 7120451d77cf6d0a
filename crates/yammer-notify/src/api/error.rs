//! API gateway error types.

use reqwest::StatusCode;
use thiserror::Error;

/// Result type for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors that can occur while talking to the Yammer API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A relative path could not be resolved against the base URL.
    #[error("Invalid URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    /// The request body could not be serialized.
    #[error("Failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    /// The request never produced a response.
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Anything other than 200 OK.
    #[error("Unexpected response status {status} from {url}")]
    UnexpectedStatus { status: StatusCode, url: String },

    /// The body did not match the expected shape.
    #[error("Failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    /// Status code of an `UnexpectedStatus` error.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when the server rejected the access token.
    ///
    /// Such errors are still treated like any other failed poll; this only
    /// lets callers point the user at `login`.
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_detection() {
        let err = ApiError::UnexpectedStatus {
            status: StatusCode::UNAUTHORIZED,
            url: "https://example.test/users/current.json".to_string(),
        };
        assert!(err.is_unauthorized());
        assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));

        let err = ApiError::UnexpectedStatus {
            status: StatusCode::SERVICE_UNAVAILABLE,
            url: "https://example.test/messages/private.json".to_string(),
        };
        assert!(!err.is_unauthorized());
    }

    #[test]
    fn test_display_mentions_status_and_url() {
        let err = ApiError::UnexpectedStatus {
            status: StatusCode::NOT_FOUND,
            url: "https://example.test/users/7.json".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("404"));
        assert!(text.contains("users/7.json"));
    }
}
