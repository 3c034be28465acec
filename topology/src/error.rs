use serde::Deserialize;
use thiserror::Error;

/// Error body a compute returns for rejected requests.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub message: Option<String>,
    pub status: Option<u16>,
}

/// Failures talking to a compute.
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("invalid compute URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to reach compute: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("compute rejected request ({status}): {message}")]
    Api { status: u16, message: String },
}

impl ComputeError {
    /// Build an `Api` error from a non-success response body, preferring the
    /// structured form and falling back to the raw text.
    pub(crate) fn from_error_body(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorResponse>(body)
            .ok()
            .and_then(|e| e.message)
            .unwrap_or_else(|| body.trim().to_string());
        ComputeError::Api { status, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_error_body() {
        let err = ComputeError::from_error_body(409, r#"{"message": "Node is locked", "status": 409}"#);
        match err {
            ComputeError::Api { status, message } => {
                assert_eq!(status, 409);
                assert_eq!(message, "Node is locked");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_raw_error_body_fallback() {
        let err = ComputeError::from_error_body(502, "bad gateway\n");
        match err {
            ComputeError::Api { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "bad gateway");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
