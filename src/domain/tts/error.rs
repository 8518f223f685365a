use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TtsError {
    #[error("TTS backend rejected the credentials: {0}")]
    Unauthorized(String),
    #[error("TTS backend denied access: {0}")]
    Forbidden(String),
    #[error("TTS endpoint not found: {0}")]
    NotFound(String),
    #[error("TTS rate limit reached: {0}")]
    RateLimited(String),
    #[error("TTS backend rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("TTS backend error ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("TTS request timed out after {0:?}")]
    Timeout(Duration),
    #[error("network error: {0}")]
    Network(String),
    #[error("malformed TTS response: {0}")]
    MalformedResponse(String),
    #[error("malformed audio container: {0}")]
    MalformedContainer(String),
    #[error("synthesis cancelled")]
    Cancelled,
}

impl TtsError {
    /// Transient failures are retried with backoff; everything else aborts the segment.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TtsError::Server { .. }
                | TtsError::Timeout(_)
                | TtsError::Network(_)
                | TtsError::MalformedContainer(_)
        )
    }

    /// Map a non-2xx backend status to its error class
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 => TtsError::Unauthorized(message),
            403 => TtsError::Forbidden(message),
            404 => TtsError::NotFound(message),
            429 => TtsError::RateLimited(message),
            500..=599 => TtsError::Server { status, message },
            _ => TtsError::Rejected { status, message },
        }
    }
}

impl From<reqwest::Error> for TtsError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TtsError::Network(format!("transport timeout: {}", err))
        } else if err.is_decode() {
            TtsError::MalformedResponse(err.to_string())
        } else {
            TtsError::Network(err.to_string())
        }
    }
}
