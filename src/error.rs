use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::domain::conversion::{ConversionError, ConversionFailure, JobError};
use crate::domain::tts::TtsError;

/// Main application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    BadRequest(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("{error}")]
    Conversion {
        error: ConversionError,
        segment_index: Option<usize>,
    },

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_segment: Option<usize>,
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Conversion { error, .. } => match error {
                ConversionError::EmptyInput => StatusCode::BAD_REQUEST,
                ConversionError::Cancelled => StatusCode::CONFLICT,
                ConversionError::Tts(TtsError::RateLimited(_)) => StatusCode::TOO_MANY_REQUESTS,
                ConversionError::Tts(TtsError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
                ConversionError::Tts(_) | ConversionError::Audio(_) => StatusCode::BAD_GATEWAY,
            },
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Internal(_) => "internal_error",
            Self::Conversion { error, .. } => error.code(),
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.code().to_string(),
            message: self.to_string(),
            failed_segment: match self {
                Self::Conversion { segment_index, .. } => *segment_index,
                _ => None,
            },
        }
    }
}

impl From<ConversionFailure> for AppError {
    fn from(failure: ConversionFailure) -> Self {
        AppError::Conversion {
            error: failure.error,
            segment_index: failure.segment_index,
        }
    }
}

impl From<JobError> for AppError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::NotFound(_) | JobError::SegmentNotFound { .. } => {
                AppError::NotFound(err.to_string())
            }
            JobError::StillRunning(_)
            | JobError::NotResumable(_)
            | JobError::NoAudio(_)
            | JobError::SegmentNotReady { .. } => AppError::Conflict(err.to_string()),
            JobError::EmptyInput => AppError::Conversion {
                error: ConversionError::EmptyInput,
                segment_index: None,
            },
        }
    }
}

/// Implement IntoResponse for automatic conversion in handlers
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(
                error = %self,
                code = self.code(),
                status = %status.as_u16(),
                "Request failed"
            );
        } else {
            tracing::warn!(
                error = %self,
                code = self.code(),
                status = %status.as_u16(),
                "Request rejected"
            );
        }

        (status, Json(self.to_response())).into_response()
    }
}

/// Custom result type for the application
pub type AppResult<T> = Result<T, AppError>;
