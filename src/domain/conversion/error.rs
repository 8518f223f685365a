use super::model::SegmentState;
use crate::domain::audio::AudioError;
use crate::domain::tts::TtsError;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    #[error("no text to convert")]
    EmptyInput,
    #[error(transparent)]
    Tts(#[from] TtsError),
    #[error(transparent)]
    Audio(#[from] AudioError),
    #[error("conversion cancelled")]
    Cancelled,
}

impl ConversionError {
    /// Stable marker for callers that branch on the failure class
    pub fn code(&self) -> &'static str {
        match self {
            ConversionError::EmptyInput => "empty_input",
            ConversionError::Cancelled => "cancelled",
            ConversionError::Audio(AudioError::FormatMismatch { .. }) => "format_mismatch",
            ConversionError::Audio(_) => "malformed_container",
            ConversionError::Tts(err) => match err {
                TtsError::RateLimited(_) => "rate_limited",
                TtsError::Unauthorized(_) => "upstream_unauthorized",
                TtsError::Forbidden(_) => "upstream_forbidden",
                TtsError::NotFound(_) => "upstream_not_found",
                TtsError::Rejected { .. } => "upstream_rejected",
                TtsError::Server { .. } => "upstream_error",
                TtsError::Timeout(_) => "timeout",
                TtsError::Network(_) => "network_error",
                TtsError::MalformedResponse(_) => "malformed_response",
                TtsError::MalformedContainer(_) => "malformed_container",
                TtsError::Cancelled => "cancelled",
            },
        }
    }
}

/// A run that did not produce audio, with everything needed to report or resume it
#[derive(Debug, Clone, thiserror::Error)]
#[error("{error}")]
pub struct ConversionFailure {
    pub error: ConversionError,
    pub segment_index: Option<usize>,
    pub segments: Vec<SegmentState>,
}

impl ConversionFailure {
    pub fn new(
        error: ConversionError,
        segment_index: Option<usize>,
        segments: Vec<SegmentState>,
    ) -> Self {
        Self {
            error,
            segment_index,
            segments,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobError {
    #[error("conversion {0} not found")]
    NotFound(Uuid),
    #[error("conversion {0} is still running")]
    StillRunning(Uuid),
    #[error("conversion {0} has nothing to resume")]
    NotResumable(Uuid),
    #[error("conversion {0} has no audio yet")]
    NoAudio(Uuid),
    #[error("conversion {id} has no segment {index}")]
    SegmentNotFound { id: Uuid, index: usize },
    #[error("segment {index} of conversion {id} has not completed")]
    SegmentNotReady { id: Uuid, index: usize },
    #[error("no text to convert")]
    EmptyInput,
}
