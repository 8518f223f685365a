use crate::domain::audio::{extract_payload, AudioFormat, HEADER_LEN};
use crate::domain::text::TextSegment;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl SegmentStatus {
    /// Forward-only lifecycle: Pending -> Processing -> {Completed, Failed, Cancelled}
    pub fn can_transition_to(self, next: SegmentStatus) -> bool {
        matches!(
            (self, next),
            (SegmentStatus::Pending, SegmentStatus::Processing)
                | (SegmentStatus::Processing, SegmentStatus::Completed)
                | (SegmentStatus::Processing, SegmentStatus::Failed)
                | (SegmentStatus::Processing, SegmentStatus::Cancelled)
        )
    }
}

/// Progress of one segment through a conversion run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentState {
    pub index: usize,
    pub text: String,
    status: SegmentStatus,
    payload: Option<Arc<[u8]>>,
}

impl SegmentState {
    pub fn pending(segment: TextSegment) -> Self {
        Self {
            index: segment.index,
            text: segment.content,
            status: SegmentStatus::Pending,
            payload: None,
        }
    }

    pub fn status(&self) -> SegmentStatus {
        self.status
    }

    pub fn payload(&self) -> Option<&[u8]> {
        self.payload.as_deref()
    }

    pub fn is_completed(&self) -> bool {
        self.status == SegmentStatus::Completed
    }

    pub(crate) fn start(&mut self) -> bool {
        self.advance(SegmentStatus::Processing)
    }

    pub(crate) fn complete(&mut self, payload: Vec<u8>) -> bool {
        let advanced = self.advance(SegmentStatus::Completed);
        if advanced {
            self.payload = Some(payload.into());
        }
        advanced
    }

    pub(crate) fn fail(&mut self) -> bool {
        self.advance(SegmentStatus::Failed)
    }

    pub(crate) fn cancel(&mut self) -> bool {
        self.advance(SegmentStatus::Cancelled)
    }

    /// A fresh `Pending` copy for a new run; completed segments keep their audio.
    pub(crate) fn for_resume(self) -> Self {
        if self.is_completed() {
            return self;
        }
        Self {
            index: self.index,
            text: self.text,
            status: SegmentStatus::Pending,
            payload: None,
        }
    }

    fn advance(&mut self, next: SegmentStatus) -> bool {
        if !self.status.can_transition_to(next) {
            tracing::warn!(
                segment_index = self.index,
                from = ?self.status,
                to = ?next,
                "Ignoring invalid segment transition"
            );
            return false;
        }
        self.status = next;
        true
    }

    pub fn snapshot(&self) -> SegmentSnapshot {
        SegmentSnapshot {
            index: self.index,
            text: self.text.clone(),
            status: self.status,
            audio_bytes: self.payload.as_ref().map(|payload| payload.len()),
            audio: self.payload.clone(),
        }
    }
}

/// Observer-facing view of a [`SegmentState`]
///
/// The audio is shared with the state it was taken from and never serialized; only its
/// size shows up in JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentSnapshot {
    pub index: usize,
    pub text: String,
    pub status: SegmentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_bytes: Option<usize>,
    #[serde(skip)]
    pub audio: Option<Arc<[u8]>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Idle,
    Running,
    Succeeded,
    Failed,
}

/// Emitted on every run or segment transition, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub run_id: Uuid,
    pub status: RunStatus,
    pub segments: Vec<SegmentSnapshot>,
}

#[derive(Debug, Clone)]
pub struct ConversionOutput {
    pub run_id: Uuid,
    pub audio: Vec<u8>,
    pub format: AudioFormat,
    pub segments: Vec<SegmentState>,
}

impl ConversionOutput {
    /// Playback length of the merged audio
    pub fn duration(&self) -> Duration {
        let payload_len = extract_payload(&self.audio)
            .map(|region| region.size)
            .unwrap_or_else(|_| self.audio.len().saturating_sub(HEADER_LEN));
        self.format.duration_of(payload_len)
    }
}
