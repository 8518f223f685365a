use super::error::{ConversionError, JobError};
use super::model::{
    ConversionOutput, ProgressUpdate, RunStatus, SegmentSnapshot, SegmentState, SegmentStatus,
};
use super::service::{ConversionResult, ConversionService};
use chrono::{DateTime, Utc};
use moka::future::Cache;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Finished jobs nobody has looked at for this long are dropped
pub const DEFAULT_JOB_IDLE_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobFailure {
    pub code: &'static str,
    pub message: String,
}

/// What a caller polling a background conversion gets to see
#[derive(Debug, Clone, Serialize)]
pub struct JobView {
    pub id: Uuid,
    pub status: RunStatus,
    pub segments: Vec<SegmentSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JobFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_segment: Option<usize>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

struct JobEntry {
    status: RunStatus,
    segments: Vec<SegmentSnapshot>,
    error: Option<ConversionError>,
    failed_segment: Option<usize>,
    resumable: Option<Vec<SegmentState>>,
    output: Option<Arc<ConversionOutput>>,
    cancel: CancellationToken,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl JobEntry {
    fn new(cancel: CancellationToken) -> Self {
        let now = Utc::now();
        Self {
            status: RunStatus::Idle,
            segments: Vec::new(),
            error: None,
            failed_segment: None,
            resumable: None,
            output: None,
            cancel,
            created_at: now,
            updated_at: now,
        }
    }

    fn is_active(&self) -> bool {
        matches!(self.status, RunStatus::Idle | RunStatus::Running)
    }

    fn view(&self, id: Uuid) -> JobView {
        JobView {
            id,
            status: self.status,
            segments: self.segments.clone(),
            error: self.error.as_ref().map(|error| JobFailure {
                code: error.code(),
                message: error.to_string(),
            }),
            failed_segment: self.failed_segment,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

type SharedEntry = Arc<RwLock<JobEntry>>;

enum RunInput {
    Text(String),
    Resume(Vec<SegmentState>),
}

/// In-memory table of background conversions. Nothing survives a restart.
///
/// Jobs live in a `moka` cache with a time-to-idle, so a job nobody polls or updates
/// for that long is evicted along with its audio. A running job refreshes itself on
/// every progress update.
#[derive(Clone)]
pub struct ConversionRegistry {
    service: Arc<ConversionService>,
    jobs: Cache<Uuid, SharedEntry>,
}

impl ConversionRegistry {
    pub fn new(service: Arc<ConversionService>, idle_ttl: Duration) -> Self {
        Self {
            service,
            jobs: Cache::builder().time_to_idle(idle_ttl).build(),
        }
    }

    /// Queue a conversion and return its id right away
    pub async fn start(&self, text: String) -> Result<Uuid, JobError> {
        if text.trim().is_empty() {
            return Err(JobError::EmptyInput);
        }

        let id = Uuid::new_v4();
        let cancel = CancellationToken::new();
        let entry = Arc::new(RwLock::new(JobEntry::new(cancel.clone())));
        self.jobs.insert(id, entry.clone()).await;

        tracing::info!(
            job_id = %id,
            text_length = text.chars().count(),
            "Conversion job queued"
        );
        self.spawn_run(id, entry, RunInput::Text(text), cancel);

        Ok(id)
    }

    pub async fn get(&self, id: Uuid) -> Result<JobView, JobError> {
        let entry = self.entry(id).await?;
        let view = entry.read().await.view(id);
        Ok(view)
    }

    /// Ask a running job to stop. Finished jobs are left as they are.
    pub async fn cancel(&self, id: Uuid) -> Result<JobView, JobError> {
        let entry = self.entry(id).await?;
        let entry = entry.read().await;

        if entry.is_active() {
            tracing::info!(job_id = %id, "Cancelling conversion job");
            entry.cancel.cancel();
        }

        Ok(entry.view(id))
    }

    /// Restart a failed job, keeping the audio of segments that already completed
    pub async fn resume(&self, id: Uuid) -> Result<JobView, JobError> {
        let shared = self.entry(id).await?;
        let mut entry = shared.write().await;

        if entry.is_active() {
            return Err(JobError::StillRunning(id));
        }
        let states = entry.resumable.take().ok_or(JobError::NotResumable(id))?;

        let cancel = CancellationToken::new();
        entry.cancel = cancel.clone();
        entry.status = RunStatus::Idle;
        entry.error = None;
        entry.failed_segment = None;
        entry.updated_at = Utc::now();
        let view = entry.view(id);
        drop(entry);

        tracing::info!(
            job_id = %id,
            completed_segments = states.iter().filter(|s| s.is_completed()).count(),
            segment_count = states.len(),
            "Resuming conversion job"
        );
        self.spawn_run(id, shared, RunInput::Resume(states), cancel);

        Ok(view)
    }

    pub async fn audio(&self, id: Uuid) -> Result<Arc<ConversionOutput>, JobError> {
        let entry = self.entry(id).await?;
        let output = entry.read().await.output.clone();
        output.ok_or(JobError::NoAudio(id))
    }

    /// Audio of one completed segment, available while the job is still running
    pub async fn segment_audio(&self, id: Uuid, index: usize) -> Result<Arc<[u8]>, JobError> {
        let entry = self.entry(id).await?;
        let entry = entry.read().await;
        let segment = entry
            .segments
            .get(index)
            .ok_or(JobError::SegmentNotFound { id, index })?;

        match (&segment.status, &segment.audio) {
            (SegmentStatus::Completed, Some(audio)) => Ok(audio.clone()),
            _ => Err(JobError::SegmentNotReady { id, index }),
        }
    }

    async fn entry(&self, id: Uuid) -> Result<SharedEntry, JobError> {
        self.jobs.get(&id).await.ok_or(JobError::NotFound(id))
    }

    fn spawn_run(&self, id: Uuid, entry: SharedEntry, input: RunInput, cancel: CancellationToken) {
        let service = self.service.clone();
        let jobs = self.jobs.clone();

        tokio::spawn(async move {
            let (tx, rx) = mpsc::unbounded_channel::<ProgressUpdate>();
            let run = async move {
                match input {
                    RunInput::Text(text) => service.convert(&text, cancel, Some(tx)).await,
                    RunInput::Resume(states) => service.resume(states, cancel, Some(tx)).await,
                }
            };

            let (result, ()) = tokio::join!(run, track_progress(&jobs, &entry, id, rx));
            record_result(&entry, id, result).await;
            // idle clock of a finished job starts now
            jobs.insert(id, entry).await;
        });
    }
}

/// Fold progress snapshots into the job entry until the run drops its sender.
///
/// Terminal run states are only written by [`record_result`], so a job never reads as
/// failed before its resumable segments are stored.
async fn track_progress(
    jobs: &Cache<Uuid, SharedEntry>,
    entry: &SharedEntry,
    id: Uuid,
    mut rx: mpsc::UnboundedReceiver<ProgressUpdate>,
) {
    while let Some(update) = rx.recv().await {
        {
            let mut entry = entry.write().await;
            if update.status == RunStatus::Running {
                entry.status = RunStatus::Running;
            }
            entry.segments = update.segments;
            entry.updated_at = Utc::now();
        }
        jobs.insert(id, entry.clone()).await;
    }
}

async fn record_result(entry: &SharedEntry, id: Uuid, result: ConversionResult) {
    let mut entry = entry.write().await;

    entry.updated_at = Utc::now();
    match result {
        Ok(output) => {
            tracing::info!(job_id = %id, run_id = %output.run_id, "Conversion job succeeded");
            entry.status = RunStatus::Succeeded;
            entry.segments = output.segments.iter().map(SegmentState::snapshot).collect();
            entry.output = Some(Arc::new(output));
        }
        Err(failure) => {
            tracing::warn!(
                job_id = %id,
                error = %failure.error,
                failed_segment = ?failure.segment_index,
                "Conversion job failed"
            );
            entry.status = RunStatus::Failed;
            entry.segments = failure.segments.iter().map(SegmentState::snapshot).collect();
            entry.error = Some(failure.error);
            entry.failed_segment = failure.segment_index;
            entry.resumable = (!failure.segments.is_empty()).then_some(failure.segments);
        }
    }
}
