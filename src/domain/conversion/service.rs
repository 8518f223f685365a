use super::error::{ConversionError, ConversionFailure};
use super::model::{ConversionOutput, ProgressUpdate, RunStatus, SegmentState};
use crate::domain::audio::{self, AudioError};
use crate::domain::text::segment;
use crate::domain::tts::{Synthesizer, TtsError};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub type ProgressSender = mpsc::UnboundedSender<ProgressUpdate>;
pub type ConversionResult = Result<ConversionOutput, ConversionFailure>;

/// Drives text through segmentation, per-segment synthesis and the final merge.
///
/// Segments are synthesized one at a time in index order. The first failing segment
/// stops the run; nothing is merged unless every segment completed.
pub struct ConversionService {
    synthesizer: Arc<dyn Synthesizer>,
    max_segment_length: usize,
}

impl ConversionService {
    pub fn new(synthesizer: Arc<dyn Synthesizer>, max_segment_length: usize) -> Self {
        Self {
            synthesizer,
            max_segment_length,
        }
    }

    pub fn max_segment_length(&self) -> usize {
        self.max_segment_length
    }

    /// Convert `text` into a single WAV container
    ///
    /// Blank text fails with `EmptyInput` before any state is created or published.
    pub async fn convert(
        &self,
        text: &str,
        cancel: CancellationToken,
        progress: Option<ProgressSender>,
    ) -> ConversionResult {
        if text.trim().is_empty() {
            return Err(ConversionFailure::new(
                ConversionError::EmptyInput,
                None,
                Vec::new(),
            ));
        }

        let states = segment(text, self.max_segment_length)
            .into_iter()
            .map(SegmentState::pending)
            .collect();

        self.run(states, &cancel, progress).await
    }

    /// Re-run a previous conversion, reusing the audio of segments that completed.
    ///
    /// Only `Completed` segments are skipped; everything else is synthesized again.
    pub async fn resume(
        &self,
        previous: Vec<SegmentState>,
        cancel: CancellationToken,
        progress: Option<ProgressSender>,
    ) -> ConversionResult {
        if previous.is_empty() {
            return Err(ConversionFailure::new(
                ConversionError::EmptyInput,
                None,
                Vec::new(),
            ));
        }

        let states = previous
            .into_iter()
            .map(SegmentState::for_resume)
            .collect();

        self.run(states, &cancel, progress).await
    }

    async fn run(
        &self,
        mut states: Vec<SegmentState>,
        cancel: &CancellationToken,
        progress: Option<ProgressSender>,
    ) -> ConversionResult {
        let reporter = Reporter {
            run_id: Uuid::new_v4(),
            progress,
        };
        let run_id = reporter.run_id;
        let start_time = Instant::now();

        tracing::info!(
            run_id = %run_id,
            segment_count = states.len(),
            already_completed = states.iter().filter(|s| s.is_completed()).count(),
            "Conversion started"
        );
        reporter.publish(RunStatus::Running, &states);

        for index in 0..states.len() {
            if states[index].is_completed() {
                tracing::debug!(
                    run_id = %run_id,
                    segment_index = index,
                    "Segment already completed, skipping"
                );
                continue;
            }

            if cancel.is_cancelled() {
                tracing::warn!(run_id = %run_id, segment_index = index, "Conversion cancelled");
                reporter.publish(RunStatus::Failed, &states);
                return Err(ConversionFailure::new(
                    ConversionError::Cancelled,
                    None,
                    states,
                ));
            }

            states[index].start();
            reporter.publish(RunStatus::Running, &states);

            tracing::info!(
                run_id = %run_id,
                segment_index = index,
                segment_count = states.len(),
                segment_length = states[index].text.chars().count(),
                "Synthesizing segment"
            );

            let result = self.synthesizer.synthesize(&states[index].text, cancel).await;
            match result {
                Ok(audio) => {
                    states[index].complete(audio);
                    reporter.publish(RunStatus::Running, &states);
                }
                Err(TtsError::Cancelled) => {
                    states[index].cancel();
                    reporter.publish(RunStatus::Failed, &states);
                    tracing::warn!(run_id = %run_id, segment_index = index, "Conversion cancelled");
                    return Err(ConversionFailure::new(
                        ConversionError::Cancelled,
                        Some(index),
                        states,
                    ));
                }
                Err(error) => {
                    states[index].fail();
                    reporter.publish(RunStatus::Failed, &states);
                    tracing::error!(
                        run_id = %run_id,
                        segment_index = index,
                        error = %error,
                        "Conversion failed"
                    );
                    return Err(ConversionFailure::new(error.into(), Some(index), states));
                }
            }
        }

        let merged = {
            let payloads: Vec<&[u8]> = states.iter().filter_map(SegmentState::payload).collect();
            audio::merge(&payloads).and_then(|merged| {
                audio::extract_format(&merged).map(|format| (merged, format))
            })
        };

        match merged {
            Ok((merged, format)) => {
                reporter.publish(RunStatus::Succeeded, &states);
                tracing::info!(
                    run_id = %run_id,
                    segment_count = states.len(),
                    audio_size_bytes = merged.len(),
                    format = %format,
                    latency_ms = start_time.elapsed().as_millis() as u64,
                    "Conversion completed"
                );
                Ok(ConversionOutput {
                    run_id,
                    audio: merged,
                    format,
                    segments: states,
                })
            }
            Err(error) => {
                reporter.publish(RunStatus::Failed, &states);
                tracing::error!(run_id = %run_id, error = %error, "Merging segment audio failed");
                let segment_index = match &error {
                    AudioError::FormatMismatch { index, .. } => Some(*index),
                    _ => None,
                };
                Err(ConversionFailure::new(error.into(), segment_index, states))
            }
        }
    }
}

struct Reporter {
    run_id: Uuid,
    progress: Option<ProgressSender>,
}

impl Reporter {
    fn publish(&self, status: RunStatus, states: &[SegmentState]) {
        if let Some(progress) = &self.progress {
            // a dropped receiver just means nobody is watching
            let _ = progress.send(ProgressUpdate {
                run_id: self.run_id,
                status,
                segments: states.iter().map(SegmentState::snapshot).collect(),
            });
        }
    }
}
