use super::dto::SpeechRequest;
use super::error::TtsError;
use super::language::VoiceSelector;
use super::throttle::Throttle;
use crate::domain::audio::validate_container;
use crate::infrastructure::repositories::TtsRepository;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Pacing and retry knobs for [`TtsClient`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub min_call_interval: Duration,
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub backoff_base: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            min_call_interval: Duration::from_millis(2000),
            request_timeout: Duration::from_millis(60_000),
            max_retries: 3,
            backoff_base: Duration::from_millis(1000),
        }
    }
}

impl ClientSettings {
    /// Delay after the failed attempt number `attempt` (0-based): base * 2^attempt
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff_base.saturating_mul(2u32.saturating_pow(attempt))
    }
}

#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Turn one segment of text into a validated audio container
    ///
    /// Returns `TtsError::Cancelled` as soon as `cancel` fires, whichever
    /// suspension point the call is parked on.
    async fn synthesize(&self, text: &str, cancel: &CancellationToken)
        -> Result<Vec<u8>, TtsError>;
}

/// Resilient wrapper around a [`TtsRepository`]: throttle, timeout, retry, validate.
pub struct TtsClient {
    repository: Arc<dyn TtsRepository>,
    voices: Arc<dyn VoiceSelector>,
    throttle: Arc<Throttle>,
    settings: ClientSettings,
}

impl TtsClient {
    pub fn new(
        repository: Arc<dyn TtsRepository>,
        voices: Arc<dyn VoiceSelector>,
        settings: ClientSettings,
    ) -> Self {
        Self::with_throttle(repository, voices, settings, Throttle::global())
    }

    pub fn with_throttle(
        repository: Arc<dyn TtsRepository>,
        voices: Arc<dyn VoiceSelector>,
        settings: ClientSettings,
        throttle: Arc<Throttle>,
    ) -> Self {
        Self {
            repository,
            voices,
            throttle,
            settings,
        }
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    async fn attempt(&self, request: &SpeechRequest) -> Result<Vec<u8>, TtsError> {
        self.throttle.acquire(self.settings.min_call_interval).await;

        let audio = tokio::time::timeout(
            self.settings.request_timeout,
            self.repository.request_speech(request),
        )
        .await
        .map_err(|_| TtsError::Timeout(self.settings.request_timeout))??;

        if audio.is_empty() {
            return Err(TtsError::MalformedContainer(
                "backend returned an empty audio payload".to_string(),
            ));
        }
        if !validate_container(&audio) {
            return Err(TtsError::MalformedContainer(format!(
                "backend returned {} bytes that are not a RIFF/WAVE container",
                audio.len()
            )));
        }

        Ok(audio)
    }
}

#[async_trait]
impl Synthesizer for TtsClient {
    async fn synthesize(
        &self,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, TtsError> {
        let voice = self.voices.select(text);
        let request = SpeechRequest {
            text: text.to_string(),
            voice_id: voice.voice_id,
            language: voice.language.locale().to_string(),
        };
        let max_attempts = self.settings.max_retries.max(1);

        let mut attempt = 0;
        loop {
            let start_time = Instant::now();

            let result = tokio::select! {
                _ = cancel.cancelled() => return Err(TtsError::Cancelled),
                result = self.attempt(&request) => result,
            };

            let error = match result {
                Ok(audio) => {
                    tracing::info!(
                        voice = %request.voice_id,
                        language = %request.language,
                        attempt = attempt + 1,
                        latency_ms = start_time.elapsed().as_millis() as u64,
                        characters_count = text.chars().count(),
                        audio_size_bytes = audio.len(),
                        "TTS segment synthesized"
                    );
                    return Ok(audio);
                }
                Err(error) => error,
            };

            attempt += 1;
            if !error.is_retryable() || attempt >= max_attempts {
                tracing::error!(
                    error = %error,
                    attempt = attempt,
                    max_attempts = max_attempts,
                    retryable = error.is_retryable(),
                    "TTS call failed"
                );
                return Err(error);
            }

            let backoff = self.settings.backoff_for(attempt - 1);
            tracing::warn!(
                error = %error,
                attempt = attempt,
                max_attempts = max_attempts,
                backoff_ms = backoff.as_millis() as u64,
                "TTS call failed, retrying"
            );

            tokio::select! {
                _ = cancel.cancelled() => return Err(TtsError::Cancelled),
                _ = tokio::time::sleep(backoff) => {}
            }
        }
    }
}
