use crate::domain::tts::{SpeechRequest, TtsError};
use async_trait::async_trait;

/// Repository for a single TTS backend call.
/// Abstracts the wire protocol of the remote provider.
///
/// Implementations are responsible for:
/// - Building the provider-specific request body and credentials
/// - Classifying non-2xx responses into [`TtsError`] variants
/// - Decoding the audio bytes out of the response (raw body or JSON envelope)
///
/// Pacing, timeouts and retries are the caller's concern.
#[async_trait]
pub trait TtsRepository: Send + Sync {
    /// Run one synthesis attempt and return the encoded audio container
    async fn request_speech(&self, request: &SpeechRequest) -> Result<Vec<u8>, TtsError>;
}
