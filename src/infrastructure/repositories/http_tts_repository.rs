use super::tts_repository::TtsRepository;
use crate::domain::tts::{SpeechRequest, TtsError};
use crate::infrastructure::config::{BackendSettings, ResponseMode};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::Client;
use serde_json::{json, Map, Value};

/// Error bodies are capped before they end up in logs and user-facing messages
const MAX_ERROR_BODY_LEN: usize = 500;

/// TTS repository speaking plain HTTP+JSON to a configurable endpoint
pub struct HttpTtsRepository {
    client: Client,
    settings: BackendSettings,
}

impl HttpTtsRepository {
    pub fn new(client: Client, settings: BackendSettings) -> Self {
        Self { client, settings }
    }

    fn build_body(&self, request: &SpeechRequest) -> Value {
        let mut body = Map::new();
        body.insert(self.settings.text_field.clone(), json!(request.text));
        body.insert("voice_id".to_string(), json!(request.voice_id));
        body.insert("language".to_string(), json!(request.language));
        body.insert("format".to_string(), json!(self.settings.audio_format));
        if let Some(sample_rate) = self.settings.sample_rate {
            body.insert("sample_rate".to_string(), json!(sample_rate));
        }
        if let Some(model) = &self.settings.model {
            body.insert("model".to_string(), json!(model));
        }
        Value::Object(body)
    }
}

#[async_trait]
impl TtsRepository for HttpTtsRepository {
    async fn request_speech(&self, request: &SpeechRequest) -> Result<Vec<u8>, TtsError> {
        let text_preview: String = request.text.chars().take(80).collect();
        tracing::debug!(
            endpoint = %self.settings.endpoint,
            voice = %request.voice_id,
            language = %request.language,
            text_length = request.text.len(),
            text_preview = %text_preview,
            "Calling TTS backend"
        );

        let mut builder = self
            .client
            .post(&self.settings.endpoint)
            .json(&self.build_body(request));
        if let Some(api_key) = &self.settings.api_key {
            builder = builder.bearer_auth(api_key);
        }

        let response = builder.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());
            let message = error_message(&body);

            tracing::error!(
                status = status.as_u16(),
                error = %message,
                voice = %request.voice_id,
                "TTS backend returned an error"
            );
            return Err(TtsError::from_status(status.as_u16(), message));
        }

        let body = response.bytes().await?;
        match &self.settings.response_mode {
            ResponseMode::Binary => Ok(body.to_vec()),
            ResponseMode::JsonBase64 { field } => decode_envelope(&body, field),
        }
    }
}

/// Prefer the `error` field of a JSON body, fall back to the raw text.
fn error_message(body: &str) -> String {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| value.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string());

    if message.chars().count() > MAX_ERROR_BODY_LEN {
        let capped: String = message.chars().take(MAX_ERROR_BODY_LEN).collect();
        format!("{}... (truncated)", capped)
    } else {
        message
    }
}

fn decode_envelope(body: &[u8], field: &str) -> Result<Vec<u8>, TtsError> {
    let envelope: Value = serde_json::from_slice(body)
        .map_err(|e| TtsError::MalformedResponse(format!("response is not JSON: {}", e)))?;

    let encoded = envelope
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| TtsError::MalformedResponse(format!("no `{}` field in response", field)))?;

    BASE64
        .decode(encoded)
        .map_err(|e| TtsError::MalformedResponse(format!("`{}` is not valid base64: {}", field, e)))
}
