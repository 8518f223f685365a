use crate::domain::conversion::DEFAULT_JOB_IDLE_TTL;
use crate::domain::text::DEFAULT_MAX_SEGMENT_LENGTH;
use crate::domain::tts::ClientSettings;
use anyhow::Context;
use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub environment: Environment,
    pub log_format: LogFormat,
    pub backend: BackendSettings,
    pub voices: VoiceSettings,
    pub pipeline: PipelineSettings,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// How the backend hands back audio
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseMode {
    /// Response body is the container itself
    Binary,
    /// Response body is JSON with the container base64-encoded under `field`
    JsonBase64 { field: String },
}

#[derive(Clone)]
pub struct BackendSettings {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub response_mode: ResponseMode,
    pub text_field: String,
    pub model: Option<String>,
    pub audio_format: String,
    pub sample_rate: Option<u32>,
}

impl std::fmt::Debug for BackendSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendSettings")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("response_mode", &self.response_mode)
            .field("text_field", &self.text_field)
            .field("model", &self.model)
            .field("audio_format", &self.audio_format)
            .field("sample_rate", &self.sample_rate)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceSettings {
    pub default_voice: String,
    pub french_voice: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    pub max_segment_length: usize,
    pub min_call_interval_ms: u64,
    pub request_timeout_ms: u64,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
    /// Finished background jobs are dropped after this long without a request
    pub job_idle_ttl_secs: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_segment_length: DEFAULT_MAX_SEGMENT_LENGTH,
            min_call_interval_ms: 2000,
            request_timeout_ms: 60_000,
            max_retries: 3,
            retry_backoff_base_ms: 1000,
            job_idle_ttl_secs: DEFAULT_JOB_IDLE_TTL.as_secs(),
        }
    }
}

impl PipelineSettings {
    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            min_call_interval: Duration::from_millis(self.min_call_interval_ms),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            max_retries: self.max_retries,
            backoff_base: Duration::from_millis(self.retry_backoff_base_ms),
        }
    }

    pub fn job_idle_ttl(&self) -> Duration {
        Duration::from_secs(self.job_idle_ttl_secs)
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = PipelineSettings::default();

        let config = Config {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_or("PORT", 8080)?,
            environment: match env::var("ENVIRONMENT").as_deref() {
                Ok("production") => Environment::Production,
                _ => Environment::Development,
            },
            log_format: match env::var("LOG_FORMAT").as_deref() {
                Ok("json") => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
            backend: BackendSettings {
                endpoint: env::var("TTS_API_URL").context("TTS_API_URL must be set")?,
                api_key: non_empty("TTS_API_KEY"),
                response_mode: match env::var("TTS_RESPONSE_MODE").as_deref() {
                    Ok("json") => ResponseMode::JsonBase64 {
                        field: env::var("TTS_AUDIO_FIELD")
                            .unwrap_or_else(|_| "audio_data".to_string()),
                    },
                    _ => ResponseMode::Binary,
                },
                text_field: env::var("TTS_TEXT_FIELD").unwrap_or_else(|_| "text".to_string()),
                model: non_empty("TTS_MODEL"),
                audio_format: env::var("TTS_AUDIO_FORMAT").unwrap_or_else(|_| "wav".to_string()),
                sample_rate: non_empty("TTS_SAMPLE_RATE")
                    .map(|value| value.trim().parse::<u32>())
                    .transpose()
                    .context("TTS_SAMPLE_RATE must be a number")?,
            },
            voices: VoiceSettings {
                default_voice: env::var("TTS_VOICE_DEFAULT").unwrap_or_else(|_| "oliver".to_string()),
                french_voice: env::var("TTS_VOICE_FRENCH").unwrap_or_else(|_| "raphael".to_string()),
            },
            pipeline: PipelineSettings {
                max_segment_length: parse_or("MAX_SEGMENT_LENGTH", defaults.max_segment_length)?,
                min_call_interval_ms: parse_or("MIN_CALL_INTERVAL_MS", defaults.min_call_interval_ms)?,
                request_timeout_ms: parse_or("REQUEST_TIMEOUT_MS", defaults.request_timeout_ms)?,
                max_retries: parse_or("MAX_RETRIES", defaults.max_retries)?,
                retry_backoff_base_ms: parse_or(
                    "RETRY_BACKOFF_BASE_MS",
                    defaults.retry_backoff_base_ms,
                )?,
                job_idle_ttl_secs: parse_or("JOB_IDLE_TTL_SECS", defaults.job_idle_ttl_secs)?,
            },
        };

        Ok(config)
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match non_empty(key) {
        Some(value) => value
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {}", key, value)),
        None => Ok(default),
    }
}
