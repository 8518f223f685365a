pub mod client;
pub mod dto;
pub mod error;
pub mod language;
pub mod throttle;

pub use client::{ClientSettings, Synthesizer, TtsClient};
pub use dto::SpeechRequest;
pub use error::TtsError;
pub use language::{
    FixedVoiceSelector, LanguageCode, LanguageVoiceSelector, VoiceChoice, VoiceSelector,
};
pub use throttle::Throttle;
