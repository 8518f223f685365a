use lingua::{Language, LanguageDetector, LanguageDetectorBuilder};
use serde::{Deserialize, Serialize};

/// Languages we pick distinct voices for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LanguageCode {
    #[serde(rename = "en")]
    English,
    #[serde(rename = "fr")]
    French,
}

impl LanguageCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageCode::English => "en",
            LanguageCode::French => "fr",
        }
    }

    /// Locale hint sent to the backend alongside the voice
    pub fn locale(&self) -> &'static str {
        match self {
            LanguageCode::English => "en",
            LanguageCode::French => "fr-FR",
        }
    }

    pub fn from_lingua(language: Language) -> Self {
        match language {
            Language::English => LanguageCode::English,
            Language::French => LanguageCode::French,
        }
    }
}

impl std::fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Voice picked for one segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceChoice {
    pub voice_id: String,
    pub language: LanguageCode,
}

/// Chooses the backend voice for a piece of text.
pub trait VoiceSelector: Send + Sync {
    fn select(&self, text: &str) -> VoiceChoice;
}

/// Always the same voice, regardless of the text
pub struct FixedVoiceSelector {
    choice: VoiceChoice,
}

impl FixedVoiceSelector {
    pub fn new(voice_id: impl Into<String>, language: LanguageCode) -> Self {
        Self {
            choice: VoiceChoice {
                voice_id: voice_id.into(),
                language,
            },
        }
    }
}

impl VoiceSelector for FixedVoiceSelector {
    fn select(&self, _text: &str) -> VoiceChoice {
        self.choice.clone()
    }
}

/// French text gets the French voice, anything else the default voice.
pub struct LanguageVoiceSelector {
    detector: LanguageDetector,
    default_voice: String,
    french_voice: String,
}

impl LanguageVoiceSelector {
    pub fn new(default_voice: String, french_voice: String) -> Self {
        let detector =
            LanguageDetectorBuilder::from_languages(&[Language::English, Language::French]).build();

        Self {
            detector,
            default_voice,
            french_voice,
        }
    }

    pub fn detect(&self, text: &str) -> LanguageCode {
        match self.detector.detect_language_of(text) {
            Some(language) => LanguageCode::from_lingua(language),
            None => {
                tracing::warn!("Could not detect language, falling back to English");
                LanguageCode::English
            }
        }
    }
}

impl VoiceSelector for LanguageVoiceSelector {
    fn select(&self, text: &str) -> VoiceChoice {
        let language = self.detect(text);
        let voice_id = match language {
            LanguageCode::French => self.french_voice.clone(),
            LanguageCode::English => self.default_voice.clone(),
        };

        VoiceChoice { voice_id, language }
    }
}
