/// One synthesis attempt as handed to the backend repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechRequest {
    pub text: String,
    pub voice_id: String,
    pub language: String,
}
