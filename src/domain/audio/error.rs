use super::wav::AudioFormat;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AudioError {
    #[error("no audio containers to merge")]
    EmptyInput,
    #[error("malformed audio container: {0}")]
    MalformedContainer(String),
    #[error("audio container {index} has format {found}, expected {expected}")]
    FormatMismatch {
        index: usize,
        expected: AudioFormat,
        found: AudioFormat,
    },
}
