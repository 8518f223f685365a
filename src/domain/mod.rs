pub mod audio;
pub mod conversion;
pub mod text;
pub mod tts;
