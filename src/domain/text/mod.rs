pub mod segmenter;

pub use segmenter::{segment, TextSegment, DEFAULT_MAX_SEGMENT_LENGTH};
