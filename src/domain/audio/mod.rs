pub mod error;
pub mod wav;

pub use error::AudioError;
pub use wav::{
    build_header, extract_format, extract_payload, merge, validate_container, AudioFormat,
    PayloadRegion, HEADER_LEN,
};
