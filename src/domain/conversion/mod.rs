pub mod error;
pub mod model;
pub mod registry;
pub mod service;

pub use error::{ConversionError, ConversionFailure, JobError};
pub use model::{
    ConversionOutput, ProgressUpdate, RunStatus, SegmentSnapshot, SegmentState, SegmentStatus,
};
pub use registry::{ConversionRegistry, JobFailure, JobView, DEFAULT_JOB_IDLE_TTL};
pub use service::{ConversionResult, ConversionService, ProgressSender};
