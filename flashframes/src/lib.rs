pub mod args;
pub mod captions;
pub mod debug_info;
pub mod extractor;
pub mod logger;
pub mod pipeline;
pub mod planner;
pub mod timestamp;
pub mod tools;

pub use pipeline::{ExtractRequest, ExtractResponse, Pipeline, PipelineError};
pub use timestamp::Timestamp;
