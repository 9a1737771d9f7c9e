//! Pipeline orchestration module.

mod orchestrator;
mod recording;
mod stats;

pub use orchestrator::Pipeline;
pub use recording::RecordingWriter;
pub use stats::PipelineStats;
