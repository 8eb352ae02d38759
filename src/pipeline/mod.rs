//! Analysis pipeline orchestration

pub mod orchestrator;

pub use orchestrator::{prepare_output_dir, run, PipelineResult};
