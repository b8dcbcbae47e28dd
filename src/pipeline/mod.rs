pub mod runner;

pub use runner::{run_batcher, run_reader, PipelineError};
