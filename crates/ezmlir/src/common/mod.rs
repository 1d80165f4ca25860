//! Common infrastructure shared across the pipeline components

mod error;

pub use error::{DiagnosticReporter, ExitStatusDisplay, PipelineError, PipelineResult};
