//! ezmlir - MLIR to native code through the LLVM command-line tools
//!
//! This library drives `mlir-opt`, `mlir-translate`, `llc` and `clang` over
//! a piece of MLIR source text and produces a relocatable object or a shared
//! library. It never looks inside the IR; every transformation is delegated
//! to the external tools.
//!
//! ## Architecture
//!
//! - **Toolchain** (`toolchain`): resolves the four tool paths from defaults,
//!   a global suffix and per-tool overrides
//! - **Workspace** (`workspace`): directory for intermediate artifacts and its
//!   cleanup policy
//! - **Stages** (`stage`): fixed argument templates and the runner that
//!   invokes one tool per stage
//! - **Driver** (`driver`): the ordered pipeline, terminal mode selection and
//!   the optional harness link-and-run step
//! - **Common** (`common`): error taxonomy and diagnostic rendering

pub mod common;
pub mod driver;
pub mod input;
pub mod stage;
pub mod toolchain;
pub mod workspace;

// Re-exports for convenience
pub use common::{DiagnosticReporter, PipelineError, PipelineResult};
pub use driver::{ExecutionOutput, Pipeline, PipelineConfig, PipelineMode, PipelineOutput};
pub use input::SourceInput;
pub use stage::{Artifact, ArtifactKind, ProcessExecutor, StageRunner, ToolExecutor, ToolOutput};
pub use toolchain::{ToolConfig, ToolDefaults, ToolKind, ToolOverrides, resolve};
pub use workspace::{CleanupPolicy, Workspace};
