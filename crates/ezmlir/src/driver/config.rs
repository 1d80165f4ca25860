//! Pipeline configuration and results

use crate::stage::{Artifact, ArtifactKind, CODEGEN_OBJECT, CODEGEN_SHARED, Stage};
use std::path::{Path, PathBuf};

/// Module name used when the input has no file name (stdin)
pub const DEFAULT_MODULE_NAME: &str = "module";

/// Harness source looked up in the current directory by default
pub const DEFAULT_HARNESS: &str = "test_harness.c";

/// Kind of native artifact the pipeline ends with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineMode {
    /// Relocatable object via the code generator
    #[default]
    ObjectFile,
    /// Position-independent shared object via the link compiler
    SharedLibrary,
}

impl PipelineMode {
    /// Mode implied by an output path's extension, if it implies one
    pub fn from_output_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("so") => Some(PipelineMode::SharedLibrary),
            Some("o") => Some(PipelineMode::ObjectFile),
            _ => None,
        }
    }

    pub fn terminal_stage(self) -> &'static Stage {
        match self {
            PipelineMode::ObjectFile => &CODEGEN_OBJECT,
            PipelineMode::SharedLibrary => &CODEGEN_SHARED,
        }
    }

    pub fn artifact_kind(self) -> ArtifactKind {
        self.terminal_stage().output
    }
}

/// Options for one pipeline run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub mode: PipelineMode,
    /// Stem for `<name>.ll`, `<name>.o`, `<name>.so` and `<name>_test`
    pub module_name: String,
    /// Directory receiving the terminal artifact when `output` is unset
    pub output_dir: PathBuf,
    /// Exact terminal artifact path
    pub output: Option<PathBuf>,
    /// Harness source to link and run in object mode; skipped if absent
    pub harness: Option<PathBuf>,
    /// Echo stage contents and progress to stdout
    pub echo: bool,
}

impl PipelineConfig {
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            ..Default::default()
        }
    }

    /// Where the terminal artifact is written
    pub fn terminal_path(&self) -> PathBuf {
        match &self.output {
            Some(path) => path.clone(),
            None => self
                .output_dir
                .join(self.mode.artifact_kind().file_name(&self.module_name)),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mode: PipelineMode::default(),
            module_name: DEFAULT_MODULE_NAME.to_string(),
            output_dir: PathBuf::from("."),
            output: None,
            harness: Some(PathBuf::from(DEFAULT_HARNESS)),
            echo: false,
        }
    }
}

/// Captured output of the harness executable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Outcome of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutput {
    /// The object file or shared library
    pub artifact: Artifact,
    /// Workspace artifacts in production order
    pub intermediates: Vec<Artifact>,
    /// Present only when the harness was linked and run
    pub execution: Option<ExecutionOutput>,
}
