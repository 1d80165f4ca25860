//! Pipeline stages and the artifacts flowing between them
//!
//! Every stage is one external tool invocation with a fixed argument
//! template. A stage consumes exactly one artifact kind and produces the
//! next one:
//!
//! ```text
//! SourceIr -> OptimizedIr -> LoweredIr -> TargetIr -> NativeObject | SharedLibrary
//!                                                       NativeObject -> Executable
//! ```

#[cfg(test)]
pub(crate) mod mock;
mod runner;

pub use runner::{ProcessExecutor, StageRunner, ToolExecutor, ToolOutput};

use crate::common::PipelineResult;
use crate::toolchain::ToolKind;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Artifact kinds, ordered the way the pipeline produces them
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ArtifactKind {
    /// Input MLIR as given by the user
    SourceIr,
    /// MLIR after the optimization recipe
    OptimizedIr,
    /// MLIR in the LLVM dialect
    LoweredIr,
    /// Textual LLVM IR
    TargetIr,
    /// Relocatable object file
    NativeObject,
    /// Position-independent shared object
    SharedLibrary,
    /// Native object linked with the test harness
    Executable,
}

impl ArtifactKind {
    /// File name of this artifact for a module called `module_name`
    pub fn file_name(self, module_name: &str) -> String {
        match self {
            ArtifactKind::SourceIr => "original.mlir".to_string(),
            ArtifactKind::OptimizedIr => "optimized.mlir".to_string(),
            ArtifactKind::LoweredIr => "lowered.mlir".to_string(),
            ArtifactKind::TargetIr => format!("{module_name}.ll"),
            ArtifactKind::NativeObject => format!("{module_name}.o"),
            ArtifactKind::SharedLibrary => format!("{module_name}.so"),
            ArtifactKind::Executable => format!("{module_name}_test"),
        }
    }

    /// Whether the artifact is human-readable IR text
    pub fn is_text(self) -> bool {
        self <= ArtifactKind::TargetIr
    }
}

/// A file produced (or consumed) by the pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    /// Size on disk when the artifact was recorded
    pub size: u64,
}

impl Artifact {
    /// Record an artifact that already exists on disk
    pub fn from_path(kind: ArtifactKind, path: impl Into<PathBuf>) -> PipelineResult<Self> {
        let path = path.into();
        let size = fs::metadata(&path)?.len();
        Ok(Self { kind, path, size })
    }

    /// Write `contents` to `path` and record it
    pub fn write(kind: ArtifactKind, path: impl Into<PathBuf>, contents: &str) -> PipelineResult<Self> {
        let path = path.into();
        fs::write(&path, contents)?;
        Ok(Self {
            kind,
            path,
            size: contents.len() as u64,
        })
    }

    /// Read the artifact back as text
    pub fn read_text(&self) -> PipelineResult<String> {
        Ok(fs::read_to_string(&self.path)?)
    }
}

/// One element of a stage's argument template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arg {
    /// Passed through unchanged
    Lit(&'static str),
    /// Path of the consumed artifact
    Input,
    /// Path the stage must write
    Output,
    /// Path of an additional input file, by position
    Companion(usize),
}

/// A statically defined pipeline step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stage {
    pub name: &'static str,
    pub tool: ToolKind,
    pub args: &'static [Arg],
    pub input: ArtifactKind,
    pub output: ArtifactKind,
    /// Progress line shown before the stage runs
    pub progress: &'static str,
}

impl Stage {
    /// Substitute concrete paths into the argument template
    pub fn expand_args(&self, input: &Path, companions: &[&Path], output: &Path) -> PipelineResult<Vec<OsString>> {
        self.args
            .iter()
            .map(|arg| -> PipelineResult<OsString> {
                match *arg {
                    Arg::Lit(text) => Ok(OsString::from(text)),
                    Arg::Input => Ok(input.as_os_str().to_owned()),
                    Arg::Output => Ok(output.as_os_str().to_owned()),
                    Arg::Companion(index) => companions
                        .get(index)
                        .map(|path| path.as_os_str().to_owned())
                        .ok_or_else(|| {
                            io::Error::new(
                                io::ErrorKind::InvalidInput,
                                format!("stage '{}' needs companion input #{index}", self.name),
                            )
                            .into()
                        }),
                }
            })
            .collect()
    }
}

/// Fixed optimization recipe
pub const OPTIMIZE: Stage = Stage {
    name: "optimize",
    tool: ToolKind::Optimizer,
    args: &[
        Arg::Input,
        Arg::Lit("--canonicalize"),
        Arg::Lit("--linalg-fuse-elementwise-ops"),
        Arg::Lit("--cse"),
        Arg::Lit("--linalg-generalize-named-ops"),
        Arg::Lit("--convert-linalg-to-loops"),
        Arg::Lit("-o"),
        Arg::Output,
    ],
    input: ArtifactKind::SourceIr,
    output: ArtifactKind::OptimizedIr,
    progress: "Optimizing MLIR...",
};

/// Progressive lowering into the LLVM dialect, ending with no unrealized casts
pub const LOWER: Stage = Stage {
    name: "lower",
    tool: ToolKind::Optimizer,
    args: &[
        Arg::Input,
        Arg::Lit("--one-shot-bufferize=bufferize-function-boundaries=1"),
        Arg::Lit("--convert-linalg-to-loops"),
        Arg::Lit("--convert-scf-to-cf"),
        Arg::Lit("--expand-strided-metadata"),
        Arg::Lit("--lower-affine"),
        Arg::Lit("--finalize-memref-to-llvm"),
        Arg::Lit("--convert-arith-to-llvm"),
        Arg::Lit("--convert-func-to-llvm"),
        Arg::Lit("--convert-cf-to-llvm"),
        Arg::Lit("--reconcile-unrealized-casts"),
        Arg::Lit("-o"),
        Arg::Output,
    ],
    input: ArtifactKind::OptimizedIr,
    output: ArtifactKind::LoweredIr,
    progress: "Lowering to LLVM dialect...",
};

pub const TRANSLATE: Stage = Stage {
    name: "translate",
    tool: ToolKind::Translator,
    args: &[Arg::Input, Arg::Lit("--mlir-to-llvmir"), Arg::Lit("-o"), Arg::Output],
    input: ArtifactKind::LoweredIr,
    output: ArtifactKind::TargetIr,
    progress: "Translating to LLVM IR...",
};

pub const CODEGEN_OBJECT: Stage = Stage {
    name: "codegen",
    tool: ToolKind::CodeGenerator,
    args: &[Arg::Lit("-filetype=obj"), Arg::Input, Arg::Lit("-o"), Arg::Output],
    input: ArtifactKind::TargetIr,
    output: ArtifactKind::NativeObject,
    progress: "Compiling to object file...",
};

pub const CODEGEN_SHARED: Stage = Stage {
    name: "codegen-shared",
    tool: ToolKind::LinkCompiler,
    args: &[
        Arg::Lit("-shared"),
        Arg::Lit("-fPIC"),
        Arg::Input,
        Arg::Lit("-o"),
        Arg::Output,
    ],
    input: ArtifactKind::TargetIr,
    output: ArtifactKind::SharedLibrary,
    progress: "Compiling to shared library...",
};

/// Links the object with the harness source given as companion #0
pub const LINK_HARNESS: Stage = Stage {
    name: "link",
    tool: ToolKind::LinkCompiler,
    args: &[Arg::Companion(0), Arg::Input, Arg::Lit("-o"), Arg::Output],
    input: ArtifactKind::NativeObject,
    output: ArtifactKind::Executable,
    progress: "Creating executable...",
};

/// Stages shared by every mode, in execution order
pub const FRONT_STAGES: [&Stage; 3] = [&OPTIMIZE, &LOWER, &TRANSLATE];
