//! Error types and diagnostic reporting

use codespan_reporting::diagnostic::Diagnostic;
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream, WriteColor};
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::toolchain::ToolKind;

/// How an external process finished when it did not succeed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitStatusDisplay(pub Option<i32>);

impl From<&Option<i32>> for ExitStatusDisplay {
    fn from(code: &Option<i32>) -> Self {
        Self(*code)
    }
}

impl fmt::Display for ExitStatusDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(code) => write!(f, "exit code {code}"),
            None => f.write_str("termination by signal"),
        }
    }
}

/// Pipeline error
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{tool} could not be started from '{attempted_path}': {source}")]
    ToolNotFound {
        tool: ToolKind,
        attempted_path: String,
        #[source]
        source: io::Error,
    },

    #[error("stage '{stage}' failed: '{tool}' exited with {}", ExitStatusDisplay::from(.exit_code))]
    StageExecution {
        stage: &'static str,
        tool: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("stage '{stage}' failed: '{tool}' succeeded but did not write {}", .path.display())]
    StageOutputMissing {
        stage: &'static str,
        tool: String,
        path: PathBuf,
    },

    #[error("cannot read input {}: {source}", .path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot run test executable {}: {source}", .path.display())]
    Execution {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl PipelineError {
    pub fn tool_not_found(tool: ToolKind, attempted_path: impl Into<String>, source: io::Error) -> Self {
        Self::ToolNotFound {
            tool,
            attempted_path: attempted_path.into(),
            source,
        }
    }

    pub fn stage_execution(
        stage: &'static str,
        tool: impl Into<String>,
        exit_code: Option<i32>,
        stderr: impl Into<String>,
    ) -> Self {
        Self::StageExecution {
            stage,
            tool: tool.into(),
            exit_code,
            stderr: stderr.into(),
        }
    }

    pub fn stage_output_missing(stage: &'static str, tool: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::StageOutputMissing {
            stage,
            tool: tool.into(),
            path: path.into(),
        }
    }

    pub fn input(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Input {
            path: path.into(),
            source,
        }
    }

    pub fn execution(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Execution {
            path: path.into(),
            source,
        }
    }

    /// Name of the stage this error was raised in, if any
    pub fn stage(&self) -> Option<&'static str> {
        match self {
            Self::StageExecution { stage, .. } | Self::StageOutputMissing { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Diagnostic reporter for pretty error output
pub struct DiagnosticReporter {
    files: SimpleFiles<String, String>,
    config: term::Config,
}

impl DiagnosticReporter {
    pub fn new() -> Self {
        Self {
            files: SimpleFiles::new(),
            config: term::Config::default(),
        }
    }

    /// Build the diagnostic shown for an error
    pub fn diagnostic(error: &PipelineError) -> Diagnostic<usize> {
        match error {
            PipelineError::ToolNotFound {
                tool,
                attempted_path,
                source,
            } => Diagnostic::error()
                .with_message(format!("cannot run {tool}"))
                .with_notes(vec![
                    format!("attempted path: {attempted_path}"),
                    format!("reason: {source}"),
                    "help: pass an explicit path or a --suffix matching the installed LLVM tools".to_string(),
                ]),

            PipelineError::StageExecution {
                stage,
                tool,
                exit_code,
                stderr,
            } => {
                let mut notes = vec![format!("'{tool}' exited with {}", ExitStatusDisplay(*exit_code))];
                if !stderr.trim().is_empty() {
                    notes.push(format!("tool stderr:\n{}", stderr.trim_end()));
                }
                Diagnostic::error()
                    .with_message(format!("stage '{stage}' failed"))
                    .with_notes(notes)
            }

            PipelineError::StageOutputMissing { stage, tool, path } => Diagnostic::error()
                .with_message(format!("stage '{stage}' produced no output"))
                .with_notes(vec![format!(
                    "'{tool}' exited successfully but {} does not exist",
                    path.display()
                )]),

            PipelineError::Input { path, source } => Diagnostic::error()
                .with_message(format!("cannot read input {}", path.display()))
                .with_notes(vec![source.to_string()]),

            PipelineError::Execution { path, source } => Diagnostic::error()
                .with_message(format!("cannot run test executable {}", path.display()))
                .with_notes(vec![source.to_string()]),

            PipelineError::Io(err) => Diagnostic::error().with_message(format!("IO error: {err}")),
        }
    }

    /// Render an error to an arbitrary terminal writer
    pub fn emit(&self, writer: &mut dyn WriteColor, error: &PipelineError) {
        let diagnostic = Self::diagnostic(error);
        let _ = term::emit(writer, &self.config, &self.files, &diagnostic);
    }

    /// Render an error to stderr
    pub fn report_error(&self, error: &PipelineError) {
        let writer = StandardStream::stderr(ColorChoice::Auto);
        self.emit(&mut writer.lock(), error);
    }
}

impl Default for DiagnosticReporter {
    fn default() -> Self {
        Self::new()
    }
}
