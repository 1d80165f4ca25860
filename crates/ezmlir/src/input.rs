//! Source input: a named file or standard input

use crate::common::{PipelineError, PipelineResult};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Argument value that selects standard input
pub const STDIN_SENTINEL: &str = "-";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceInput {
    Stdin,
    File(PathBuf),
}

impl SourceInput {
    pub fn from_arg(arg: &Path) -> Self {
        if arg.as_os_str() == STDIN_SENTINEL {
            SourceInput::Stdin
        } else {
            SourceInput::File(arg.to_path_buf())
        }
    }

    /// Read the whole source text
    pub fn read(&self) -> PipelineResult<String> {
        match self {
            SourceInput::Stdin => self.read_from(io::stdin().lock()),
            SourceInput::File(path) => fs::read_to_string(path).map_err(|err| PipelineError::input(path, err)),
        }
    }

    /// Read from `reader` when this is the stdin input; used for testing
    pub fn read_from(&self, mut reader: impl Read) -> PipelineResult<String> {
        match self {
            SourceInput::Stdin => {
                let mut text = String::new();
                reader
                    .read_to_string(&mut text)
                    .map_err(|err| PipelineError::input("<stdin>", err))?;
                Ok(text)
            }
            SourceInput::File(_) => self.read(),
        }
    }

    /// Module name implied by the input file, if any
    pub fn stem(&self) -> Option<String> {
        match self {
            SourceInput::Stdin => None,
            SourceInput::File(path) => path.file_stem().map(|s| s.to_string_lossy().into_owned()),
        }
    }

    pub fn display_name(&self) -> String {
        match self {
            SourceInput::Stdin => "<stdin>".to_string(),
            SourceInput::File(path) => path.display().to_string(),
        }
    }
}
