//! Stage execution
//!
//! [`StageRunner`] turns a [`Stage`] descriptor into one synchronous tool
//! invocation and checks the contract afterwards: exit status zero, output
//! file present. Process spawning sits behind [`ToolExecutor`] so a different
//! executor (or a recording one) can be plugged in.

use super::{Artifact, Stage};
use crate::common::{PipelineError, PipelineResult};
use crate::toolchain::ToolConfig;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::Path;
use std::process::Command;

/// Captured result of one external process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// `None` when the process was killed by a signal
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Runs an external program to completion
pub trait ToolExecutor {
    /// Spawn `program` with `args`, wait for it and capture its output
    ///
    /// An `Err` means the program could not be started at all.
    fn execute(&self, program: &Path, args: &[OsString]) -> io::Result<ToolOutput>;
}

/// Executor backed by `std::process::Command`
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessExecutor;

impl ToolExecutor for ProcessExecutor {
    fn execute(&self, program: &Path, args: &[OsString]) -> io::Result<ToolOutput> {
        let output = Command::new(program).args(args).output()?;
        Ok(ToolOutput {
            exit_code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

/// Runs stages against a resolved tool configuration
pub struct StageRunner<'a> {
    tools: &'a ToolConfig,
    executor: &'a dyn ToolExecutor,
}

impl<'a> StageRunner<'a> {
    pub fn new(tools: &'a ToolConfig, executor: &'a dyn ToolExecutor) -> Self {
        Self { tools, executor }
    }

    pub fn tools(&self) -> &ToolConfig {
        self.tools
    }

    /// Run `stage` on `input`, writing `output`
    pub fn run(&self, stage: &Stage, input: &Artifact, output: &Path) -> PipelineResult<Artifact> {
        self.run_with(stage, input, &[], output)
    }

    /// Run `stage` with additional companion inputs (e.g. a harness source)
    pub fn run_with(
        &self,
        stage: &Stage,
        input: &Artifact,
        companions: &[&Path],
        output: &Path,
    ) -> PipelineResult<Artifact> {
        debug_assert_eq!(
            input.kind, stage.input,
            "stage '{}' fed the wrong artifact kind",
            stage.name
        );

        let program = self.tools.path(stage.tool);
        let args = stage.expand_args(&input.path, companions, output)?;

        // The output check below must only see what this invocation wrote
        match fs::remove_file(output) {
            Ok(()) => tracing::debug!(path = %output.display(), "removed stale output"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
        tracing::info!(stage = stage.name, tool = program, ?args, "running stage");

        let result = self
            .executor
            .execute(Path::new(program), &args)
            .map_err(|err| PipelineError::tool_not_found(stage.tool, program, err))?;

        if !result.stdout.is_empty() {
            tracing::debug!(stage = stage.name, stdout = %result.stdout_lossy(), "tool output");
        }

        if !result.success() {
            return Err(PipelineError::stage_execution(
                stage.name,
                program,
                result.exit_code,
                result.stderr_lossy(),
            ));
        }

        if !output.exists() {
            return Err(PipelineError::stage_output_missing(stage.name, program, output));
        }

        let artifact = Artifact::from_path(stage.output, output)?;
        tracing::debug!(
            stage = stage.name,
            path = %artifact.path.display(),
            size = artifact.size,
            "stage finished"
        );
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::mock::MockToolchain;
    use crate::stage::{ArtifactKind, OPTIMIZE, TRANSLATE};
    use crate::toolchain::{ToolDefaults, ToolOverrides, resolve};
    use pretty_assertions::assert_eq;

    fn source(dir: &Path) -> Artifact {
        Artifact::write(ArtifactKind::SourceIr, dir.join("original.mlir"), "module {}").unwrap()
    }

    #[test]
    fn test_run_success() {
        let dir = tempfile::tempdir().unwrap();
        let tools = ToolConfig::default();
        let mock = MockToolchain::new();
        let runner = StageRunner::new(&tools, &mock);

        let input = source(dir.path());
        let out = dir.path().join("optimized.mlir");
        let artifact = runner.run(&OPTIMIZE, &input, &out).unwrap();

        assert_eq!(artifact.kind, ArtifactKind::OptimizedIr);
        assert_eq!(artifact.path, out);
        assert!(artifact.size > 0);

        let calls = mock.invocations();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, "mlir-opt");
        assert_eq!(calls[0].args.first().map(String::as_str), input.path.to_str());
        assert_eq!(calls[0].args.last().map(String::as_str), out.to_str());
    }

    #[test]
    fn test_nonzero_exit_is_stage_error() {
        let dir = tempfile::tempdir().unwrap();
        let tools = resolve(&ToolDefaults::default(), "-20", &ToolOverrides::default());
        let mock = MockToolchain::new().fail_stage("optimize", 2);
        let runner = StageRunner::new(&tools, &mock);

        let input = source(dir.path());
        let err = runner
            .run(&OPTIMIZE, &input, &dir.path().join("optimized.mlir"))
            .unwrap_err();
        match err {
            PipelineError::StageExecution {
                stage,
                tool,
                exit_code,
                stderr,
            } => {
                assert_eq!(stage, "optimize");
                assert_eq!(tool, "mlir-opt-20");
                assert_eq!(exit_code, Some(2));
                assert!(stderr.contains("optimize"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_output_is_contract_violation() {
        let dir = tempfile::tempdir().unwrap();
        let tools = ToolConfig::default();
        let mock = MockToolchain::new().skip_output("optimize");
        let runner = StageRunner::new(&tools, &mock);

        let input = source(dir.path());
        let err = runner
            .run(&OPTIMIZE, &input, &dir.path().join("optimized.mlir"))
            .unwrap_err();
        assert!(matches!(err, PipelineError::StageOutputMissing { stage: "optimize", .. }));
    }

    #[test]
    fn test_stale_output_does_not_satisfy_silent_tool() {
        let dir = tempfile::tempdir().unwrap();
        let tools = ToolConfig::default();
        let mock = MockToolchain::new().skip_output("optimize");
        let runner = StageRunner::new(&tools, &mock);

        let input = source(dir.path());
        let out = dir.path().join("optimized.mlir");
        fs::write(&out, "module { stale }").unwrap();

        let err = runner.run(&OPTIMIZE, &input, &out).unwrap_err();
        assert!(matches!(err, PipelineError::StageOutputMissing { stage: "optimize", .. }));
        assert!(!out.exists());
    }

    #[test]
    fn test_unspawnable_tool() {
        let dir = tempfile::tempdir().unwrap();
        let overrides = ToolOverrides {
            translator: Some(dir.path().join("no-such-translate").display().to_string()),
            ..Default::default()
        };
        let tools = resolve(&ToolDefaults::default(), "", &overrides);
        let runner = StageRunner::new(&tools, &ProcessExecutor);

        let input = Artifact::write(ArtifactKind::LoweredIr, dir.path().join("lowered.mlir"), "module {}").unwrap();
        let err = runner
            .run(&TRANSLATE, &input, &dir.path().join("k.ll"))
            .unwrap_err();
        match err {
            PipelineError::ToolNotFound {
                tool, attempted_path, ..
            } => {
                assert_eq!(tool, crate::toolchain::ToolKind::Translator);
                assert!(attempted_path.ends_with("no-such-translate"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_tool_output_helpers() {
        let out = ToolOutput {
            exit_code: Some(0),
            stdout: b"hello\n".to_vec(),
            stderr: Vec::new(),
        };
        assert!(out.success());
        assert_eq!(out.stdout_lossy(), "hello\n");
        assert!(!ToolOutput::default().success());
    }
}
