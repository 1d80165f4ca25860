//! Compilation driver and pipeline orchestration
//!
//! The pipeline is a fixed sequence:
//!
//! ```text
//! write source -> optimize -> lower -> translate -> codegen (object | shared)
//!                                                    └─ link harness -> run (object mode only)
//! ```
//!
//! Each stage's output artifact is the next stage's input. The first failing
//! stage ends the run; nothing is retried. The workspace is closed exactly
//! once on every exit path.

mod config;

pub use config::{
    DEFAULT_HARNESS, DEFAULT_MODULE_NAME, ExecutionOutput, PipelineConfig, PipelineMode, PipelineOutput,
};

use crate::common::{PipelineError, PipelineResult};
use crate::stage::{
    Artifact, ArtifactKind, FRONT_STAGES, LINK_HARNESS, OPTIMIZE, StageRunner, TRANSLATE, ToolExecutor,
};
use crate::toolchain::ToolConfig;
use crate::workspace::Workspace;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

/// Characters of target IR shown when echoing
const TARGET_IR_PREVIEW: usize = 500;

/// Sequences the external tools over one workspace
pub struct Pipeline<'a> {
    runner: StageRunner<'a>,
    executor: &'a dyn ToolExecutor,
    config: PipelineConfig,
}

impl<'a> Pipeline<'a> {
    pub fn new(tools: &'a ToolConfig, executor: &'a dyn ToolExecutor, config: PipelineConfig) -> Self {
        Self {
            runner: StageRunner::new(tools, executor),
            executor,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Compile `source` through every stage
    ///
    /// Consumes the workspace and closes it whether or not the run succeeds.
    pub fn run(&self, source: &str, mut workspace: Workspace) -> PipelineResult<PipelineOutput> {
        tracing::info!(
            module = %self.config.module_name,
            mode = ?self.config.mode,
            workspace = %workspace.root().display(),
            "starting pipeline"
        );

        let result = self.run_stages(source, &mut workspace);

        if let Err(err) = workspace.close() {
            tracing::warn!(error = %err, "workspace cleanup failed");
        }

        match &result {
            Ok(output) => tracing::info!(artifact = %output.artifact.path.display(), "pipeline finished"),
            Err(err) => tracing::info!(error = %err, "pipeline aborted"),
        }
        result
    }

    fn run_stages(&self, source: &str, workspace: &mut Workspace) -> PipelineResult<PipelineOutput> {
        let name = self.config.module_name.as_str();
        let mut intermediates = Vec::new();

        let source_path = workspace.artifact_path(&ArtifactKind::SourceIr.file_name(name));
        let mut current = Artifact::write(ArtifactKind::SourceIr, source_path, source)?;
        self.echo(format_args!("Original MLIR:\n{source}\n"));
        intermediates.push(current.clone());

        for stage in FRONT_STAGES {
            self.echo(format_args!("{}", stage.progress));
            let output = workspace.artifact_path(&stage.output.file_name(name));
            current = self.runner.run(stage, &current, &output)?;
            intermediates.push(current.clone());

            if self.config.echo {
                self.echo_contents(stage.name, &current)?;
            }
        }

        let artifact = self.run_terminal(&current)?;
        self.echo(format_args!(
            "{} generated: {}",
            match self.config.mode {
                PipelineMode::ObjectFile => "Object file",
                PipelineMode::SharedLibrary => "Shared library",
            },
            artifact.path.display()
        ));

        let execution = match self.config.mode {
            PipelineMode::ObjectFile => self.run_harness(&artifact, workspace, &mut intermediates)?,
            PipelineMode::SharedLibrary => None,
        };

        Ok(PipelineOutput {
            artifact,
            intermediates,
            execution,
        })
    }

    /// Terminal codegen, writing straight to the deliverable path
    fn run_terminal(&self, target_ir: &Artifact) -> PipelineResult<Artifact> {
        let stage = self.config.mode.terminal_stage();
        let path = self.config.terminal_path();
        self.echo(format_args!("{}", stage.progress));

        self.runner.run(stage, target_ir, &path).inspect_err(|_| {
            // No partial deliverable survives a failed codegen
            match fs::remove_file(&path) {
                Ok(()) => tracing::debug!(path = %path.display(), "removed partial output"),
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => tracing::warn!(path = %path.display(), error = %err, "cannot remove partial output"),
            }
        })
    }

    /// Link the object with the harness and run it, if a harness exists
    fn run_harness(
        &self,
        object: &Artifact,
        workspace: &mut Workspace,
        intermediates: &mut Vec<Artifact>,
    ) -> PipelineResult<Option<ExecutionOutput>> {
        let Some(harness) = self.config.harness.as_deref() else {
            return Ok(None);
        };
        if !harness.is_file() {
            tracing::debug!(harness = %harness.display(), "no test harness");
            self.echo(format_args!(
                "Test harness ({}) not found, skipping executable creation",
                harness.display()
            ));
            return Ok(None);
        }

        self.echo(format_args!("{}", LINK_HARNESS.progress));
        let exe_path = workspace.artifact_path(&LINK_HARNESS.output.file_name(&self.config.module_name));
        let exe = self.runner.run_with(&LINK_HARNESS, object, &[harness], &exe_path)?;
        self.echo(format_args!("Executable generated: {}", exe.path.display()));
        intermediates.push(exe.clone());

        let execution = self.execute(&exe.path)?;
        self.echo(format_args!("\nRunning the test:\n{}", execution.stdout));
        if !execution.stderr.is_empty() {
            self.echo(format_args!("Errors: {}", execution.stderr));
        }
        Ok(Some(execution))
    }

    fn execute(&self, exe: &Path) -> PipelineResult<ExecutionOutput> {
        let program = fs::canonicalize(exe).map_err(|err| PipelineError::execution(exe, err))?;
        tracing::info!(program = %program.display(), "running test executable");

        let output = self
            .executor
            .execute(&program, &[])
            .map_err(|err| PipelineError::execution(&program, err))?;
        if !output.success() {
            tracing::warn!(exit_code = ?output.exit_code, "test executable reported failure");
        }

        Ok(ExecutionOutput {
            exit_code: output.exit_code,
            stdout: output.stdout_lossy(),
            stderr: output.stderr_lossy(),
        })
    }

    fn echo_contents(&self, stage: &str, artifact: &Artifact) -> PipelineResult<()> {
        if stage == OPTIMIZE.name {
            let text = artifact.read_text()?;
            self.echo(format_args!("After optimization:\n{text}\n"));
        } else if stage == TRANSLATE.name {
            let text = artifact.read_text()?;
            let preview: String = text.chars().take(TARGET_IR_PREVIEW).collect();
            let ellipsis = if preview.len() < text.len() { "..." } else { "" };
            self.echo(format_args!("LLVM IR (first {TARGET_IR_PREVIEW} chars):\n{preview}{ellipsis}\n"));
        }
        Ok(())
    }

    fn echo(&self, message: fmt::Arguments<'_>) {
        if self.config.echo {
            println!("{message}");
        }
    }
}
