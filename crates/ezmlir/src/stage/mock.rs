//! Recording stand-in for the external tool chain

use super::{ToolExecutor, ToolOutput};
use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    /// Stage guessed from the arguments; `"run"` for the harness executable
    pub stage: &'static str,
}

impl Invocation {
    pub fn output(&self) -> Option<&str> {
        let pos = self.args.iter().position(|a| a == "-o")?;
        self.args.get(pos + 1).map(String::as_str)
    }

    /// First positional argument, which is what the stage reads
    pub fn input(&self) -> Option<&str> {
        let output = self.output();
        self.args
            .iter()
            .map(String::as_str)
            .find(|a| !a.starts_with('-') && Some(*a) != output)
    }
}

/// Pretends to be `mlir-opt`, `mlir-translate`, `llc` and `clang`
///
/// Each call copies its input to the `-o` path with a marker line appended.
#[derive(Default)]
pub struct MockToolchain {
    calls: RefCell<Vec<Invocation>>,
    failures: HashMap<&'static str, i32>,
    silent: Vec<&'static str>,
    run_exit_code: i32,
    run_unspawnable: bool,
}

impl MockToolchain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_stage(mut self, stage: &'static str, code: i32) -> Self {
        self.failures.insert(stage, code);
        self
    }

    /// Exit zero without writing the output file
    pub fn skip_output(mut self, stage: &'static str) -> Self {
        self.silent.push(stage);
        self
    }

    pub fn run_exit_code(mut self, code: i32) -> Self {
        self.run_exit_code = code;
        self
    }

    /// Make starting the harness executable fail
    pub fn fail_run_spawn(mut self) -> Self {
        self.run_unspawnable = true;
        self
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.calls.borrow().clone()
    }

    pub fn stages(&self) -> Vec<&'static str> {
        self.calls.borrow().iter().map(|c| c.stage).collect()
    }

    fn classify(args: &[String]) -> &'static str {
        let has = |flag: &str| args.iter().any(|a| a == flag);
        if has("--canonicalize") {
            "optimize"
        } else if has("--reconcile-unrealized-casts") {
            "lower"
        } else if has("--mlir-to-llvmir") {
            "translate"
        } else if has("-filetype=obj") {
            "codegen"
        } else if has("-shared") {
            "codegen-shared"
        } else if has("-o") {
            "link"
        } else {
            "run"
        }
    }
}

impl ToolExecutor for MockToolchain {
    fn execute(&self, program: &Path, args: &[OsString]) -> io::Result<ToolOutput> {
        let args: Vec<String> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        let stage = Self::classify(&args);
        let call = Invocation {
            program: program.display().to_string(),
            args,
            stage,
        };
        self.calls.borrow_mut().push(call.clone());

        if stage == "run" {
            if self.run_unspawnable {
                return Err(io::Error::from(io::ErrorKind::PermissionDenied));
            }
            return Ok(ToolOutput {
                exit_code: Some(self.run_exit_code),
                stdout: b"harness ok\n".to_vec(),
                stderr: Vec::new(),
            });
        }

        if let Some(&code) = self.failures.get(stage) {
            return Ok(ToolOutput {
                exit_code: Some(code),
                stdout: Vec::new(),
                stderr: format!("mock {stage} failure\n").into_bytes(),
            });
        }

        if !self.silent.contains(&stage) {
            if let (Some(input), Some(output)) = (call.input(), call.output()) {
                let mut text = fs::read_to_string(input)?;
                text.push_str(&format!("\n// {stage}\n"));
                fs::write(output, text)?;
            }
        }

        Ok(ToolOutput {
            exit_code: Some(0),
            ..Default::default()
        })
    }
}
