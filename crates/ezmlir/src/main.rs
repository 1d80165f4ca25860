//! ezmlir - compile MLIR to a native object or shared library
//!
//! Usage: ezmlir [OPTIONS] <input> [output]

use anyhow::Context;
use clap::Parser as ClapParser;
use ezmlir::driver::{DEFAULT_HARNESS, DEFAULT_MODULE_NAME};
use ezmlir::{
    DiagnosticReporter, Pipeline, PipelineConfig, PipelineError, PipelineMode, ProcessExecutor, SourceInput,
    ToolDefaults, ToolOverrides, Workspace, resolve,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

#[derive(ClapParser, Debug)]
#[command(name = "ezmlir")]
#[command(version)]
#[command(about = "MLIR compiler using LLVM tools", long_about = None)]
struct Args {
    /// Input MLIR file or '-' to read from stdin
    #[arg(required = true)]
    input: PathBuf,

    /// Output object (.o) or shared library (.so)
    output: Option<PathBuf>,

    /// Suffix for all LLVM binaries (e.g. '-20' for Ubuntu)
    #[arg(long, default_value = "")]
    suffix: String,

    /// Path to mlir-opt binary (overrides --suffix)
    #[arg(long)]
    mlir_opt: Option<String>,

    /// Path to mlir-translate binary (overrides --suffix)
    #[arg(long)]
    mlir_translate: Option<String>,

    /// Path to llc binary (overrides --suffix)
    #[arg(long)]
    llc: Option<String>,

    /// Path to clang binary (overrides --suffix)
    #[arg(long)]
    clang: Option<String>,

    /// Output directory for generated files
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Directory for intermediate files (a temporary directory if unset)
    #[arg(long)]
    temp_dir: Option<PathBuf>,

    /// Keep intermediate files (in --temp-dir, or else in --output-dir)
    #[arg(long)]
    keep_temps: bool,

    /// Build a shared library instead of an object file
    #[arg(long)]
    shared: bool,

    /// Module name used for generated file names
    #[arg(long)]
    name: Option<String>,

    /// Test harness C source linked with the object and run
    #[arg(long, default_value = DEFAULT_HARNESS)]
    harness: PathBuf,

    /// Never link or run a test harness
    #[arg(long)]
    no_harness: bool,

    /// Do not echo stage contents
    #[arg(short, long)]
    quiet: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    if let Err(err) = run(&args) {
        match err.downcast_ref::<PipelineError>() {
            Some(pipeline_err) => DiagnosticReporter::new().report_error(pipeline_err),
            None => eprintln!("error: {err:#}"),
        }
        process::exit(1);
    }
}

/// `RUST_LOG` wins; otherwise `--verbose` selects debug output
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "ezmlir=debug" } else { "warn" }));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true).with_level(true))
        .with(filter)
        .init();
}

fn select_mode(args: &Args) -> PipelineMode {
    if args.shared {
        return PipelineMode::SharedLibrary;
    }
    args.output
        .as_deref()
        .and_then(PipelineMode::from_output_path)
        .unwrap_or_default()
}

fn module_name(args: &Args, input: &SourceInput) -> String {
    args.name
        .clone()
        .or_else(|| {
            args.output
                .as_deref()
                .and_then(Path::file_stem)
                .map(|s| s.to_string_lossy().into_owned())
        })
        .or_else(|| input.stem())
        .unwrap_or_else(|| DEFAULT_MODULE_NAME.to_string())
}

/// Kept intermediates land next to the outputs unless `--temp-dir` says otherwise
fn workspace_dir(args: &Args) -> Option<&Path> {
    match args.temp_dir.as_deref() {
        Some(dir) => Some(dir),
        None if args.keep_temps => Some(args.output_dir.as_path()),
        None => None,
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    let input = SourceInput::from_arg(&args.input);
    let source = input.read()?;

    let overrides = ToolOverrides {
        optimizer: args.mlir_opt.clone(),
        translator: args.mlir_translate.clone(),
        code_generator: args.llc.clone(),
        link_compiler: args.clang.clone(),
    };
    let tools = resolve(&ToolDefaults::default(), &args.suffix, &overrides);

    let config = PipelineConfig {
        mode: select_mode(args),
        module_name: module_name(args, &input),
        output_dir: args.output_dir.clone(),
        output: args.output.clone(),
        harness: (!args.no_harness).then(|| args.harness.clone()),
        echo: !args.quiet,
    };

    let target_dir = match config.output.as_deref().and_then(Path::parent) {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        Some(_) => PathBuf::from("."),
        None => config.output_dir.clone(),
    };
    fs::create_dir_all(&target_dir)
        .with_context(|| format!("cannot create output directory {}", target_dir.display()))?;

    tracing::debug!(input = %input.display_name(), ?config, "configured pipeline");

    let workspace = Workspace::open(workspace_dir(args), args.keep_temps)?;
    let executor = ProcessExecutor;
    let pipeline = Pipeline::new(&tools, &executor, config);
    pipeline.run(&source, workspace)?;

    Ok(())
}
