//! External tool resolution
//!
//! The pipeline drives four command-line tools. Each resolves to a path by
//! plain string composition: an explicit override wins, otherwise the default
//! name gets the global suffix appended (e.g. `mlir-opt` + `-20`). Nothing is
//! probed on disk here; a bad path surfaces when its stage first runs.

use std::fmt;

/// The external tools the pipeline invokes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    /// MLIR optimizer and dialect lowering driver (`mlir-opt`)
    Optimizer,
    /// MLIR to LLVM IR translator (`mlir-translate`)
    Translator,
    /// LLVM static compiler (`llc`)
    CodeGenerator,
    /// C compiler driver used for shared libraries and linking (`clang`)
    LinkCompiler,
}

impl ToolKind {
    pub const ALL: [ToolKind; 4] = [
        ToolKind::Optimizer,
        ToolKind::Translator,
        ToolKind::CodeGenerator,
        ToolKind::LinkCompiler,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ToolKind::Optimizer => "optimizer",
            ToolKind::Translator => "translator",
            ToolKind::CodeGenerator => "code generator",
            ToolKind::LinkCompiler => "link compiler",
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Bare executable names used when nothing overrides them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDefaults {
    pub optimizer: String,
    pub translator: String,
    pub code_generator: String,
    pub link_compiler: String,
}

impl ToolDefaults {
    pub fn get(&self, kind: ToolKind) -> &str {
        match kind {
            ToolKind::Optimizer => &self.optimizer,
            ToolKind::Translator => &self.translator,
            ToolKind::CodeGenerator => &self.code_generator,
            ToolKind::LinkCompiler => &self.link_compiler,
        }
    }
}

impl Default for ToolDefaults {
    fn default() -> Self {
        Self {
            optimizer: "mlir-opt".to_string(),
            translator: "mlir-translate".to_string(),
            code_generator: "llc".to_string(),
            link_compiler: "clang".to_string(),
        }
    }
}

/// Explicit per-tool paths; any `Some` bypasses the suffix
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOverrides {
    pub optimizer: Option<String>,
    pub translator: Option<String>,
    pub code_generator: Option<String>,
    pub link_compiler: Option<String>,
}

impl ToolOverrides {
    pub fn get(&self, kind: ToolKind) -> Option<&str> {
        match kind {
            ToolKind::Optimizer => self.optimizer.as_deref(),
            ToolKind::Translator => self.translator.as_deref(),
            ToolKind::CodeGenerator => self.code_generator.as_deref(),
            ToolKind::LinkCompiler => self.link_compiler.as_deref(),
        }
    }
}

/// Resolved tool paths for one pipeline run
///
/// Built once by [`resolve`] and only read afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolConfig {
    optimizer: String,
    translator: String,
    code_generator: String,
    link_compiler: String,
}

impl ToolConfig {
    pub fn optimizer(&self) -> &str {
        &self.optimizer
    }

    pub fn translator(&self) -> &str {
        &self.translator
    }

    pub fn code_generator(&self) -> &str {
        &self.code_generator
    }

    pub fn link_compiler(&self) -> &str {
        &self.link_compiler
    }

    pub fn path(&self, kind: ToolKind) -> &str {
        match kind {
            ToolKind::Optimizer => self.optimizer(),
            ToolKind::Translator => self.translator(),
            ToolKind::CodeGenerator => self.code_generator(),
            ToolKind::LinkCompiler => self.link_compiler(),
        }
    }
}

impl Default for ToolConfig {
    fn default() -> Self {
        resolve(&ToolDefaults::default(), "", &ToolOverrides::default())
    }
}

/// Resolve every tool: override, else `default + suffix`
pub fn resolve(defaults: &ToolDefaults, suffix: &str, overrides: &ToolOverrides) -> ToolConfig {
    let pick = |kind: ToolKind| -> String {
        let path = match overrides.get(kind) {
            Some(path) => path.to_string(),
            None => format!("{}{}", defaults.get(kind), suffix),
        };
        tracing::debug!(tool = %kind, path = %path, "resolved tool");
        path
    };

    ToolConfig {
        optimizer: pick(ToolKind::Optimizer),
        translator: pick(ToolKind::Translator),
        code_generator: pick(ToolKind::CodeGenerator),
        link_compiler: pick(ToolKind::LinkCompiler),
    }
}
