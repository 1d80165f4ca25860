//! Fake LLVM tools written as small shell scripts

#![allow(dead_code)]

use ezmlir::ToolOverrides;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Parses `<flags> <input> ... -o <output>`, logs the call and copies input to output
const COPY_TOOL: &str = r#"#!/bin/sh
tool=$(basename "$0")
out=""
in=""
while [ $# -gt 0 ]; do
  case "$1" in
    -o) out="$2"; shift 2 ;;
    -*) shift ;;
    *) if [ -z "$in" ]; then in="$1"; fi; shift ;;
  esac
done
echo "$tool $in $out" >> "$(dirname "$0")/calls.log"
cat "$in" > "$out"
echo "// $tool" >> "$out"
"#;

/// Like the copy tool, but a non-shared link writes a runnable program
const LINK_TOOL: &str = r#"#!/bin/sh
tool=$(basename "$0")
out=""
in=""
shared=0
while [ $# -gt 0 ]; do
  case "$1" in
    -o) out="$2"; shift 2 ;;
    -shared) shared=1; shift ;;
    -*) shift ;;
    *) if [ -z "$in" ]; then in="$1"; fi; shift ;;
  esac
done
echo "$tool $in $out" >> "$(dirname "$0")/calls.log"
if [ "$shared" = 1 ]; then
  cat "$in" > "$out"
else
  printf '#!/bin/sh\necho "matmul ok"\necho "warn" >&2\n' > "$out"
  chmod +x "$out"
fi
"#;

const FAILING_TOOL: &str = "#!/bin/sh\necho \"$(basename \"$0\") $1\" >> \"$(dirname \"$0\")/calls.log\"\necho 'error: pass pipeline failed' >&2\nexit 2\n";

const SILENT_TOOL: &str = "#!/bin/sh\necho \"$(basename \"$0\") $1\" >> \"$(dirname \"$0\")/calls.log\"\nexit 0\n";

pub struct FakeTools {
    pub dir: PathBuf,
}

impl FakeTools {
    /// Install `mlir-opt`, `mlir-translate`, `llc` and `clang` (all with `suffix`)
    pub fn install(dir: &Path, suffix: &str) -> Self {
        fs::create_dir_all(dir).unwrap();
        let tools = Self { dir: dir.to_path_buf() };
        tools.write(&format!("mlir-opt{suffix}"), COPY_TOOL);
        tools.write(&format!("mlir-translate{suffix}"), COPY_TOOL);
        tools.write(&format!("llc{suffix}"), COPY_TOOL);
        tools.write(&format!("clang{suffix}"), LINK_TOOL);
        tools
    }

    pub fn write(&self, name: &str, script: &str) -> PathBuf {
        let path = self.dir.join(name);
        fs::write(&path, script).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    pub fn make_failing(&self, name: &str) -> PathBuf {
        self.write(name, FAILING_TOOL)
    }

    pub fn make_silent(&self, name: &str) -> PathBuf {
        self.write(name, SILENT_TOOL)
    }

    pub fn path(&self, name: &str) -> String {
        self.dir.join(name).display().to_string()
    }

    /// Overrides pointing every tool into this directory
    pub fn overrides(&self, suffix: &str) -> ToolOverrides {
        ToolOverrides {
            optimizer: Some(self.path(&format!("mlir-opt{suffix}"))),
            translator: Some(self.path(&format!("mlir-translate{suffix}"))),
            code_generator: Some(self.path(&format!("llc{suffix}"))),
            link_compiler: Some(self.path(&format!("clang{suffix}"))),
        }
    }

    /// Tool names in call order
    pub fn calls(&self) -> Vec<String> {
        fs::read_to_string(self.dir.join("calls.log"))
            .unwrap_or_default()
            .lines()
            .map(|line| line.split_whitespace().next().unwrap_or_default().to_string())
            .collect()
    }

    /// Raw call log lines: `<tool> <input> <output>`
    pub fn call_lines(&self) -> Vec<String> {
        fs::read_to_string(self.dir.join("calls.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

pub const MATMUL: &str = r"module {
  func.func @matmul_chain(%arg0: tensor<4x8xf32>, %arg1: tensor<8x16xf32>) -> tensor<4x16xf32> {
    %0 = tensor.empty() : tensor<4x16xf32>
    %1 = linalg.matmul ins(%arg0, %arg1 : tensor<4x8xf32>, tensor<8x16xf32>) outs(%0 : tensor<4x16xf32>) -> tensor<4x16xf32>
    return %1 : tensor<4x16xf32>
  }
}
";
