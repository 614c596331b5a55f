//! Stage implementations that shell out to the reference tools.
//!
//! - `glslangValidator` compiles Vulkan GLSL to SPIR-V
//! - `spirv-cross` emits HLSL and, for the fragment stage, reflection JSON
//! - `fxc` compiles HLSL to DXBC byte-code
//!
//! Intermediate files are written to a scratch directory that is removed when
//! the stage returns.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

use super::{
    spirv_bytes, spirv_words, ByteCodeCompiler, CrossOutput, GlslCompiler, ShaderStage,
    SpirvTranslator, Toolchain,
};
use crate::config::ToolsConfig;
use crate::error::{CompileError, StageError};
use crate::log::CompileLog;

/// Warnings fxc reports for code spirv-cross routinely emits.
const FXC_PRELUDE: &str = "#pragma warning (disable : 3556)\n\
                           #pragma warning (disable : 3557)\n\
                           #pragma warning (disable : 3570)\n\
                           #pragma warning (disable : 3571)\n\
                           #pragma warning (disable : 4000)\n\
                           #pragma warning (disable : 4008)\n";

/// Locate a tool by name on `PATH`, or check an explicit path.
pub fn resolve_tool(name: &str) -> Result<PathBuf, CompileError> {
    which::which(name).map_err(|e| CompileError::MissingTool {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

/// Toolchain running the configured command line tools.
pub fn external_toolchain(tools: &ToolsConfig) -> Result<Toolchain, CompileError> {
    let glslang = Glslang {
        exe: resolve_tool(&tools.glslang)?,
    };
    let cross = SpirvCross {
        exe: resolve_tool(&tools.spirv_cross)?,
        shader_model: tools.shader_model.replace('_', ""),
    };
    let fxc = Fxc {
        exe: resolve_tool(&tools.fxc)?,
        shader_model: tools.shader_model.clone(),
    };
    tracing::debug!(
        "using {}, {}, {}",
        glslang.exe.display(),
        cross.exe.display(),
        fxc.exe.display()
    );
    Ok(Toolchain::new(
        Box::new(glslang),
        Box::new(cross),
        Box::new(fxc),
    ))
}

pub struct Glslang {
    exe: PathBuf,
}

pub struct SpirvCross {
    exe: PathBuf,
    /// Shader model without separator, e.g. `50`.
    shader_model: String,
}

pub struct Fxc {
    exe: PathBuf,
    /// Shader model with separator, e.g. `5_0`.
    shader_model: String,
}

impl GlslCompiler for Glslang {
    fn compile_glsl(
        &self,
        source: &str,
        stage: ShaderStage,
        log: &mut CompileLog,
    ) -> Result<Vec<u32>, StageError> {
        let scratch = scratch_dir()?;
        let input = scratch.path().join(format!("shader.{}", stage.short_name()));
        let output = scratch.path().join("shader.spv");
        write_file(&input, source.as_bytes())?;

        let mut cmd = Command::new(&self.exe);
        cmd.args(["-V", "--quiet", "-S", stage.short_name(), "-o"])
            .arg(&output)
            .arg(&input);
        let run = run_tool(&mut cmd)?;
        check_output(&run, &self.exe, log)?;

        let words = spirv_words(&read_file(&output)?)?;
        if words.is_empty() {
            return Err(StageError::new("glslang produced an empty SPIR-V module"));
        }
        Ok(words)
    }
}

impl SpirvTranslator for SpirvCross {
    fn translate(
        &self,
        spirv: &[u32],
        _stage: ShaderStage,
        reflect: bool,
        log: &mut CompileLog,
    ) -> Result<CrossOutput, StageError> {
        let scratch = scratch_dir()?;
        let input = scratch.path().join("shader.spv");
        write_file(&input, &spirv_bytes(spirv))?;

        let mut cmd = Command::new(&self.exe);
        cmd.arg(&input)
            .args(["--hlsl", "--shader-model", self.shader_model.as_str()]);
        let run = run_tool(&mut cmd)?;
        check_output(&run.errors_only(), &self.exe, log)?;

        let reflection = if reflect {
            let mut cmd = Command::new(&self.exe);
            cmd.arg(&input).arg("--reflect");
            let run = run_tool(&mut cmd)?;
            check_output(&run.errors_only(), &self.exe, log)?;
            Some(run.stdout)
        } else {
            None
        };

        Ok(CrossOutput {
            hlsl: run.stdout,
            reflection,
        })
    }
}

impl ByteCodeCompiler for Fxc {
    fn target(&self, stage: ShaderStage) -> String {
        stage.profile(&self.shader_model)
    }

    fn compile_hlsl(
        &self,
        hlsl: &str,
        stage: ShaderStage,
        log: &mut CompileLog,
    ) -> Result<Vec<u8>, StageError> {
        let scratch = scratch_dir()?;
        let input = scratch.path().join("shader.hlsl");
        let output = scratch.path().join("shader.bin");
        write_file(&input, format!("{}{}", FXC_PRELUDE, hlsl).as_bytes())?;

        let mut cmd = Command::new(&self.exe);
        cmd.args(["/nologo", "/O3", "/E", "main", "/T"])
            .arg(self.target(stage))
            .arg("/Fo")
            .arg(&output)
            .arg(&input);
        let run = run_tool(&mut cmd)?;
        check_output(&run, &self.exe, log)?;

        read_file(&output)
    }
}

/// Captured output of one tool invocation.
struct ToolRun {
    success: bool,
    status: String,
    stdout: String,
    stderr: String,
}

impl ToolRun {
    fn text(&self) -> String {
        format!("{}{}", self.stdout, self.stderr).trim().to_string()
    }

    /// Same run with stdout dropped, for tools that print their product there.
    fn errors_only(&self) -> ToolRun {
        ToolRun {
            success: self.success,
            status: self.status.clone(),
            stdout: String::new(),
            stderr: self.stderr.clone(),
        }
    }
}

fn run_tool(cmd: &mut Command) -> Result<ToolRun, StageError> {
    tracing::debug!("running {:?}", cmd);
    let output = cmd
        .output()
        .map_err(|e| StageError::new(format!("failed to run {:?}: {}", cmd.get_program(), e)))?;
    Ok(ToolRun {
        success: output.status.success(),
        status: output.status.to_string(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Fail on a non-zero exit or error text; keep anything else as a warning.
fn check_output(run: &ToolRun, exe: &Path, log: &mut CompileLog) -> Result<(), StageError> {
    let text = run.text();
    if !run.success || is_error_text(&text) {
        let mut diagnostics = text;
        if !run.success {
            diagnostics.push_str(&format!("\n{} exited with {}", exe.display(), run.status));
        }
        return Err(StageError::new(diagnostics.trim().to_string()));
    }
    if !text.is_empty() {
        log.warn(text);
    }
    Ok(())
}

fn is_error_text(text: &str) -> bool {
    text.contains("error") || text.contains("ERROR")
}

fn scratch_dir() -> Result<TempDir, StageError> {
    tempfile::Builder::new()
        .prefix("glass-gc")
        .tempdir()
        .map_err(|e| StageError::new(format!("failed to create scratch directory: {}", e)))
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), StageError> {
    fs::write(path, bytes)
        .map_err(|e| StageError::new(format!("failed to write {}: {}", path.display(), e)))
}

fn read_file(path: &Path) -> Result<Vec<u8>, StageError> {
    fs::read(path).map_err(|e| StageError::new(format!("failed to read {}: {}", path.display(), e)))
}
