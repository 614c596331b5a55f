//! Shared test utilities for integration and unit tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::StageError;
use crate::log::CompileLog;
use crate::stages::{
    ByteCodeCompiler, CrossOutput, GlslCompiler, ShaderStage, SpirvTranslator, Toolchain,
    SPIRV_MAGIC,
};

// ============================================================================
// Fake stages
// ============================================================================

/// Line prefix a test shader uses to hand the fake translator its reflection.
pub const REFLECT_DIRECTIVE: &str = "//@reflect ";

/// Text that makes the fake GLSL compiler fail.
pub const FAIL_GLSL: &str = "#error";

/// Text that makes the fake byte-code compiler return nothing.
pub const EMPTY_BYTE_CODE: &str = "EMPTY_BYTE_CODE";

/// Reflection with no buffers and no textures.
pub const EMPTY_REFLECTION: &str =
    r#"{ "types": {}, "ubos": [], "push_constants": [], "textures": [] }"#;

/// Packs the source text into SPIR-V words behind the magic number.
pub struct FakeGlsl;

impl GlslCompiler for FakeGlsl {
    fn compile_glsl(
        &self,
        source: &str,
        stage: ShaderStage,
        log: &mut CompileLog,
    ) -> Result<Vec<u32>, StageError> {
        if let Some(line) = source.lines().find(|l| l.contains(FAIL_GLSL)) {
            return Err(StageError::new(format!(
                "ERROR: 0:1: '{}' : forced failure in {} stage",
                line.trim(),
                stage
            )));
        }
        log.note(format!("fake glslang: {} stage, {} bytes", stage, source.len()));

        let mut words = vec![SPIRV_MAGIC];
        words.extend(source.as_bytes().chunks(4).map(|chunk| {
            let mut word = [0u8; 4];
            word[..chunk.len()].copy_from_slice(chunk);
            u32::from_le_bytes(word)
        }));
        Ok(words)
    }
}

/// Unpacks [`FakeGlsl`] output, emits it prefixed by the stage as "HLSL", and
/// answers reflection from a `//@reflect` line (or [`EMPTY_REFLECTION`]).
pub struct FakeCross;

impl SpirvTranslator for FakeCross {
    fn translate(
        &self,
        spirv: &[u32],
        stage: ShaderStage,
        reflect: bool,
        _log: &mut CompileLog,
    ) -> Result<CrossOutput, StageError> {
        if spirv.first() != Some(&SPIRV_MAGIC) {
            return Err(StageError::new("invalid SPIR-V magic number"));
        }
        let bytes: Vec<u8> = spirv[1..].iter().flat_map(|w| w.to_le_bytes()).collect();
        let source = String::from_utf8_lossy(&bytes)
            .trim_end_matches('\0')
            .to_string();

        let reflection = reflect.then(|| {
            source
                .lines()
                .find_map(|l| l.trim().strip_prefix(REFLECT_DIRECTIVE))
                .unwrap_or(EMPTY_REFLECTION)
                .to_string()
        });

        Ok(CrossOutput {
            hlsl: format!("// {} stage\n{}", stage, source),
            reflection,
        })
    }
}

/// Shader model the default fake toolchain targets.
pub const FAKE_SHADER_MODEL: &str = "5_0";

/// Produces deterministic byte-code tagged with its profile and counts how
/// often it ran.
pub struct FakeByteCode {
    pub shader_model: String,
    pub calls: Arc<AtomicUsize>,
}

impl ByteCodeCompiler for FakeByteCode {
    fn target(&self, stage: ShaderStage) -> String {
        stage.profile(&self.shader_model)
    }

    fn compile_hlsl(
        &self,
        hlsl: &str,
        stage: ShaderStage,
        _log: &mut CompileLog,
    ) -> Result<Vec<u8>, StageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if hlsl.contains(EMPTY_BYTE_CODE) {
            return Ok(Vec::new());
        }
        let mut code = b"DXBC".to_vec();
        code.extend(self.target(stage).as_bytes());
        code.extend((hlsl.len() as u32).to_le_bytes());
        Ok(code)
    }
}

/// Fake toolchain plus the byte-code compiler's invocation counter.
pub fn fake_toolchain() -> (Toolchain, Arc<AtomicUsize>) {
    fake_toolchain_for(FAKE_SHADER_MODEL)
}

/// Fake toolchain whose byte-code targets `shader_model`.
pub fn fake_toolchain_for(shader_model: &str) -> (Toolchain, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let toolchain = Toolchain::new(
        Box::new(FakeGlsl),
        Box::new(FakeCross),
        Box::new(FakeByteCode {
            shader_model: shader_model.to_string(),
            calls: Arc::clone(&calls),
        }),
    );
    (toolchain, calls)
}

/// Source of a minimal two-stage shader whose fragment stage reflects
/// `reflection`.
pub fn shader_source(params: &[&str], reflection: &str) -> String {
    let mut text = String::from("#version 450\n");
    for p in params {
        text.push_str(p);
        text.push('\n');
    }
    text.push_str("#pragma stage vertex\nvoid main() { gl_Position = vec4(0.0); }\n");
    text.push_str("#pragma stage fragment\n");
    text.push_str(REFLECT_DIRECTIVE);
    text.push_str(reflection);
    text.push_str("\nvoid main() { FragColor = vec4(1.0); }\n");
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fake_chain_round_trips_source() {
        let (toolchain, calls) = fake_toolchain();
        let mut log = CompileLog::new();
        let src = "void main() {}\n//@reflect {\"textures\": []}\n";
        let spirv = toolchain
            .glsl()
            .compile_glsl(src, ShaderStage::Fragment, &mut log)
            .unwrap();
        let cross = toolchain
            .cross()
            .translate(&spirv, ShaderStage::Fragment, true, &mut log)
            .unwrap();
        assert!(cross.hlsl.ends_with(src));
        assert_eq!(cross.reflection.as_deref(), Some("{\"textures\": []}"));

        let code = toolchain
            .byte_code()
            .compile_hlsl(&cross.hlsl, ShaderStage::Fragment, &mut log)
            .unwrap();
        assert!(code.starts_with(b"DXBCps_5_0"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_vertex_stage_has_no_reflection() {
        let (toolchain, _) = fake_toolchain();
        let mut log = CompileLog::new();
        let spirv = toolchain
            .glsl()
            .compile_glsl("x", ShaderStage::Vertex, &mut log)
            .unwrap();
        let cross = toolchain
            .cross()
            .translate(&spirv, ShaderStage::Vertex, false, &mut log)
            .unwrap();
        assert!(cross.reflection.is_none());
    }
}
