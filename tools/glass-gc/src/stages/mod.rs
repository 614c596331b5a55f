//! The translation chain: GLSL -> SPIR-V -> HLSL (+ reflection) -> byte-code.
//!
//! Each step is a trait so the pipeline can run against the reference command
//! line tools ([`external`]) or against an in-memory fake in tests.

pub mod external;

use std::fmt;

use crate::error::StageError;
use crate::log::CompileLog;

pub use external::{external_toolchain, resolve_tool};

/// Magic number that opens every SPIR-V module.
pub const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Programmable stage a piece of source is compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub const ALL: [ShaderStage; 2] = [ShaderStage::Vertex, ShaderStage::Fragment];

    /// Stage name as glslang expects it after `-S`.
    pub fn short_name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vert",
            ShaderStage::Fragment => "frag",
        }
    }

    /// HLSL target profile for a shader model such as `5_0`.
    pub fn profile(self, shader_model: &str) -> String {
        match self {
            ShaderStage::Vertex => format!("vs_{}", shader_model),
            ShaderStage::Fragment => format!("ps_{}", shader_model),
        }
    }

    pub fn is_fragment(self) -> bool {
        self == ShaderStage::Fragment
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Result of SPIR-V translation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrossOutput {
    pub hlsl: String,
    /// Reflection JSON, only produced when requested.
    pub reflection: Option<String>,
}

pub trait GlslCompiler {
    fn compile_glsl(
        &self,
        source: &str,
        stage: ShaderStage,
        log: &mut CompileLog,
    ) -> Result<Vec<u32>, StageError>;
}

pub trait SpirvTranslator {
    fn translate(
        &self,
        spirv: &[u32],
        stage: ShaderStage,
        reflect: bool,
        log: &mut CompileLog,
    ) -> Result<CrossOutput, StageError>;
}

pub trait ByteCodeCompiler {
    /// Target profile the byte-code is built for, part of the cache key.
    fn target(&self, stage: ShaderStage) -> String;

    fn compile_hlsl(
        &self,
        hlsl: &str,
        stage: ShaderStage,
        log: &mut CompileLog,
    ) -> Result<Vec<u8>, StageError>;
}

/// The three stage implementations used by a compiler.
pub struct Toolchain {
    glsl: Box<dyn GlslCompiler>,
    cross: Box<dyn SpirvTranslator>,
    byte_code: Box<dyn ByteCodeCompiler>,
}

impl Toolchain {
    pub fn new(
        glsl: Box<dyn GlslCompiler>,
        cross: Box<dyn SpirvTranslator>,
        byte_code: Box<dyn ByteCodeCompiler>,
    ) -> Self {
        Self {
            glsl,
            cross,
            byte_code,
        }
    }

    pub fn glsl(&self) -> &dyn GlslCompiler {
        self.glsl.as_ref()
    }

    pub fn cross(&self) -> &dyn SpirvTranslator {
        self.cross.as_ref()
    }

    pub fn byte_code(&self) -> &dyn ByteCodeCompiler {
        self.byte_code.as_ref()
    }
}

/// Decode little-endian SPIR-V words.
pub fn spirv_words(bytes: &[u8]) -> Result<Vec<u32>, StageError> {
    if bytes.len() % 4 != 0 {
        return Err(StageError::new(format!(
            "SPIR-V module size {} is not a multiple of 4",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|w| u32::from_le_bytes([w[0], w[1], w[2], w[3]]))
        .collect())
}

pub fn spirv_bytes(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        assert_eq!(ShaderStage::Vertex.to_string(), "vertex");
        assert_eq!(ShaderStage::Fragment.short_name(), "frag");
        assert_eq!(ShaderStage::Vertex.profile("5_0"), "vs_5_0");
        assert_eq!(ShaderStage::Fragment.profile("5_0"), "ps_5_0");
    }

    #[test]
    fn test_spirv_words() {
        let words = [SPIRV_MAGIC, 0x0001_0000];
        let bytes = spirv_bytes(&words);
        assert_eq!(&bytes[..4], &[0x03, 0x02, 0x23, 0x07]);
        assert_eq!(spirv_words(&bytes).unwrap(), words);
        assert!(spirv_words(&bytes[..5]).is_err());
    }
}
