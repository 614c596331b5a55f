//! Error types for the compiler pipeline.
//!
//! Every failure that aborts a file is a [`CompileError`] carrying the path it
//! belongs to, so batch logs attribute it to the right source.

use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::stages::ShaderStage;

/// One of the translation steps in the stage chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    /// GLSL to SPIR-V
    Glsl,
    /// SPIR-V to HLSL text plus reflection
    Cross,
    /// HLSL text to byte-code
    ByteCode,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageKind::Glsl => f.write_str("GLSL to SPIR-V"),
            StageKind::Cross => f.write_str("SPIR-V to HLSL"),
            StageKind::ByteCode => f.write_str("HLSL to byte-code"),
        }
    }
}

/// Failure reported by a translation stage, with whatever text the tool printed.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{diagnostics}")]
pub struct StageError {
    pub diagnostics: String,
}

impl StageError {
    pub fn new(diagnostics: impl Into<String>) -> Self {
        Self {
            diagnostics: diagnostics.into(),
        }
    }
}

/// Failure while mapping reflection metadata onto declared parameters.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ReflectError {
    #[error("the fragment stage produced no reflection metadata")]
    Missing,

    #[error("reflection metadata is not valid JSON: {0}")]
    Json(String),

    #[error("reflection references undefined type `{0}`")]
    MissingType(String),

    #[error("unknown type `{type_name}` for member `{member}`")]
    UnknownType { member: String, type_name: String },
}

/// Coarse category of a [`CompileError`], for callers that only branch on kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    Stage,
    Reflection,
    EmptyByteCode,
    MissingTool,
}

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("unable to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} includes itself", path.display())]
    IncludeCycle { path: PathBuf },

    #[error("{stage} failed for {shader_stage} stage of {}:\n{diagnostics}", path.display())]
    Stage {
        stage: StageKind,
        shader_stage: ShaderStage,
        path: PathBuf,
        diagnostics: String,
    },

    #[error("reflection failed for {}: {source}", path.display())]
    Reflect {
        path: PathBuf,
        #[source]
        source: ReflectError,
    },

    #[error("{shader_stage} stage of {} produced no byte-code", path.display())]
    EmptyByteCode {
        shader_stage: ShaderStage,
        path: PathBuf,
    },

    #[error("tool `{name}` not found: {reason}")]
    MissingTool { name: String, reason: String },
}

impl CompileError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        CompileError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CompileError::Io { .. } | CompileError::IncludeCycle { .. } => ErrorKind::Io,
            CompileError::Stage { .. } => ErrorKind::Stage,
            CompileError::Reflect { .. } => ErrorKind::Reflection,
            CompileError::EmptyByteCode { .. } => ErrorKind::EmptyByteCode,
            CompileError::MissingTool { .. } => ErrorKind::MissingTool,
        }
    }
}
