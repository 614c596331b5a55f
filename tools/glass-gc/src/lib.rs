//! glass-gc library
//!
//! Compiles RetroArch-style `.slang` shaders and `.slangp` presets into packed
//! Glass presets. The pipeline runs source parsing, the GLSL -> SPIR-V ->
//! HLSL -> byte-code stage chain (through a content-addressed cache) and
//! reflection-driven parameter mapping, then assembles the artifacts.

pub mod batch;
pub mod cache;
pub mod compile;
pub mod config;
pub mod error;
pub mod log;
pub mod paths;
pub mod preset;
pub mod reflect;
pub mod registry;
pub mod source;
pub mod stages;
pub mod test_utils;

pub use batch::{BatchDriver, BatchOptions, BatchSummary, FileStatus};
pub use cache::{ShaderCache, StaticEntry};
pub use compile::{compile_texture, Compiler, IMPORTED_CATEGORY};
pub use config::GcConfig;
pub use error::{CompileError, ErrorKind, ReflectError, StageError, StageKind};
pub use log::CompileLog;
pub use preset::{parse_preset, SourcePreset};
pub use reflect::{map_params, Reflection};
pub use registry::OutputRegistry;
pub use source::{parse_shader, SourceParam, SourceShader};
pub use stages::{ShaderStage, Toolchain};
