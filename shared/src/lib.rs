//! Shared artifact types for the Glass shader compiler.
//!
//! A renderer consumes these: [`PresetDef`] holds the ordered passes
//! ([`ShaderDef`]), static textures ([`TextureDef`]) and parameter overrides
//! of one visual effect. Byte buffers are [`Blob`]s, which record whether the
//! artifact owns its bytes or borrows them from static tables.

pub mod artifact_format;
pub mod blob;
pub mod formats;
pub mod hash;
pub mod preset;
pub mod shader;
pub mod texture;

pub use artifact_format::{ArtifactFormat, CACHE_FORMAT, PRESET_FORMAT};
pub use blob::Blob;
pub use hash::ShaderHash;
pub use preset::{BuildStep, PresetDef};
pub use shader::{ParamOverride, ShaderDef, ShaderParam, ShaderSampler};
pub use texture::TextureDef;
