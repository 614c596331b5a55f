//! On-disk artifact formats.

mod packed_preset;

pub use packed_preset::{
    PackedOverride, PackedParam, PackedPreset, PackedSampler, PackedShader, PackedTexture,
};
