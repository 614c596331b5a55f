//! Packed preset format (`.sgpreset`)
//!
//! Binary container for a compiled preset using bitcode serialization.
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │  Magic: "SGPR" (4 bytes)                 │
//! ├──────────────────────────────────────────┤
//! │  PackedPreset (bitcode serialized)       │
//! │  ├── version: u32                        │
//! │  ├── name / category / import_path       │
//! │  ├── header: Vec<String>                 │
//! │  ├── shaders: Vec<PackedShader>          │
//! │  ├── textures: Vec<PackedTexture>        │
//! │  └── overrides: Vec<PackedOverride>      │
//! └──────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use bitcode::{Decode, Encode};

use crate::artifact_format::PRESET_FORMAT;
use crate::hash::ShaderHash;
use crate::preset::PresetDef;
use crate::shader::{ParamOverride, ShaderDef, ShaderParam, ShaderSampler};
use crate::texture::TextureDef;

/// Serialized form of a [`PresetDef`].
#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct PackedPreset {
    pub version: u32,
    pub name: String,
    pub category: String,
    pub import_path: Option<String>,
    /// Attribution lines: where the preset came from plus comment excerpts
    /// collected from its shader sources.
    pub header: Vec<String>,
    pub shaders: Vec<PackedShader>,
    pub textures: Vec<PackedTexture>,
    pub overrides: Vec<PackedOverride>,
}

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct PackedShader {
    pub name: String,
    pub format: String,
    pub params: Vec<PackedParam>,
    pub samplers: Vec<PackedSampler>,
    pub preset_params: Vec<(String, String)>,
    pub vertex_byte_code: Vec<u8>,
    pub fragment_byte_code: Vec<u8>,
    pub vertex_hash: ShaderHash,
    pub fragment_hash: ShaderHash,
}

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct PackedParam {
    pub name: String,
    pub buffer: i32,
    pub offset: u32,
    pub size: u32,
    pub min_value: f32,
    pub max_value: f32,
    pub default_value: f32,
    pub step_value: f32,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct PackedSampler {
    pub name: String,
    pub binding: i32,
}

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct PackedTexture {
    pub name: String,
    pub data: Vec<u8>,
    pub preset_params: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct PackedOverride {
    pub name: String,
    pub value: f32,
}

impl PackedPreset {
    /// Pack a compiled preset together with its attribution header.
    pub fn from_preset(preset: &PresetDef, header: Vec<String>) -> Self {
        Self {
            version: PRESET_FORMAT.version,
            name: preset.name.clone(),
            category: preset.category.clone(),
            import_path: preset
                .import_path
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned()),
            header,
            shaders: preset.shader_defs.iter().map(PackedShader::from).collect(),
            textures: preset.texture_defs.iter().map(PackedTexture::from).collect(),
            overrides: preset
                .overrides
                .iter()
                .map(|o| PackedOverride {
                    name: o.name.clone(),
                    value: o.value,
                })
                .collect(),
        }
    }

    /// Unpack into a preset whose buffers are all owned.
    pub fn into_preset(self) -> PresetDef {
        PresetDef {
            name: self.name,
            category: self.category,
            import_path: self.import_path.map(PathBuf::from),
            shader_defs: self.shaders.into_iter().map(ShaderDef::from).collect(),
            texture_defs: self.textures.into_iter().map(TextureDef::from).collect(),
            overrides: self
                .overrides
                .into_iter()
                .map(|o| ParamOverride::new(o.name, o.value))
                .collect(),
            build_step: None,
        }
    }

    /// Serialize with magic header.
    pub fn to_bytes(&self) -> anyhow::Result<Vec<u8>> {
        self.validate()?;
        let mut bytes = PRESET_FORMAT.magic.to_vec();
        bytes.extend(bitcode::encode(self));
        Ok(bytes)
    }

    /// Deserialize from bytes and validate.
    pub fn from_bytes(bytes: &[u8]) -> anyhow::Result<Self> {
        if !PRESET_FORMAT.matches(bytes) {
            anyhow::bail!(
                "Invalid {} magic bytes (expected: {:?})",
                PRESET_FORMAT.extension,
                std::str::from_utf8(PRESET_FORMAT.magic).unwrap_or("SGPR")
            );
        }

        let preset: PackedPreset = bitcode::decode(&bytes[4..])
            .map_err(|e| anyhow::anyhow!("Failed to decode packed preset: {}", e))?;

        preset.validate()?;
        Ok(preset)
    }

    /// Checks:
    /// - Version is supported
    /// - At least one pass
    /// - Every pass has byte-code for both stages
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.version > PRESET_FORMAT.version {
            anyhow::bail!(
                "Unsupported {} version: {} (max supported: {})",
                PRESET_FORMAT.extension,
                self.version,
                PRESET_FORMAT.version
            );
        }
        if self.shaders.is_empty() {
            anyhow::bail!("Preset '{}' has no shader passes", self.name);
        }
        for shader in &self.shaders {
            if shader.vertex_byte_code.is_empty() || shader.fragment_byte_code.is_empty() {
                anyhow::bail!(
                    "Shader '{}' in preset '{}' is missing byte-code",
                    shader.name,
                    self.name
                );
            }
        }
        Ok(())
    }
}

impl From<&ShaderDef> for PackedShader {
    fn from(def: &ShaderDef) -> Self {
        Self {
            name: def.name.clone(),
            format: def.format.clone(),
            params: def
                .params
                .iter()
                .map(|p| PackedParam {
                    name: p.name.clone(),
                    buffer: p.buffer,
                    offset: p.offset,
                    size: p.size,
                    min_value: p.min_value,
                    max_value: p.max_value,
                    default_value: p.default_value,
                    step_value: p.step_value,
                    description: p.description.clone(),
                })
                .collect(),
            samplers: def
                .samplers
                .iter()
                .map(|s| PackedSampler {
                    name: s.name.clone(),
                    binding: s.binding,
                })
                .collect(),
            preset_params: def
                .preset_params
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            vertex_byte_code: def.vertex_byte_code.to_vec(),
            fragment_byte_code: def.fragment_byte_code.to_vec(),
            vertex_hash: def.vertex_hash,
            fragment_hash: def.fragment_hash,
        }
    }
}

impl From<PackedShader> for ShaderDef {
    fn from(packed: PackedShader) -> Self {
        Self {
            name: packed.name,
            format: packed.format,
            params: packed
                .params
                .into_iter()
                .map(|p| {
                    ShaderParam::new(
                        p.name,
                        p.buffer,
                        p.offset,
                        p.size,
                        p.min_value,
                        p.max_value,
                        p.default_value,
                        p.step_value,
                        p.description,
                    )
                })
                .collect(),
            samplers: packed
                .samplers
                .into_iter()
                .map(|s| ShaderSampler::new(s.name, s.binding))
                .collect(),
            preset_params: packed.preset_params.into_iter().collect(),
            vertex_byte_code: packed.vertex_byte_code.into(),
            fragment_byte_code: packed.fragment_byte_code.into(),
            vertex_hash: packed.vertex_hash,
            fragment_hash: packed.fragment_hash,
        }
    }
}

impl From<&TextureDef> for PackedTexture {
    fn from(def: &TextureDef) -> Self {
        Self {
            name: def.name.clone(),
            data: def.data.to_vec(),
            preset_params: def
                .preset_params
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}

impl From<PackedTexture> for TextureDef {
    fn from(packed: PackedTexture) -> Self {
        Self {
            name: packed.name,
            data: packed.data.into(),
            preset_params: packed.preset_params.into_iter().collect(),
        }
    }
}
