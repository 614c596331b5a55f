//! Compiled shader pass artifacts.

use std::collections::BTreeMap;

use crate::blob::Blob;
use crate::hash::ShaderHash;

/// A parameter exposed by a compiled shader.
///
/// `buffer`, `offset` and `size` come from compiler reflection: `buffer` is
/// the uniform-buffer binding, or a negative index for push-constant blocks
/// (-1 for the first block, -2 for the second, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderParam {
    pub name: String,
    pub buffer: i32,
    pub offset: u32,
    pub size: u32,
    pub min_value: f32,
    pub max_value: f32,
    pub default_value: f32,
    /// Starts at `default_value`; renderers adjust it at runtime.
    pub current_value: f32,
    pub step_value: f32,
    pub description: String,
}

impl ShaderParam {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        buffer: i32,
        offset: u32,
        size: u32,
        min_value: f32,
        max_value: f32,
        default_value: f32,
        step_value: f32,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            buffer,
            offset,
            size,
            min_value,
            max_value,
            default_value,
            current_value: default_value,
            step_value,
            description: description.into(),
        }
    }

    /// Whether the parameter lives in a push-constant block.
    pub fn is_push_constant(&self) -> bool {
        self.buffer < 0
    }
}

/// A texture/sampler binding reflected from the fragment stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSampler {
    pub name: String,
    pub binding: i32,
}

impl ShaderSampler {
    pub fn new(name: impl Into<String>, binding: i32) -> Self {
        Self {
            name: name.into(),
            binding,
        }
    }
}

/// A named scalar override applied to shader parameters at preset load.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamOverride {
    pub name: String,
    pub value: f32,
}

impl ParamOverride {
    pub fn new(name: impl Into<String>, value: f32) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// One compiled render pass.
///
/// Parameters are ordered by first declaration in the shader source, not by
/// memory layout. Preset params are opaque key/value pairs (scale type,
/// filtering, wrap mode, ...) interpreted by the renderer at pass setup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShaderDef {
    pub name: String,
    /// Output pixel format from `#pragma format`, empty when unspecified.
    pub format: String,
    pub params: Vec<ShaderParam>,
    pub samplers: Vec<ShaderSampler>,
    pub preset_params: BTreeMap<String, String>,
    pub vertex_byte_code: Blob,
    pub fragment_byte_code: Blob,
    pub vertex_hash: ShaderHash,
    pub fragment_hash: ShaderHash,
}

impl ShaderDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_param(
        &mut self,
        name: impl Into<String>,
        buffer: i32,
        offset: u32,
        size: u32,
        min_value: f32,
        max_value: f32,
        default_value: f32,
        step_value: f32,
        description: impl Into<String>,
    ) {
        self.params.push(ShaderParam::new(
            name,
            buffer,
            offset,
            size,
            min_value,
            max_value,
            default_value,
            step_value,
            description,
        ));
    }

    pub fn add_sampler(&mut self, name: impl Into<String>, binding: i32) {
        self.samplers.push(ShaderSampler::new(name, binding));
    }

    /// Attach a preset key/value pair. An existing key is kept.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.preset_params.entry(key.into()).or_insert(value.into());
        self
    }

    pub fn preset_param(&self, key: &str) -> Option<&str> {
        self.preset_params.get(key).map(String::as_str)
    }

    pub fn find_param(&self, name: &str) -> Option<&ShaderParam> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Bytes a renderer must allocate for `buffer`: the furthest `offset + size`.
    pub fn params_size(&self, buffer: i32) -> u32 {
        self.params
            .iter()
            .filter(|p| p.buffer == buffer)
            .map(|p| p.offset + p.size)
            .max()
            .unwrap_or(0)
    }

    /// Whether both stages' byte-code is owned by this artifact.
    pub fn is_dynamic(&self) -> bool {
        self.vertex_byte_code.is_owned() && self.fragment_byte_code.is_owned()
    }

    pub fn into_owned(mut self) -> Self {
        self.vertex_byte_code = self.vertex_byte_code.into_owned();
        self.fragment_byte_code = self.fragment_byte_code.into_owned();
        self
    }
}
