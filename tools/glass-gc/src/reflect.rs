//! Mapping of declared parameters onto reflected buffer layouts.
//!
//! Reflection metadata is the JSON `spirv-cross --reflect` prints for the
//! fragment stage. Only the parts the mapper reads are modelled; everything
//! else is ignored on deserialization.

use hashbrown::HashMap;
use serde::Deserialize;

use glass_shared::ShaderSampler;

use crate::error::ReflectError;
use crate::source::SourceParam;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Reflection {
    #[serde(default)]
    pub types: HashMap<String, ReflectedType>,
    #[serde(default)]
    pub ubos: Vec<ReflectedBlock>,
    #[serde(default)]
    pub push_constants: Vec<ReflectedBlock>,
    #[serde(default)]
    pub textures: Vec<ReflectedTexture>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReflectedType {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub members: Vec<ReflectedMember>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReflectedMember {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub offset: u32,
}

/// A uniform buffer or push-constant block.
#[derive(Debug, Clone, Deserialize)]
pub struct ReflectedBlock {
    /// Key into [`Reflection::types`].
    #[serde(rename = "type")]
    pub type_id: String,
    #[serde(default)]
    pub binding: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReflectedTexture {
    pub name: String,
    #[serde(default)]
    pub binding: i32,
}

impl Reflection {
    pub fn from_json(text: &str) -> Result<Self, ReflectError> {
        serde_json::from_str(text).map_err(|e| ReflectError::Json(e.to_string()))
    }
}

/// Byte size of a reflected member type.
pub fn type_size(type_name: &str) -> Option<u32> {
    match type_name {
        "float" | "uint" | "int" => Some(4),
        "vec2" => Some(8),
        "vec3" => Some(12),
        "vec4" => Some(16),
        "mat4" => Some(64),
        _ => None,
    }
}

/// Final parameter list and samplers of one shader.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappedParams {
    pub params: Vec<SourceParam>,
    pub samplers: Vec<ShaderSampler>,
}

/// Map declared parameters onto the reflected layout.
///
/// Uniform buffers keep their binding as buffer index; push-constant blocks
/// get -1, -2, ... in order. Declared params keep their declaration position
/// as sort key, members nobody declared are synthesized with key 0, and
/// declared params missing from every block are dropped.
pub fn map_params(
    declared: &[SourceParam],
    reflection: &Reflection,
) -> Result<MappedParams, ReflectError> {
    let blocks = reflection
        .ubos
        .iter()
        .map(|ubo| (ubo.binding, ubo))
        .chain(
            reflection
                .push_constants
                .iter()
                .enumerate()
                .map(|(i, block)| (-(i as i32) - 1, block)),
        );

    let mut params = Vec::new();
    for (buffer, block) in blocks {
        let ty = reflection
            .types
            .get(&block.type_id)
            .ok_or_else(|| ReflectError::MissingType(block.type_id.clone()))?;

        for member in &ty.members {
            let size = type_size(&member.type_name).ok_or_else(|| ReflectError::UnknownType {
                member: member.name.clone(),
                type_name: member.type_name.clone(),
            })?;

            let param = match declared.iter().position(|p| p.name == member.name) {
                Some(order) => SourceParam {
                    buffer,
                    offset: member.offset,
                    size,
                    order,
                    ..declared[order].clone()
                },
                None => SourceParam::synthesized(&member.name, buffer, member.offset, size),
            };
            params.push(param);
        }
    }
    params.sort_by_key(|p| p.order);

    let samplers = reflection
        .textures
        .iter()
        .map(|t| ShaderSampler::new(t.name.clone(), t.binding))
        .collect();

    Ok(MappedParams { params, samplers })
}
