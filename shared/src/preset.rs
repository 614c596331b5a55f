//! Complete presets: ordered shader passes, textures and overrides.

use std::path::PathBuf;

use crate::shader::{ParamOverride, ShaderDef};
use crate::texture::TextureDef;

/// Optional construction step a preset variant may supply.
///
/// Built-in preset tables use it to fill in their passes lazily; imported
/// presets arrive fully built and leave it unset.
pub type BuildStep = fn(&mut PresetDef);

/// A compiled preset ready for a renderer.
#[derive(Debug, Clone, Default)]
pub struct PresetDef {
    pub name: String,
    pub category: String,
    /// Source file this preset was imported from, if any.
    pub import_path: Option<PathBuf>,
    /// Render passes in execution order.
    pub shader_defs: Vec<ShaderDef>,
    pub texture_defs: Vec<TextureDef>,
    /// Applied in order after every pass has its defaults.
    pub overrides: Vec<ParamOverride>,
    pub build_step: Option<BuildStep>,
}

impl PresetDef {
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            ..Default::default()
        }
    }

    pub fn with_build_step(mut self, step: BuildStep) -> Self {
        self.build_step = Some(step);
        self
    }

    /// Run the construction step, if this preset has one.
    pub fn build(&mut self) {
        if let Some(step) = self.build_step {
            step(self);
        }
    }

    pub fn override_param(&mut self, name: impl Into<String>, value: f32) {
        self.overrides.push(ParamOverride::new(name, value));
    }

    pub fn find_shader(&self, name: &str) -> Option<&ShaderDef> {
        self.shader_defs.iter().find(|s| s.name == name)
    }

    /// True when every shader and texture owns its bytes.
    pub fn is_dynamic(&self) -> bool {
        self.shader_defs.iter().all(ShaderDef::is_dynamic)
            && self.texture_defs.iter().all(TextureDef::is_dynamic)
    }

    /// Copy any static bytes so the preset can outlive the tables it came from.
    pub fn into_owned(mut self) -> Self {
        self.shader_defs = self
            .shader_defs
            .into_iter()
            .map(ShaderDef::into_owned)
            .collect();
        self.texture_defs = self
            .texture_defs
            .into_iter()
            .map(TextureDef::into_owned)
            .collect();
        self
    }
}

impl PartialEq for PresetDef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.category == other.category
            && self.import_path == other.import_path
            && self.shader_defs == other.shader_defs
            && self.texture_defs == other.texture_defs
            && self.overrides == other.overrides
    }
}
