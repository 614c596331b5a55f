//! Static texture artifacts referenced by presets (LUTs, masks, bezels).

use std::collections::BTreeMap;

use crate::blob::Blob;

/// Raw texture file contents plus preset metadata.
///
/// The bytes are the source image file as-is; decoding is left to the
/// renderer. Preset params carry `name`, `linear`, `wrap_mode` and `mipmap`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextureDef {
    pub name: String,
    pub data: Blob,
    pub preset_params: BTreeMap<String, String>,
}

impl TextureDef {
    pub fn new(name: impl Into<String>, data: impl Into<Blob>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
            preset_params: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Attach a preset key/value pair. An existing key is kept.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.preset_params.entry(key.into()).or_insert(value.into());
        self
    }

    pub fn preset_param(&self, key: &str) -> Option<&str> {
        self.preset_params.get(key).map(String::as_str)
    }

    pub fn is_dynamic(&self) -> bool {
        self.data.is_owned()
    }

    pub fn into_owned(mut self) -> Self {
        self.data = self.data.into_owned();
        self
    }
}
