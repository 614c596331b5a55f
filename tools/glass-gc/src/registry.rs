//! Registry of generated artifacts (`library.json`).
//!
//! Every artifact a batch writes is appended here so a renderer can list the
//! available presets without opening them. The registry is passed explicitly
//! to the batch driver and saved once when the batch ends.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// File name of the registry inside the output directory.
pub const REGISTRY_FILE: &str = "library.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Compiled from a single `.slang` file.
    Shader,
    /// Compiled from a `.slangp` preset.
    Preset,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub kind: EntryKind,
    pub category: String,
    pub name: String,
    /// Packed artifact, relative to the output directory.
    pub output: String,
    pub source: String,
}

/// Append-only list of generated artifacts, unique by output path.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRegistry {
    entries: Vec<RegistryEntry>,
}

impl OutputRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load an existing registry; a missing file is an empty registry.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read registry: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse registry: {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write registry: {}", path.display()))
    }

    /// Add an entry. Returns false if its output path is already registered.
    pub fn append(&mut self, entry: RegistryEntry) -> bool {
        if self.entries.iter().any(|e| e.output == entry.output) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
