//! File format constants for Glass artifacts.
//!
//! This module defines the `ArtifactFormat` struct which serves as the single
//! source of truth for artifact file extensions, magic bytes and versions.
//!
//! # Example
//!
//! ```
//! use glass_shared::PRESET_FORMAT;
//!
//! assert_eq!(PRESET_FORMAT.extension, "sgpreset");
//! assert_eq!(PRESET_FORMAT.magic, b"SGPR");
//! ```

/// Format specification for one artifact file type.
#[derive(Debug, Clone, Copy)]
pub struct ArtifactFormat {
    /// File extension without dot
    pub extension: &'static str,

    /// Magic bytes at start of file (4 bytes)
    pub magic: &'static [u8; 4],

    /// Format version for backward compatibility
    pub version: u32,
}

impl ArtifactFormat {
    pub const fn new(extension: &'static str, magic: &'static [u8; 4], version: u32) -> Self {
        Self {
            extension,
            magic,
            version,
        }
    }

    /// Check that `bytes` starts with this format's magic.
    pub fn matches(&self, bytes: &[u8]) -> bool {
        bytes.len() >= 4 && &bytes[0..4] == self.magic
    }
}

/// Compiled preset (`.sgpreset`): passes, textures and overrides.
pub const PRESET_FORMAT: ArtifactFormat = ArtifactFormat::new("sgpreset", b"SGPR", 1);

/// Persisted bytecode cache (`.sgcache`): hash to byte-code entries.
pub const CACHE_FORMAT: ArtifactFormat = ArtifactFormat::new("sgcache", b"SGCH", 1);
