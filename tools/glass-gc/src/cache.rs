//! Content-addressed byte-code cache.
//!
//! Keys are the SHA-256 of the HLSL text a stage was compiled from, so a hit
//! can only return byte-code for identical input. Entries are write-once: a
//! hash that is already present keeps its first blob.
//!
//! On disk (`.sgcache`):
//!
//! ```text
//! "SGCH" magic (4 bytes) | bitcode(PackedCache)
//! ```

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use bitcode::{Decode, Encode};
use hashbrown::HashMap;

use glass_shared::{Blob, ShaderHash, CACHE_FORMAT};

/// One entry of a cache table compiled into a binary.
#[derive(Debug, Clone, Copy)]
pub struct StaticEntry {
    pub hash: [u8; 32],
    pub byte_code: &'static [u8],
}

#[derive(Debug, Default)]
pub struct ShaderCache {
    entries: HashMap<ShaderHash, Blob>,
}

#[derive(Encode, Decode)]
struct PackedCache {
    version: u32,
    entries: Vec<PackedEntry>,
}

#[derive(Encode, Decode)]
struct PackedEntry {
    hash: ShaderHash,
    byte_code: Vec<u8>,
}

impl ShaderCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a cache from a static table. Entries borrow the table's bytes.
    pub fn from_static(table: &'static [StaticEntry]) -> Self {
        let mut cache = Self::new();
        for entry in table {
            cache
                .entries
                .entry(ShaderHash(entry.hash))
                .or_insert(Blob::Static(entry.byte_code));
        }
        cache
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find(&self, hash: &ShaderHash) -> Option<&Blob> {
        self.entries.get(hash)
    }

    /// Insert compiled byte-code. Returns false, leaving the existing entry in
    /// place, if the hash is already cached.
    pub fn insert(&mut self, hash: ShaderHash, byte_code: Vec<u8>) -> bool {
        if self.entries.contains_key(&hash) {
            return false;
        }
        self.entries.insert(hash, Blob::from(byte_code));
        true
    }

    /// Load a cache file. A missing file is an empty cache.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("no cache at {}, starting empty", path.display());
            return Ok(Self::new());
        }
        let bytes = fs::read(path)
            .with_context(|| format!("Failed to read cache: {}", path.display()))?;
        let cache = Self::from_bytes(&bytes)
            .with_context(|| format!("Invalid cache file: {}", path.display()))?;
        tracing::info!("loaded {} cached shaders from {}", cache.len(), path.display());
        Ok(cache)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create cache directory: {}", parent.display())
                })?;
            }
        }
        fs::write(path, self.to_bytes())
            .with_context(|| format!("Failed to write cache: {}", path.display()))?;
        tracing::info!("saved {} cached shaders to {}", self.len(), path.display());
        Ok(())
    }

    /// Serialize with magic header. Entries are sorted by hash.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut entries: Vec<PackedEntry> = self
            .entries
            .iter()
            .map(|(hash, blob)| PackedEntry {
                hash: *hash,
                byte_code: blob.to_vec(),
            })
            .collect();
        entries.sort_by_key(|e| e.hash);

        let packed = PackedCache {
            version: CACHE_FORMAT.version,
            entries,
        };
        let mut out = Vec::from(&CACHE_FORMAT.magic[..]);
        out.extend(bitcode::encode(&packed));
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if !CACHE_FORMAT.matches(bytes) {
            anyhow::bail!("Invalid cache: bad magic bytes");
        }
        let packed: PackedCache = bitcode::decode(&bytes[4..])
            .map_err(|e| anyhow::anyhow!("Failed to decode cache: {}", e))?;
        if packed.version != CACHE_FORMAT.version {
            anyhow::bail!(
                "Unsupported cache version: {} (expected {})",
                packed.version,
                CACHE_FORMAT.version
            );
        }

        let mut cache = Self::new();
        for entry in packed.entries {
            cache.insert(entry.hash, entry.byte_code);
        }
        Ok(cache)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static BUILTIN: [StaticEntry; 1] = [StaticEntry {
        hash: [7u8; 32],
        byte_code: b"DXBC-stock",
    }];

    #[test]
    fn test_insert_is_write_once() {
        let mut cache = ShaderCache::new();
        let hash = ShaderHash::of("float4 main() : SV_Target { return 0; }");
        assert!(cache.insert(hash, vec![1, 2, 3]));
        assert!(!cache.insert(hash, vec![9, 9]));
        assert_eq!(cache.find(&hash).unwrap().as_bytes(), &[1, 2, 3]);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_static_entries_are_borrowed() {
        let cache = ShaderCache::from_static(&BUILTIN);
        let blob = cache.find(&ShaderHash([7u8; 32])).unwrap();
        assert!(!blob.is_owned());
        assert_eq!(blob.as_bytes(), b"DXBC-stock");
        assert!(cache.find(&ShaderHash([8u8; 32])).is_none());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/shaders.sgcache");

        let mut cache = ShaderCache::from_static(&BUILTIN);
        let hash = ShaderHash::of("main");
        cache.insert(hash, b"compiled".to_vec());
        cache.save(&path).unwrap();

        let loaded = ShaderCache::load(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.find(&hash).unwrap().as_bytes(), b"compiled");
        assert!(loaded.find(&hash).unwrap().is_owned());
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ShaderCache::load(&dir.path().join("none.sgcache")).unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_bad_magic() {
        let result = ShaderCache::from_bytes(b"SGPR\x00\x00");
        assert!(result.unwrap_err().to_string().contains("bad magic"));
    }
}
