//! Content hashes for compiled shader stages.

use std::fmt;

use bitcode::{Decode, Encode};
use sha2::{Digest, Sha256};

/// SHA-256 of a stage's high-level shading text.
///
/// Used as the bytecode cache key: two stages with byte-identical text and
/// the same target profile share one compiled blob.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Encode, Decode)]
pub struct ShaderHash(pub [u8; 32]);

impl ShaderHash {
    pub const LEN: usize = 32;

    /// Hash shading text.
    pub fn of(text: &str) -> Self {
        Self::of_bytes(text.as_bytes())
    }

    /// Hash shading text compiled for a target profile such as `ps_5_0`.
    pub fn for_target(target: &str, text: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(target.as_bytes());
        hasher.update([0u8]);
        hasher.update(text.as_bytes());
        let mut out = [0u8; Self::LEN];
        out.copy_from_slice(&hasher.finalize());
        Self(out)
    }

    pub fn of_bytes(bytes: &[u8]) -> Self {
        let digest = Sha256::digest(bytes);
        let mut out = [0u8; Self::LEN];
        out.copy_from_slice(&digest);
        Self(out)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a 64-character hex string.
    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s).ok()?;
        let array: [u8; 32] = bytes.try_into().ok()?;
        Some(Self(array))
    }
}

impl fmt::Display for ShaderHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ShaderHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShaderHash({})", &self.to_hex()[..16])
    }
}
