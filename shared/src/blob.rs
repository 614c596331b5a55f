//! Byte buffers with explicit ownership.
//!
//! Artifacts either point into tables compiled into the binary (built-in
//! shaders and textures) or own bytes produced at import time. The variant
//! is the ownership record: owned bytes are freed when the artifact drops,
//! static bytes never are.

use std::fmt;
use std::ops::Deref;

/// Byte-code or texture data attached to an artifact.
///
/// Equality compares contents, not ownership.
#[derive(Clone)]
pub enum Blob {
    /// Borrowed from immutable static storage.
    Static(&'static [u8]),
    /// Allocated at compile/import time and owned by the artifact.
    Owned(Box<[u8]>),
}

impl Blob {
    /// Empty static blob.
    pub const EMPTY: Blob = Blob::Static(&[]);

    /// Whether the bytes belong to this blob (the former "dynamic" flag).
    pub fn is_owned(&self) -> bool {
        matches!(self, Blob::Owned(_))
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Blob::Static(bytes) => bytes,
            Blob::Owned(bytes) => bytes,
        }
    }

    /// Convert into an owned blob, copying static bytes.
    pub fn into_owned(self) -> Blob {
        match self {
            Blob::Static(bytes) => Blob::Owned(bytes.into()),
            owned @ Blob::Owned(_) => owned,
        }
    }
}

impl Default for Blob {
    fn default() -> Self {
        Blob::EMPTY
    }
}

impl Deref for Blob {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl From<Vec<u8>> for Blob {
    fn from(bytes: Vec<u8>) -> Self {
        Blob::Owned(bytes.into_boxed_slice())
    }
}

impl From<&'static [u8]> for Blob {
    fn from(bytes: &'static [u8]) -> Self {
        Blob::Static(bytes)
    }
}

impl PartialEq for Blob {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for Blob {}

impl fmt::Debug for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_owned() { "Owned" } else { "Static" };
        write!(f, "Blob::{}({} bytes)", kind, self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static TABLE: [u8; 4] = [1, 2, 3, 4];

    #[test]
    fn test_static_blob_is_not_owned() {
        let blob = Blob::from(&TABLE[..]);
        assert!(!blob.is_owned());
        assert_eq!(blob.len(), 4);
        assert_eq!(&blob[..], &TABLE);
    }

    #[test]
    fn test_vec_blob_is_owned() {
        let blob = Blob::from(vec![9u8, 8, 7]);
        assert!(blob.is_owned());
        assert_eq!(blob.as_bytes(), &[9, 8, 7]);
    }

    #[test]
    fn test_into_owned_copies_static_bytes() {
        let blob = Blob::Static(&TABLE).into_owned();
        assert!(blob.is_owned());
        assert_eq!(blob.as_bytes(), &TABLE);
    }

    #[test]
    fn test_default_is_empty_static() {
        let blob = Blob::default();
        assert!(blob.is_empty());
        assert!(!blob.is_owned());
    }
}
