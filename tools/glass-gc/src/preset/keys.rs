//! Key/value table read from `.slangp` files.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::paths;
use crate::source::trim_quoted;

/// A value and the directory of the file that set it.
#[derive(Debug, Clone, PartialEq)]
pub struct PresetValue {
    pub value: String,
    pub origin: PathBuf,
}

/// All keys of a preset and its `#reference`d files.
///
/// Later writes replace earlier ones. Reads are tracked so the keys nobody
/// asked for can be turned into overrides afterwards.
#[derive(Debug, Default)]
pub struct PresetKeys {
    values: BTreeMap<String, PresetValue>,
    seen: BTreeSet<String>,
}

impl PresetKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>, origin: &Path) {
        self.values.insert(
            key.into(),
            PresetValue {
                value: value.into(),
                origin: origin.to_path_buf(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Peek at a value without marking it as read.
    pub fn peek(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|v| v.value.as_str())
    }

    /// Read a value and mark the key as consumed. Empty values read as absent.
    pub fn take(&mut self, key: &str) -> Option<String> {
        self.seen.insert(key.to_string());
        self.values
            .get(key)
            .map(|v| v.value.clone())
            .filter(|v| !v.is_empty())
    }

    /// Read a value as a path relative to the file that set it.
    pub fn take_path(&mut self, key: &str) -> Option<PathBuf> {
        self.seen.insert(key.to_string());
        self.values
            .get(key)
            .filter(|v| !v.value.is_empty())
            .map(|v| paths::normalize(&v.origin.join(&v.value)))
    }

    /// Keys never read, in sorted order.
    pub fn unconsumed(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .filter(|(key, _)| !self.seen.contains(*key))
            .map(|(key, v)| (key.as_str(), v.value.as_str()))
    }
}

/// Split a `key = value` line.
///
/// Both sides are trimmed of whitespace and quotes; the value is cut at its
/// first remaining quote and at `//`. Returns `None` without an `=`.
pub fn split_key_value(line: &str) -> Option<(String, String)> {
    let (key, value) = line.split_once('=')?;
    let key = trim_quoted(key);
    let mut value = trim_quoted(value);
    if let Some(quote) = value.find('"') {
        value = &value[..quote];
    }
    if let Some(comment) = value.find("//") {
        value = &value[..comment];
    }
    Some((key.to_string(), trim_quoted(value).to_string()))
}
