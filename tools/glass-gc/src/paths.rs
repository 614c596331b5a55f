//! Path helpers shared by the source and preset parsers.

use std::path::{Component, Path, PathBuf};

/// Lexically normalize a path: drop `.` components and fold `dir/..` pairs.
///
/// Does not touch the filesystem, so it works for files that may not exist
/// yet. Leading `..` components of a relative path are kept.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    out.iter().collect()
}

/// Resolve `relative` against the directory containing `file`.
pub fn sibling(file: &Path, relative: &str) -> PathBuf {
    let dir = file.parent().unwrap_or_else(|| Path::new(""));
    normalize(&dir.join(relative))
}

/// Flatten a path into a single file name (`a/b/c.slangp` -> `a!b!c.slangp`).
pub fn flatten(path: &Path) -> String {
    path.to_string_lossy()
        .chars()
        .map(|c| if c == '/' || c == '\\' { '!' } else { c })
        .collect()
}

/// File name as a string, or `???` when it is not valid Unicode.
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| "???".to_string())
}

/// Whether `path` ends in `.ext`, ignoring ASCII case.
pub fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}
