//! `.slangp` preset parsing.
//!
//! A preset is a flat list of `key = value` lines naming the passes
//! (`shaders`, `shader<i>`), per-pass settings (`filter_linear<i>`,
//! `scale_type<i>`, ...), LUT textures and parameter overrides. `#reference`
//! pulls another preset's keys into the same table.

mod keys;

pub use keys::{split_key_value, PresetKeys, PresetValue};

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use glass_shared::ParamOverride;

use crate::error::CompileError;
use crate::log::CompileLog;
use crate::paths;
use crate::source::Tokens;

/// Per-pass keys, stored on the pass without their index suffix.
pub const PASS_KEYS: [&str; 13] = [
    "filter_linear",
    "float_framebuffer",
    "srgb_framebuffer",
    "scale_type",
    "scale",
    "scale_type_x",
    "scale_x",
    "scale_type_y",
    "scale_y",
    "alias",
    "mipmap_input",
    "frame_count_mod",
    "wrap_mode",
];

/// Per-texture keys (`<name>_linear`, ...), stored without the name prefix.
pub const TEXTURE_KEYS: [&str; 3] = ["linear", "wrap_mode", "mipmap"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PresetPass {
    pub path: PathBuf,
    pub preset_params: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PresetTexture {
    pub name: String,
    pub path: PathBuf,
    pub preset_params: BTreeMap<String, String>,
}

/// Parsed `.slangp` file, before any pass is compiled.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourcePreset {
    pub path: PathBuf,
    pub passes: Vec<PresetPass>,
    pub textures: Vec<PresetTexture>,
    pub overrides: Vec<ParamOverride>,
}

/// Parse a preset file and everything it references.
pub fn parse_preset(path: &Path, log: &mut CompileLog) -> Result<SourcePreset, CompileError> {
    let mut keys = PresetKeys::new();
    read_keys(path, &mut keys, &mut Vec::new(), log)?;
    let preset = build_preset(path, keys, log)?;
    tracing::debug!(
        "parsed {}: {} passes, {} textures, {} overrides",
        path.display(),
        preset.passes.len(),
        preset.textures.len(),
        preset.overrides.len()
    );
    Ok(preset)
}

/// Read the `key = value` lines of one file into `keys`, following
/// `#reference` lines depth-first at the point they appear.
pub fn read_keys(
    path: &Path,
    keys: &mut PresetKeys,
    stack: &mut Vec<PathBuf>,
    log: &mut CompileLog,
) -> Result<(), CompileError> {
    let path = paths::normalize(path);
    if stack.contains(&path) {
        return Err(CompileError::IncludeCycle { path });
    }
    let bytes = fs::read(&path).map_err(|e| CompileError::io(&path, e))?;
    let text = String::from_utf8_lossy(&bytes);
    let origin = path.parent().map(Path::to_path_buf).unwrap_or_default();

    stack.push(path.clone());
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with("#reference") {
            let mut tokens = Tokens::new(line);
            tokens.word();
            match tokens.quoted() {
                Some(file) => {
                    read_keys(&paths::sibling(&path, &file), keys, stack, log)?;
                }
                None => log.warn(format!("{}: #reference without a path", path.display())),
            }
            continue;
        }
        if line.starts_with('#') {
            continue;
        }
        match split_key_value(line) {
            Some((key, value)) => keys.insert(key, value, &origin),
            None => log.warn(format!("{}: ignoring line `{}`", path.display(), line)),
        }
    }
    stack.pop();
    Ok(())
}

/// Turn a key table into passes, textures and overrides.
pub fn build_preset(
    path: &Path,
    mut keys: PresetKeys,
    log: &mut CompileLog,
) -> Result<SourcePreset, CompileError> {
    let mut preset = SourcePreset {
        path: path.to_path_buf(),
        ..Default::default()
    };

    let count = match keys.take("shaders") {
        Some(text) => match text.parse::<usize>() {
            Ok(count) => count,
            Err(_) => {
                log.warn(format!("invalid shader count `{}`", text));
                0
            }
        },
        None => 0,
    };

    for i in 0..count {
        let key = format!("shader{}", i);
        let shader_path = keys.take_path(&key).ok_or_else(|| {
            CompileError::io(
                path,
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("preset declares {} passes but `{}` is missing", count, key),
                ),
            )
        })?;
        let mut pass = PresetPass {
            path: shader_path,
            preset_params: BTreeMap::new(),
        };
        for name in PASS_KEYS {
            if let Some(value) = keys.take(&format!("{}{}", name, i)) {
                pass.preset_params.insert(name.to_string(), value);
            }
        }
        preset.passes.push(pass);
    }

    let names = keys.take("textures").unwrap_or_default();
    for name in names.split(';').map(str::trim).filter(|n| !n.is_empty()) {
        let Some(texture_path) = keys.take_path(name) else {
            log.warn(format!("texture `{}` has no path", name));
            continue;
        };
        let mut texture = PresetTexture {
            name: name.to_string(),
            path: texture_path,
            preset_params: BTreeMap::new(),
        };
        texture
            .preset_params
            .insert("name".to_string(), name.to_string());
        for suffix in TEXTURE_KEYS {
            if let Some(value) = keys.take(&format!("{}_{}", name, suffix)) {
                texture.preset_params.insert(suffix.to_string(), value);
            }
        }
        preset.textures.push(texture);
    }

    for (key, value) in keys.unconsumed() {
        if key.is_empty() || value.is_empty() {
            continue;
        }
        match value.parse::<f32>() {
            Ok(v) => preset.overrides.push(ParamOverride::new(key, v)),
            Err(_) => log.warn(format!("invalid float value for {}: {}", key, value)),
        }
    }

    Ok(preset)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn test_two_pass_preset() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "crt.slangp",
            "shaders = 2\n\
             shader0 = shaders/a.slang\n\
             filter_linear0 = true\n\
             scale_type0 = source\n\
             scale0 = 2.0\n\
             shader1 = \"shaders/b.slang\"\n\
             alias1 = \"FINAL\"\n",
        );
        let mut log = CompileLog::new();
        let preset = parse_preset(&path, &mut log).unwrap();

        assert_eq!(preset.passes.len(), 2);
        let first = &preset.passes[0];
        assert_eq!(first.path, dir.path().join("shaders/a.slang"));
        assert_eq!(first.preset_params.get("filter_linear").unwrap(), "true");
        assert_eq!(first.preset_params.get("scale_type").unwrap(), "source");
        assert_eq!(first.preset_params.get("scale").unwrap(), "2.0");
        assert_eq!(preset.passes[1].preset_params.get("alias").unwrap(), "FINAL");
        assert!(!preset.passes[1].preset_params.contains_key("filter_linear"));
        assert!(preset.overrides.is_empty());
        assert!(!log.has_warnings());
    }

    #[test]
    fn test_textures_and_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "lut.slangp",
            "shaders = 1\n\
             shader0 = lut.slang\n\
             textures = \"SamplerLUT;;Mask\"\n\
             SamplerLUT = luts/lut.png\n\
             SamplerLUT_linear = true\n\
             SamplerLUT_wrap_mode = clamp_to_edge\n\
             Mask = mask.png\n\
             Mask_mipmap = false\n\
             GAMMA = 2.4\n\
             BOGUS = yes\n\
             LUT_Size = 32\n",
        );
        let mut log = CompileLog::new();
        let preset = parse_preset(&path, &mut log).unwrap();

        assert_eq!(preset.textures.len(), 2);
        let lut = &preset.textures[0];
        assert_eq!(lut.name, "SamplerLUT");
        assert_eq!(lut.path, dir.path().join("luts/lut.png"));
        assert_eq!(lut.preset_params.get("name").unwrap(), "SamplerLUT");
        assert_eq!(lut.preset_params.get("linear").unwrap(), "true");
        assert_eq!(lut.preset_params.get("wrap_mode").unwrap(), "clamp_to_edge");
        assert_eq!(preset.textures[1].preset_params.get("mipmap").unwrap(), "false");

        // Sorted key order; BOGUS dropped with a warning.
        assert_eq!(
            preset.overrides,
            [
                ParamOverride::new("GAMMA", 2.4),
                ParamOverride::new("LUT_Size", 32.0)
            ]
        );
        assert!(log.has_warnings());
        assert!(log.contains("BOGUS"));
    }

    #[test]
    fn test_reference_last_write_wins() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "base/base.slangp",
            "shaders = 1\n\
             shader0 = ../shaders/base.slang\n\
             scale0 = 1.0\n\
             GAMMA = 2.2\n",
        );
        let path = write(
            dir.path(),
            "child.slangp",
            "#reference \"base/base.slangp\"\n\
             scale0 = 3.0\n",
        );
        let mut log = CompileLog::new();
        let preset = parse_preset(&path, &mut log).unwrap();

        assert_eq!(preset.passes.len(), 1);
        // Path resolved against the referenced file's directory.
        assert_eq!(preset.passes[0].path, dir.path().join("shaders/base.slang"));
        assert_eq!(preset.passes[0].preset_params.get("scale").unwrap(), "3.0");
        assert_eq!(preset.overrides, [ParamOverride::new("GAMMA", 2.2)]);
    }

    #[test]
    fn test_reference_after_key_overrides_it() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "base.slangp", "GAMMA = 2.2\n");
        let path = write(
            dir.path(),
            "child.slangp",
            "GAMMA = 1.8\n#reference \"base.slangp\"\n",
        );
        let mut log = CompileLog::new();
        let preset = parse_preset(&path, &mut log).unwrap();
        assert_eq!(preset.overrides, [ParamOverride::new("GAMMA", 2.2)]);
    }

    #[test]
    fn test_comments_and_bad_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "p.slangp",
            "# a comment\n\
             \n\
             no equals here\n\
             shaders = 0\n",
        );
        let mut log = CompileLog::new();
        let preset = parse_preset(&path, &mut log).unwrap();
        assert!(preset.passes.is_empty());
        assert!(log.contains("no equals here"));
    }

    #[test]
    fn test_missing_pass_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "p.slangp", "shaders = 2\nshader0 = a.slang\n");
        let mut log = CompileLog::new();
        let err = parse_preset(&path, &mut log).unwrap_err();
        assert!(err.to_string().contains("shader1"));
    }

    #[test]
    fn test_reference_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.slangp", "#reference \"b.slangp\"\n");
        write(dir.path(), "b.slangp", "#reference \"a.slangp\"\n");
        let mut log = CompileLog::new();
        let err = parse_preset(&a, &mut log).unwrap_err();
        assert!(matches!(err, CompileError::IncludeCycle { .. }));
    }
}
