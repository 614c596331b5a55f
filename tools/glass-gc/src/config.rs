//! glass.toml configuration
//!
//! Every section is optional; a missing file means defaults throughout.
//!
//! ```toml
//! [tools]
//! glslang = "glslangValidator"
//! spirv_cross = "spirv-cross"
//! fxc = "fxc"
//! shader_model = "5_0"
//!
//! [paths]
//! output = "out"
//! temp = ".glass"
//! cache = "shaders.sgcache"
//!
//! [build]
//! force = false
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use glass_shared::CACHE_FORMAT;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "glass.toml";

#[derive(Debug, Default, Deserialize)]
pub struct GcConfig {
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub paths: PathsSection,
    #[serde(default)]
    pub build: BuildSection,
}

/// External tool names or paths, resolved through `PATH`.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "default_glslang")]
    pub glslang: String,
    #[serde(default = "default_spirv_cross")]
    pub spirv_cross: String,
    #[serde(default = "default_fxc")]
    pub fxc: String,
    /// HLSL shader model, e.g. `5_0` for vs_5_0/ps_5_0.
    #[serde(default = "default_shader_model")]
    pub shader_model: String,
}

fn default_glslang() -> String {
    "glslangValidator".to_string()
}

fn default_spirv_cross() -> String {
    "spirv-cross".to_string()
}

fn default_fxc() -> String {
    "fxc".to_string()
}

fn default_shader_model() -> String {
    "5_0".to_string()
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            glslang: default_glslang(),
            spirv_cross: default_spirv_cross(),
            fxc: default_fxc(),
            shader_model: default_shader_model(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PathsSection {
    /// Root for generated `.sgpreset` files and `library.json`.
    #[serde(default = "default_output")]
    pub output: PathBuf,
    /// Per-file logs and run reports.
    #[serde(default = "default_temp")]
    pub temp: PathBuf,
    /// Persisted byte-code cache. Defaults to the user cache directory.
    pub cache: Option<PathBuf>,
}

fn default_output() -> PathBuf {
    PathBuf::from("out")
}

fn default_temp() -> PathBuf {
    PathBuf::from(".glass")
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            output: default_output(),
            temp: default_temp(),
            cache: None,
        }
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct BuildSection {
    /// Recompile outputs that already exist and ignore `.exclude` markers.
    #[serde(default)]
    pub force: bool,
}

impl GcConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        Self::parse(&content)
    }

    /// Load `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!("no {} found, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse glass.toml")
    }

    /// Where the byte-code cache lives.
    pub fn cache_path(&self) -> PathBuf {
        if let Some(path) = &self.paths.cache {
            return path.clone();
        }
        let file = format!("shaders.{}", CACHE_FORMAT.extension);
        match directories::ProjectDirs::from("io", "glass", "glass-gc") {
            Some(dirs) => dirs.cache_dir().join(file),
            None => self.paths.temp.join(file),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = GcConfig::parse("").unwrap();
        assert_eq!(config.tools.glslang, "glslangValidator");
        assert_eq!(config.tools.shader_model, "5_0");
        assert_eq!(config.paths.output, PathBuf::from("out"));
        assert!(!config.build.force);
    }

    #[test]
    fn test_partial_sections() {
        let config = GcConfig::parse(
            r#"
[tools]
fxc = "C:/sdk/bin/fxc.exe"

[paths]
cache = "cache/shaders.sgcache"

[build]
force = true
"#,
        )
        .unwrap();
        assert_eq!(config.tools.fxc, "C:/sdk/bin/fxc.exe");
        assert_eq!(config.tools.spirv_cross, "spirv-cross");
        assert_eq!(config.paths.temp, PathBuf::from(".glass"));
        assert_eq!(config.cache_path(), PathBuf::from("cache/shaders.sgcache"));
        assert!(config.build.force);
    }

    #[test]
    fn test_default_cache_path_has_cache_extension() {
        let config = GcConfig::default();
        assert!(config.cache_path().ends_with("shaders.sgcache"));
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = GcConfig::load_or_default(&dir.path().join("glass.toml")).unwrap();
        assert_eq!(config.tools.fxc, "fxc");
    }

    #[test]
    fn test_invalid_toml() {
        assert!(GcConfig::parse("[tools\nfxc = 1").is_err());
    }
}
