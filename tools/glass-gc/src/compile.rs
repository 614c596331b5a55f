//! Artifact builder: runs the stage chain and assembles `ShaderDef`,
//! `TextureDef` and `PresetDef` records.

use std::fs;
use std::path::{Path, PathBuf};

use hashbrown::HashSet;

use glass_shared::{Blob, PresetDef, ShaderDef, ShaderHash, TextureDef};

use crate::cache::ShaderCache;
use crate::error::{CompileError, ReflectError, StageError, StageKind};
use crate::log::CompileLog;
use crate::paths;
use crate::preset::parse_preset;
use crate::reflect::{map_params, Reflection};
use crate::source::{parse_shader, SourceShader};
use crate::stages::{ShaderStage, Toolchain};

/// Category given to everything compiled from files.
pub const IMPORTED_CATEGORY: &str = "Imported";

struct StageOutput {
    byte_code: Vec<u8>,
    hash: ShaderHash,
    reflection: Option<String>,
}

/// Compiles source files against a toolchain and a read-only cache.
///
/// Byte-code compiled during a run is kept aside and handed out by
/// [`Compiler::take_fresh_entries`]; the caller decides whether it goes into
/// the cache.
pub struct Compiler<'a> {
    toolchain: &'a Toolchain,
    cache: &'a ShaderCache,
    fresh: Vec<(ShaderHash, Vec<u8>)>,
    comments: Vec<String>,
    /// Sources whose comments are already in `comments`.
    commented: HashSet<PathBuf>,
}

impl<'a> Compiler<'a> {
    pub fn new(toolchain: &'a Toolchain, cache: &'a ShaderCache) -> Self {
        Self {
            toolchain,
            cache,
            fresh: Vec::new(),
            comments: Vec::new(),
            commented: HashSet::new(),
        }
    }

    /// Compile a `.slang` or `.slangp` file into a preset.
    pub fn compile_file(
        &mut self,
        path: &Path,
        log: &mut CompileLog,
    ) -> Result<PresetDef, CompileError> {
        if paths::has_extension(path, "slang") {
            self.compile_shader(path, log)
        } else {
            self.compile_preset(path, log)
        }
    }

    /// Compile a single `.slang` file into a one-pass preset.
    pub fn compile_shader(
        &mut self,
        path: &Path,
        log: &mut CompileLog,
    ) -> Result<PresetDef, CompileError> {
        let source = parse_shader(path, log)?;
        let def = self.compile_source_shader(&source, log)?;

        let mut preset = PresetDef::new(paths::file_name(path), IMPORTED_CATEGORY);
        preset.import_path = Some(path.to_path_buf());
        preset.shader_defs.push(def);
        Ok(preset)
    }

    /// Compile a `.slangp` preset: every pass, every texture, the overrides.
    pub fn compile_preset(
        &mut self,
        path: &Path,
        log: &mut CompileLog,
    ) -> Result<PresetDef, CompileError> {
        let source_preset = parse_preset(path, log)?;

        let mut preset = PresetDef::new(paths::file_name(path), IMPORTED_CATEGORY);
        preset.import_path = Some(path.to_path_buf());

        for pass in &source_preset.passes {
            let source = parse_shader(&pass.path, log)?;
            let mut def = self.compile_source_shader(&source, log)?;
            for (key, value) in &pass.preset_params {
                def = def.param(key.as_str(), value.as_str());
            }
            preset.shader_defs.push(def);
        }

        for texture in &source_preset.textures {
            let mut def = compile_texture(&texture.path, log)?;
            for (key, value) in &texture.preset_params {
                def = def.param(key.as_str(), value.as_str());
            }
            preset.texture_defs.push(def);
        }

        for o in &source_preset.overrides {
            preset.override_param(o.name.as_str(), o.value);
        }

        tracing::info!(
            "compiled {}: {} passes, {} textures",
            path.display(),
            preset.shader_defs.len(),
            preset.texture_defs.len()
        );
        Ok(preset)
    }

    /// Compile both stages of a parsed shader and map its parameters.
    pub fn compile_source_shader(
        &mut self,
        source: &SourceShader,
        log: &mut CompileLog,
    ) -> Result<ShaderDef, CompileError> {
        let vertex = self.compile_stage(source, ShaderStage::Vertex, log)?;
        let fragment = self.compile_stage(source, ShaderStage::Fragment, log)?;

        let mapped = fragment
            .reflection
            .as_deref()
            .ok_or(ReflectError::Missing)
            .and_then(Reflection::from_json)
            .and_then(|r| map_params(&source.params, &r))
            .map_err(|e| CompileError::Reflect {
                path: source.path.clone(),
                source: e,
            })?;

        let mut def = ShaderDef::new(paths::file_name(&source.path));
        def.format = source.format.clone();
        for p in mapped.params {
            def.add_param(
                p.name,
                p.buffer,
                p.offset,
                p.size,
                p.min_value,
                p.max_value,
                p.default_value,
                p.step_value,
                p.description,
            );
        }
        for s in mapped.samplers {
            def.add_sampler(s.name, s.binding);
        }
        for (key, value) in &source.preset_params {
            def = def.param(key.as_str(), value.as_str());
        }
        def.vertex_byte_code = Blob::from(vertex.byte_code);
        def.vertex_hash = vertex.hash;
        def.fragment_byte_code = Blob::from(fragment.byte_code);
        def.fragment_hash = fragment.hash;

        if self.commented.insert(paths::normalize(&source.path)) {
            self.comments.extend(source.comments.iter().cloned());
        }
        Ok(def)
    }

    fn compile_stage(
        &mut self,
        source: &SourceShader,
        stage: ShaderStage,
        log: &mut CompileLog,
    ) -> Result<StageOutput, CompileError> {
        let path = &source.path;
        log.note(format!("compiling {} stage of {}", stage, path.display()));

        let spirv = self
            .toolchain
            .glsl()
            .compile_glsl(source.stage_source(stage), stage, log)
            .map_err(stage_error(StageKind::Glsl, stage, path))?;
        if spirv.is_empty() {
            return Err(stage_error(StageKind::Glsl, stage, path)(StageError::new(
                "no SPIR-V was produced",
            )));
        }

        let cross = self
            .toolchain
            .cross()
            .translate(&spirv, stage, stage.is_fragment(), log)
            .map_err(stage_error(StageKind::Cross, stage, path))?;

        let target = self.toolchain.byte_code().target(stage);
        let hash = ShaderHash::for_target(&target, &cross.hlsl);
        let byte_code = match self.find_cached(&hash) {
            Some(bytes) => {
                tracing::debug!("cache hit for {} stage of {}", stage, path.display());
                bytes
            }
            None => {
                tracing::debug!("cache miss for {} stage of {}", stage, path.display());
                let bytes = self
                    .toolchain
                    .byte_code()
                    .compile_hlsl(&cross.hlsl, stage, log)
                    .map_err(stage_error(StageKind::ByteCode, stage, path))?;
                if !bytes.is_empty() {
                    self.fresh.push((hash, bytes.clone()));
                }
                bytes
            }
        };

        if byte_code.is_empty() {
            return Err(CompileError::EmptyByteCode {
                shader_stage: stage,
                path: path.clone(),
            });
        }

        Ok(StageOutput {
            byte_code,
            hash,
            reflection: cross.reflection,
        })
    }

    /// Look in the cache, then in what this compiler produced so far.
    fn find_cached(&self, hash: &ShaderHash) -> Option<Vec<u8>> {
        if let Some(blob) = self.cache.find(hash) {
            return Some(blob.to_vec());
        }
        self.fresh
            .iter()
            .find(|(h, _)| h == hash)
            .map(|(_, bytes)| bytes.clone())
    }

    /// Byte-code compiled since the last call, keyed by HLSL hash.
    pub fn take_fresh_entries(&mut self) -> Vec<(ShaderHash, Vec<u8>)> {
        std::mem::take(&mut self.fresh)
    }

    /// Comment lines of every shader compiled since the last call, once per
    /// source file.
    pub fn take_comments(&mut self) -> Vec<String> {
        self.commented.clear();
        std::mem::take(&mut self.comments)
    }
}

fn stage_error(
    kind: StageKind,
    stage: ShaderStage,
    path: &Path,
) -> impl FnOnce(StageError) -> CompileError {
    let path = path.to_path_buf();
    move |e| CompileError::Stage {
        stage: kind,
        shader_stage: stage,
        path,
        diagnostics: e.diagnostics,
    }
}

/// Read a texture file into an owned buffer.
pub fn compile_texture(path: &Path, log: &mut CompileLog) -> Result<TextureDef, CompileError> {
    let data = fs::read(path).map_err(|e| CompileError::io(path, e))?;
    log.note(format!("loaded texture {} ({} bytes)", path.display(), data.len()));
    Ok(TextureDef::new(paths::file_name(path), data))
}

/// Attribution lines stored at the top of a packed preset.
pub fn attribution_header(preset: &PresetDef, source: &Path, comments: &[String]) -> Vec<String> {
    let mut header = vec![
        format!(
            "Glass preset {} / {} imported from {}",
            preset.category,
            preset.name,
            source.display()
        ),
        "Generated file. Full credits and license terms are in the source; excerpts follow."
            .to_string(),
        String::new(),
    ];
    header.extend(comments.iter().cloned());
    header
}
