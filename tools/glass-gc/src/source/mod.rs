//! `.slang` source parsing.
//!
//! A `.slang` file holds both stages of a pass. `#pragma stage` lines split it
//! into vertex and fragment text; lines before the first stage pragma belong
//! to both. `#include` lines are expanded before anything else is looked at.

mod param;

pub use param::{trim_quoted, SourceParam, Tokens};

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::CompileError;
use crate::log::CompileLog;
use crate::paths;
use crate::stages::ShaderStage;

/// Engine-supplied uniforms appended to every shader's parameter list, with
/// the number stored in their buffer field until reflection replaces it.
pub const BUILTIN_PARAMS: [(&str, i32); 5] = [
    ("MVP", 16),
    ("SourceSize", 4),
    ("OriginalSize", 4),
    ("OutputSize", 4),
    ("FrameCount", 1),
];

/// Parsed contents of one `.slang` file.
#[derive(Debug, Clone, Default)]
pub struct SourceShader {
    pub path: PathBuf,
    pub vertex_source: String,
    pub fragment_source: String,
    /// Declared parameters in first-declaration order, then the built-ins.
    pub params: Vec<SourceParam>,
    /// Comment text, used as attribution in generated artifacts.
    pub comments: Vec<String>,
    /// Value of `#pragma format`, empty when absent.
    pub format: String,
    /// Preset params set from source, currently only `alias`.
    pub preset_params: BTreeMap<String, String>,
}

impl SourceShader {
    pub fn find_param(&self, name: &str) -> Option<&SourceParam> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Source text for one stage.
    pub fn stage_source(&self, stage: ShaderStage) -> &str {
        match stage {
            ShaderStage::Vertex => &self.vertex_source,
            ShaderStage::Fragment => &self.fragment_source,
        }
    }
}

/// Read a source file as lines, expanding `#include "file"` recursively.
///
/// Include paths are relative to the including file. With `follow_includes`
/// off the include lines are returned as-is.
pub fn load_source(path: &Path, follow_includes: bool) -> Result<Vec<String>, CompileError> {
    let mut lines = Vec::new();
    let mut stack = Vec::new();
    load_into(path, follow_includes, &mut stack, &mut lines)?;
    Ok(lines)
}

fn load_into(
    path: &Path,
    follow_includes: bool,
    stack: &mut Vec<PathBuf>,
    lines: &mut Vec<String>,
) -> Result<(), CompileError> {
    let path = paths::normalize(path);
    if stack.contains(&path) {
        return Err(CompileError::IncludeCycle { path });
    }

    let bytes = fs::read(&path).map_err(|e| CompileError::io(&path, e))?;
    let text = String::from_utf8_lossy(&bytes);

    stack.push(path.clone());
    for line in text.lines() {
        if follow_includes && line.starts_with("#include") {
            let mut tokens = Tokens::new(line);
            tokens.word();
            if let Some(file) = tokens.quoted() {
                let included = paths::sibling(&path, &file);
                load_into(&included, follow_includes, stack, lines)?;
                continue;
            }
        }
        lines.push(line.to_string());
    }
    stack.pop();
    Ok(())
}

/// Parse a `.slang` file into stage sources, parameters and metadata.
pub fn parse_shader(path: &Path, log: &mut CompileLog) -> Result<SourceShader, CompileError> {
    let lines = load_source(path, true)?;
    let mut shader = parse_lines(&lines, log);
    shader.path = path.to_path_buf();
    tracing::debug!(
        "parsed {}: {} params, {} comment lines",
        path.display(),
        shader.params.len(),
        shader.comments.len()
    );
    Ok(shader)
}

/// Split already-loaded lines; see [`parse_shader`].
pub fn parse_lines(lines: &[String], log: &mut CompileLog) -> SourceShader {
    let mut shader = SourceShader::default();
    let mut in_vertex = true;
    let mut in_fragment = true;
    let mut in_comment = false;

    for line in lines {
        let trimmed = trim_quoted(line);

        if line.starts_with("#pragma parameter") {
            let (param, problems) = SourceParam::parse(line);
            for problem in problems {
                log.warn(format!("#pragma parameter: {}", problem));
            }
            if shader.find_param(&param.name).is_none() {
                shader.params.push(param);
            }
            continue;
        }
        if line.starts_with("#pragma stage vertex") {
            in_vertex = true;
            in_fragment = false;
            in_comment = false;
            continue;
        }
        if line.starts_with("#pragma stage fragment") {
            in_vertex = false;
            in_fragment = true;
            in_comment = false;
            continue;
        }
        if let Some(format) = trimmed.strip_prefix("#pragma format") {
            shader.format = trim_quoted(format).to_string();
            continue;
        }
        if let Some(name) = trimmed.strip_prefix("#pragma name") {
            shader
                .preset_params
                .insert("alias".to_string(), trim_quoted(name).to_string());
            continue;
        }

        collect_comment(trimmed, &mut in_comment, &mut shader.comments);

        if in_vertex {
            shader.vertex_source.push_str(line);
            shader.vertex_source.push('\n');
        }
        if in_fragment {
            shader.fragment_source.push_str(line);
            shader.fragment_source.push('\n');
        }
    }

    for (name, buffer) in BUILTIN_PARAMS {
        shader.params.push(SourceParam::builtin(name, buffer));
    }
    shader
}

/// Track `//` and `/* */` comments; the text between delimiters is kept.
fn collect_comment(line: &str, in_comment: &mut bool, comments: &mut Vec<String>) {
    if let Some(rest) = line.strip_prefix("//") {
        if rest.ends_with("*/") {
            *in_comment = false;
        } else {
            comments.push(rest.trim().to_string());
        }
    } else if let Some(rest) = line.strip_prefix("/*") {
        match rest.find("*/") {
            Some(end) => comments.push(rest[..end].trim().to_string()),
            None => {
                comments.push(rest.trim().to_string());
                *in_comment = true;
            }
        }
    } else if *in_comment {
        if line.starts_with("*/") {
            *in_comment = false;
        } else if let Some(body) = line.strip_suffix("*/") {
            comments.push(body.trim().to_string());
            *in_comment = false;
        } else {
            comments.push(line.to_string());
        }
    }
}
