//! Integration tests for the compile pipeline.
//!
//! Real source files on disk, fake stage implementations:
//! 1. Write `.slang`/`.slangp` files into a temp dir
//! 2. Compile through `Compiler`
//! 3. Check the assembled `PresetDef`

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;

use tempfile::tempdir;

use glass_gc::test_utils::{
    fake_toolchain, fake_toolchain_for, shader_source, EMPTY_BYTE_CODE, FAIL_GLSL,
};
use glass_gc::{CompileError, CompileLog, Compiler, ErrorKind, ShaderCache, IMPORTED_CATEGORY};
use glass_shared::{ParamOverride, ShaderSampler};

/// UBO at binding 0 with MVP and GAMMA, one push-constant block, one texture.
const CRT_REFLECTION: &str = concat!(
    r#"{"types":{"_10":{"name":"UBO","members":["#,
    r#"{"name":"MVP","type":"mat4","offset":0},"#,
    r#"{"name":"GAMMA","type":"float","offset":64}]},"#,
    r#""_20":{"name":"Push","members":["#,
    r#"{"name":"SourceSize","type":"vec4","offset":0},"#,
    r#"{"name":"FrameCount","type":"uint","offset":16}]}},"#,
    r#""ubos":[{"type":"_10","binding":0}],"#,
    r#""push_constants":[{"type":"_20"}],"#,
    r#""textures":[{"name":"Source","binding":2}]}"#
);

const SIMPLE_REFLECTION: &str = concat!(
    r#"{"types":{"_1":{"name":"UBO","members":[{"name":"MVP","type":"mat4","offset":0}]}},"#,
    r#""ubos":[{"type":"_1","binding":0}],"textures":[{"name":"Source","binding":1}]}"#
);

fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create dir");
    }
    fs::write(&path, text).expect("Failed to write file");
    path
}

fn crt_shader() -> String {
    shader_source(
        &[
            "// CRT test shader",
            r#"#pragma parameter GAMMA "Output Gamma" 2.2 1.0 3.0 0.05"#,
            r#"#pragma parameter UNUSED "Never Read" 1.0 0.0 2.0"#,
        ],
        CRT_REFLECTION,
    )
}

#[test]
fn test_single_shader_becomes_imported_preset() {
    let dir = tempdir().unwrap();
    let path = write(dir.path(), "crt.slang", &crt_shader());
    let (toolchain, calls) = fake_toolchain();
    let cache = ShaderCache::new();
    let mut compiler = Compiler::new(&toolchain, &cache);
    let mut log = CompileLog::new();

    let preset = compiler.compile_file(&path, &mut log).unwrap();

    assert_eq!(preset.name, "crt.slang");
    assert_eq!(preset.category, IMPORTED_CATEGORY);
    assert_eq!(preset.import_path.as_deref(), Some(path.as_path()));
    assert_eq!(preset.shader_defs.len(), 1);
    assert!(preset.is_dynamic());
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let def = &preset.shader_defs[0];
    assert_eq!(def.name, "crt.slang");
    assert!(!def.vertex_byte_code.is_empty());
    assert!(!def.fragment_byte_code.is_empty());
    assert_ne!(def.vertex_hash, def.fragment_hash);

    // Declaration order, not layout order; UNUSED dropped; built-ins kept
    // only where reflected.
    let params: Vec<_> = def
        .params
        .iter()
        .map(|p| (p.name.as_str(), p.buffer, p.offset, p.size))
        .collect();
    assert_eq!(
        params,
        [
            ("GAMMA", 0, 64, 4),
            ("MVP", 0, 0, 64),
            ("SourceSize", -1, 0, 16),
            ("FrameCount", -1, 16, 4),
        ]
    );
    let gamma = def.find_param("GAMMA").unwrap();
    assert_eq!(gamma.description, "Output Gamma");
    assert_eq!(gamma.default_value, 2.2);
    assert_eq!(gamma.current_value, 2.2);
    assert_eq!(gamma.step_value, 0.05);
    assert_eq!(def.samplers, [ShaderSampler::new("Source", 2)]);
    assert_eq!(def.params_size(0), 68);

    assert!(compiler.take_comments().contains(&"CRT test shader".to_string()));
}

#[test]
fn test_cached_byte_code_skips_compilation() {
    let dir = tempdir().unwrap();
    let path = write(dir.path(), "crt.slang", &crt_shader());
    let (toolchain, calls) = fake_toolchain();

    let mut cache = ShaderCache::new();
    let first = {
        let mut compiler = Compiler::new(&toolchain, &cache);
        let preset = compiler.compile_file(&path, &mut CompileLog::new()).unwrap();
        let fresh = compiler.take_fresh_entries();
        assert_eq!(fresh.len(), 2);
        for (hash, code) in fresh {
            assert!(cache.insert(hash, code));
        }
        preset
    };
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let mut compiler = Compiler::new(&toolchain, &cache);
    let second = compiler.compile_file(&path, &mut CompileLog::new()).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2, "cache hit must not compile");
    assert!(compiler.take_fresh_entries().is_empty());

    let (a, b) = (&first.shader_defs[0], &second.shader_defs[0]);
    assert_eq!(a.vertex_hash, b.vertex_hash);
    assert_eq!(a.fragment_hash, b.fragment_hash);
    assert_eq!(a.fragment_byte_code, b.fragment_byte_code);
}

#[test]
fn test_identical_passes_compile_once() {
    let dir = tempdir().unwrap();
    write(dir.path(), "shaders/blur.slang", &shader_source(&[], SIMPLE_REFLECTION));
    let preset_path = write(
        dir.path(),
        "double.slangp",
        "shaders = 2\nshader0 = shaders/blur.slang\nshader1 = shaders/blur.slang\n",
    );
    let (toolchain, calls) = fake_toolchain();
    let cache = ShaderCache::new();
    let mut compiler = Compiler::new(&toolchain, &cache);

    let preset = compiler
        .compile_file(&preset_path, &mut CompileLog::new())
        .unwrap();
    assert_eq!(preset.shader_defs.len(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(compiler.take_fresh_entries().len(), 2);
}

#[test]
fn test_two_pass_preset() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.slang", &crt_shader());
    write(
        dir.path(),
        "b.slang",
        &shader_source(&["#pragma name FINAL_PASS"], SIMPLE_REFLECTION),
    );
    write(dir.path(), "luts/mask.png", "\u{89}PNG fake image");
    let preset_path = write(
        dir.path(),
        "crt.slangp",
        "shaders = 2\n\
         shader0 = a.slang\n\
         filter_linear0 = true\n\
         scale_type0 = viewport\n\
         shader1 = b.slang\n\
         alias1 = IGNORED\n\
         textures = MASK\n\
         MASK = luts/mask.png\n\
         MASK_linear = false\n\
         GAMMA = 2.4\n",
    );
    let (toolchain, _) = fake_toolchain();
    let cache = ShaderCache::new();
    let mut compiler = Compiler::new(&toolchain, &cache);
    let mut log = CompileLog::new();

    let preset = compiler.compile_file(&preset_path, &mut log).unwrap();

    assert_eq!(preset.name, "crt.slangp");
    assert_eq!(preset.category, IMPORTED_CATEGORY);
    let names: Vec<_> = preset.shader_defs.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["a.slang", "b.slang"]);

    let first = &preset.shader_defs[0];
    assert_eq!(first.preset_param("filter_linear"), Some("true"));
    assert_eq!(first.preset_param("scale_type"), Some("viewport"));
    let second = &preset.shader_defs[1];
    assert_eq!(second.preset_param("filter_linear"), None);
    assert_eq!(second.preset_param("alias"), Some("FINAL_PASS"));

    assert_eq!(preset.texture_defs.len(), 1);
    let mask = &preset.texture_defs[0];
    assert_eq!(mask.name, "mask.png");
    assert_eq!(mask.len(), "\u{89}PNG fake image".len());
    assert!(mask.is_dynamic());
    assert_eq!(mask.preset_param("name"), Some("MASK"));
    assert_eq!(mask.preset_param("linear"), Some("false"));

    assert_eq!(preset.overrides, [ParamOverride::new("GAMMA", 2.4)]);
    assert!(!log.has_warnings());
}

#[test]
fn test_unknown_reflected_type_fails_the_file() {
    let dir = tempdir().unwrap();
    let reflection = concat!(
        r#"{"types":{"_1":{"members":[{"name":"Weights","type":"mat3","offset":0}]}},"#,
        r#""ubos":[{"type":"_1","binding":0}]}"#
    );
    let path = write(dir.path(), "bad.slang", &shader_source(&[], reflection));
    let (toolchain, _) = fake_toolchain();
    let cache = ShaderCache::new();
    let mut compiler = Compiler::new(&toolchain, &cache);

    let err = compiler
        .compile_file(&path, &mut CompileLog::new())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Reflection);
    let text = err.to_string();
    assert!(text.contains("bad.slang"));
    assert!(text.contains("mat3"));
}

#[test]
fn test_stage_failure_names_the_source() {
    let dir = tempdir().unwrap();
    let source = shader_source(&[], SIMPLE_REFLECTION).replace(
        "void main() { FragColor",
        &format!("{} broken\nvoid main() {{ FragColor", FAIL_GLSL),
    );
    let path = write(dir.path(), "broken.slang", &source);
    let (toolchain, calls) = fake_toolchain();
    let cache = ShaderCache::new();
    let mut compiler = Compiler::new(&toolchain, &cache);

    let err = compiler
        .compile_file(&path, &mut CompileLog::new())
        .unwrap_err();
    match &err {
        CompileError::Stage {
            shader_stage,
            path: failed,
            diagnostics,
            ..
        } => {
            assert_eq!(shader_stage.to_string(), "fragment");
            assert_eq!(failed, &path);
            assert!(diagnostics.contains("forced failure"));
        }
        other => panic!("expected stage error, got {:?}", other),
    }
    // The vertex stage compiled before the fragment stage failed.
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(compiler.take_fresh_entries().len(), 1);
}

#[test]
fn test_empty_byte_code_is_fatal() {
    let dir = tempdir().unwrap();
    let source = shader_source(&[&format!("// {}", EMPTY_BYTE_CODE)], SIMPLE_REFLECTION);
    let path = write(dir.path(), "empty.slang", &source);
    let (toolchain, _) = fake_toolchain();
    let cache = ShaderCache::new();
    let mut compiler = Compiler::new(&toolchain, &cache);

    let err = compiler
        .compile_file(&path, &mut CompileLog::new())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EmptyByteCode);
    assert!(compiler.take_fresh_entries().is_empty());
}

#[test]
fn test_duplicate_parameter_through_includes() {
    let dir = tempdir().unwrap();
    write(
        dir.path(),
        "include/params.inc",
        "#pragma parameter GAMMA \"Gamma\" 2.2 1.0 3.0 0.1\n",
    );
    let reflection = concat!(
        r#"{"types":{"_1":{"members":[{"name":"GAMMA","type":"float","offset":0}]}},"#,
        r#""ubos":[{"type":"_1","binding":0}]}"#
    );
    let source = shader_source(
        &[
            "#include \"include/params.inc\"",
            "#include \"include/params.inc\"",
        ],
        reflection,
    );
    let path = write(dir.path(), "twice.slang", &source);
    let (toolchain, _) = fake_toolchain();
    let cache = ShaderCache::new();
    let mut compiler = Compiler::new(&toolchain, &cache);

    let preset = compiler
        .compile_file(&path, &mut CompileLog::new())
        .unwrap();
    let def = &preset.shader_defs[0];
    assert_eq!(def.params.len(), 1);
    assert_eq!(def.params[0].name, "GAMMA");
}

#[test]
fn test_cache_entries_are_per_shader_model() {
    let dir = tempdir().unwrap();
    let path = write(dir.path(), "crt.slang", &crt_shader());

    let (sm5, sm5_calls) = fake_toolchain_for("5_0");
    let mut cache = ShaderCache::new();
    {
        let mut compiler = Compiler::new(&sm5, &cache);
        compiler.compile_file(&path, &mut CompileLog::new()).unwrap();
        for (hash, code) in compiler.take_fresh_entries() {
            cache.insert(hash, code);
        }
    }
    assert_eq!(sm5_calls.load(Ordering::SeqCst), 2);

    let (sm4, sm4_calls) = fake_toolchain_for("4_0");
    let mut compiler = Compiler::new(&sm4, &cache);
    let preset = compiler.compile_file(&path, &mut CompileLog::new()).unwrap();
    assert_eq!(sm4_calls.load(Ordering::SeqCst), 2, "5_0 byte-code must not be reused");

    let def = &preset.shader_defs[0];
    assert!(def.vertex_byte_code.starts_with(b"DXBCvs_4_0"));
    assert!(def.fragment_byte_code.starts_with(b"DXBCps_4_0"));
    assert_eq!(compiler.take_fresh_entries().len(), 2);
}

#[test]
fn test_shared_pass_comments_collected_once() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.slang", &crt_shader());
    let preset_path = write(
        dir.path(),
        "twice.slangp",
        "shaders = 2\nshader0 = a.slang\nshader1 = ./a.slang\n",
    );
    let (toolchain, _) = fake_toolchain();
    let cache = ShaderCache::new();
    let mut compiler = Compiler::new(&toolchain, &cache);

    compiler
        .compile_file(&preset_path, &mut CompileLog::new())
        .unwrap();
    let comments = compiler.take_comments();
    let credits = comments.iter().filter(|c| *c == "CRT test shader").count();
    assert_eq!(credits, 1);

    // A later compile starts a fresh collection.
    compiler
        .compile_file(&preset_path, &mut CompileLog::new())
        .unwrap();
    assert!(compiler.take_comments().contains(&"CRT test shader".to_string()));
}

#[test]
fn test_upper_case_shader_extension() {
    let dir = tempdir().unwrap();
    let path = write(dir.path(), "CRT.SLANG", &crt_shader());
    let (toolchain, _) = fake_toolchain();
    let cache = ShaderCache::new();
    let mut compiler = Compiler::new(&toolchain, &cache);

    let preset = compiler
        .compile_file(&path, &mut CompileLog::new())
        .unwrap();
    assert_eq!(preset.shader_defs.len(), 1);
    assert_eq!(preset.shader_defs[0].name, "CRT.SLANG");
}
