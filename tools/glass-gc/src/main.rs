//! glass-gc - Glass shader compiler
//!
//! Compiles `.slang` shaders and `.slangp` presets into packed `.sgpreset`
//! files using glslangValidator, spirv-cross and fxc.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};

use glass_gc::config::CONFIG_FILE;
use glass_gc::paths;
use glass_gc::registry::REGISTRY_FILE;
use glass_gc::stages::external_toolchain;
use glass_gc::{
    parse_preset, parse_shader, BatchDriver, BatchOptions, CompileLog, GcConfig, OutputRegistry,
    ShaderCache, SourceShader,
};
use glass_shared::formats::PackedPreset;

#[derive(Parser)]
#[command(name = "glass-gc")]
#[command(about = "Glass shader and preset compiler")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile shaders and presets into packed presets
    Build {
        /// Files, directories, `*` for every preset below the working
        /// directory, or `-name` to exclude
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Rebuild existing outputs and ignore .exclude markers
        #[arg(short, long)]
        force: bool,

        /// Path to glass.toml
        #[arg(short, long, default_value = CONFIG_FILE)]
        config: PathBuf,

        /// Output directory (overrides config)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Directory for logs and run reports (overrides config)
        #[arg(long)]
        temp: Option<PathBuf>,

        /// Byte-code cache file (overrides config)
        #[arg(long)]
        cache: Option<PathBuf>,
    },

    /// Parse a shader or preset without compiling it
    Check {
        /// Input .slang or .slangp file
        input: PathBuf,
    },

    /// Summarize a packed preset
    Inspect {
        /// Input .sgpreset file
        input: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            inputs,
            force,
            config,
            output,
            temp,
            cache,
        } => {
            let config = GcConfig::load_or_default(&config)?;
            let toolchain =
                external_toolchain(&config.tools).context("Shader tools are not available")?;

            let cache_path = cache.unwrap_or_else(|| config.cache_path());
            let output_dir = output.unwrap_or_else(|| config.paths.output.clone());
            let registry_path = output_dir.join(REGISTRY_FILE);

            let options = BatchOptions {
                output_dir,
                temp_dir: temp.unwrap_or_else(|| config.paths.temp.clone()),
                force: force || config.build.force,
            };
            let mut driver = BatchDriver::new(
                &toolchain,
                ShaderCache::load(&cache_path)?,
                OutputRegistry::load(&registry_path)?,
                options,
            );
            let summary = driver.run(&inputs)?;

            let (cache, registry) = driver.into_parts();
            cache.save(&cache_path)?;
            registry.save(&registry_path)?;

            if summary.error > 0 {
                anyhow::bail!("{} of {} files failed", summary.error, summary.total());
            }
            tracing::info!("Build complete!");
        }

        Commands::Check { input } => check(&input)?,

        Commands::Inspect { input, json } => inspect(&input, json)?,
    }

    Ok(())
}

fn check(input: &Path) -> Result<()> {
    let mut log = CompileLog::new();
    if paths::has_extension(input, "slang") {
        let shader = parse_shader(input, &mut log)?;
        print_shader(&shader);
    } else if paths::has_extension(input, "slangp") {
        let preset = parse_preset(input, &mut log)?;
        println!("{}: {} passes", input.display(), preset.passes.len());
        for (i, pass) in preset.passes.iter().enumerate() {
            println!("pass {}: {}", i, pass.path.display());
            for (key, value) in &pass.preset_params {
                println!("  {} = {}", key, value);
            }
            let shader = parse_shader(&pass.path, &mut log)?;
            print_shader(&shader);
        }
        for texture in &preset.textures {
            println!("texture {}: {}", texture.name, texture.path.display());
        }
        for o in &preset.overrides {
            println!("override {} = {}", o.name, o.value);
        }
    } else {
        anyhow::bail!("Unsupported input: {:?} (use .slang or .slangp)", input);
    }

    if log.has_warnings() {
        println!("warnings:");
        for line in log.lines() {
            println!("  {}", line);
        }
    }
    Ok(())
}

fn print_shader(shader: &SourceShader) {
    println!(
        "  {} (format: {})",
        shader.path.display(),
        if shader.format.is_empty() {
            "default"
        } else {
            &shader.format
        }
    );
    for p in &shader.params {
        if p.description.is_empty() {
            continue;
        }
        println!(
            "    {} \"{}\" default {} range {}..{} step {}",
            p.name, p.description, p.default_value, p.min_value, p.max_value, p.step_value
        );
    }
}

#[derive(Serialize)]
struct PresetSummary {
    name: String,
    category: String,
    import_path: Option<String>,
    passes: Vec<PassSummary>,
    textures: Vec<TextureSummary>,
    overrides: Vec<(String, f32)>,
}

#[derive(Serialize)]
struct PassSummary {
    name: String,
    format: String,
    params: Vec<String>,
    samplers: Vec<String>,
    preset_params: Vec<(String, String)>,
    vertex_bytes: usize,
    fragment_bytes: usize,
    vertex_hash: String,
    fragment_hash: String,
}

#[derive(Serialize)]
struct TextureSummary {
    name: String,
    bytes: usize,
}

fn inspect(input: &Path, json: bool) -> Result<()> {
    let bytes =
        std::fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let packed = PackedPreset::from_bytes(&bytes)?;

    let summary = PresetSummary {
        name: packed.name.clone(),
        category: packed.category.clone(),
        import_path: packed.import_path.clone(),
        passes: packed
            .shaders
            .iter()
            .map(|s| PassSummary {
                name: s.name.clone(),
                format: s.format.clone(),
                params: s.params.iter().map(|p| p.name.clone()).collect(),
                samplers: s.samplers.iter().map(|p| p.name.clone()).collect(),
                preset_params: s.preset_params.clone(),
                vertex_bytes: s.vertex_byte_code.len(),
                fragment_bytes: s.fragment_byte_code.len(),
                vertex_hash: s.vertex_hash.to_hex(),
                fragment_hash: s.fragment_hash.to_hex(),
            })
            .collect(),
        textures: packed
            .textures
            .iter()
            .map(|t| TextureSummary {
                name: t.name.clone(),
                bytes: t.data.len(),
            })
            .collect(),
        overrides: packed
            .overrides
            .iter()
            .map(|o| (o.name.clone(), o.value))
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("{} ({})", summary.name, summary.category);
    for line in &packed.header {
        println!("  | {}", line);
    }
    for (i, pass) in summary.passes.iter().enumerate() {
        println!(
            "pass {}: {} vs {} bytes, ps {} bytes, {} params, samplers [{}]",
            i,
            pass.name,
            pass.vertex_bytes,
            pass.fragment_bytes,
            pass.params.len(),
            pass.samplers.join(", ")
        );
    }
    for t in &summary.textures {
        println!("texture {}: {} bytes", t.name, t.bytes);
    }
    for (name, value) in &summary.overrides {
        println!("override {} = {}", name, value);
    }
    Ok(())
}
