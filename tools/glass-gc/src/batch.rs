//! Batch driver: compiles many inputs, one log per file, one run report.
//!
//! Files are processed one after another. A failing file is logged and
//! reported as `ERROR`; the batch carries on with the next one. Byte-code
//! compiled for one file goes into the cache before the next file starts.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use hashbrown::HashMap;
use walkdir::WalkDir;

use glass_shared::formats::PackedPreset;
use glass_shared::PRESET_FORMAT;

use crate::cache::ShaderCache;
use crate::compile::{attribution_header, Compiler, IMPORTED_CATEGORY};
use crate::log::CompileLog;
use crate::paths;
use crate::registry::{EntryKind, OutputRegistry, RegistryEntry};
use crate::stages::Toolchain;

/// Directory marker that keeps `*` from descending into a tree.
pub const EXCLUDE_MARKER: &str = ".exclude";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Ok,
    Warn,
    Error,
    /// Excluded, or the output already exists.
    Skipped,
}

impl FileStatus {
    pub fn label(self) -> &'static str {
        match self {
            FileStatus::Ok => "OK",
            FileStatus::Warn => "WARN",
            FileStatus::Error => "ERROR",
            FileStatus::Skipped => "SKIPPED",
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub output_dir: PathBuf,
    pub temp_dir: PathBuf,
    /// Rebuild existing outputs and ignore `.exclude` markers.
    pub force: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub ok: usize,
    pub warn: usize,
    pub error: usize,
    pub skipped: usize,
}

impl BatchSummary {
    fn record(&mut self, status: FileStatus) {
        match status {
            FileStatus::Ok => self.ok += 1,
            FileStatus::Warn => self.warn += 1,
            FileStatus::Error => self.error += 1,
            FileStatus::Skipped => self.skipped += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.ok + self.warn + self.error + self.skipped
    }
}

pub struct BatchDriver<'a> {
    toolchain: &'a Toolchain,
    cache: ShaderCache,
    registry: OutputRegistry,
    options: BatchOptions,
    /// Output path -> the source that produced it in this driver's runs.
    claimed: HashMap<PathBuf, PathBuf>,
}

impl<'a> BatchDriver<'a> {
    pub fn new(
        toolchain: &'a Toolchain,
        cache: ShaderCache,
        registry: OutputRegistry,
        options: BatchOptions,
    ) -> Self {
        Self {
            toolchain,
            cache,
            registry,
            options,
            claimed: HashMap::new(),
        }
    }

    pub fn cache(&self) -> &ShaderCache {
        &self.cache
    }

    pub fn registry(&self) -> &OutputRegistry {
        &self.registry
    }

    /// Hand back the cache and registry for saving.
    pub fn into_parts(self) -> (ShaderCache, OutputRegistry) {
        (self.cache, self.registry)
    }

    /// Process every input and write the run report.
    pub fn run(&mut self, inputs: &[String]) -> Result<BatchSummary> {
        fs::create_dir_all(self.logs_dir()).with_context(|| {
            format!("Failed to create log directory: {}", self.logs_dir().display())
        })?;

        let started = chrono::Local::now();
        let report_path = self
            .options
            .temp_dir
            .join(format!("{}.log", started.format("%Y%m%d_%H%M%S")));
        let mut report = File::create(&report_path)
            .with_context(|| format!("Failed to create report: {}", report_path.display()))?;
        writeln!(report, "Starting at {}", started.format("%Y-%m-%d %H:%M:%S"))?;

        let mut summary = BatchSummary::default();
        for input in inputs {
            for path in self.expand_input(input) {
                let status = self.process_file(&path);
                summary.record(status);
                if status != FileStatus::Skipped {
                    writeln!(report, "{}: {}", status.label(), path.display())?;
                }
            }
        }

        let finished = chrono::Local::now();
        writeln!(report, "Finishing at {}", finished.format("%Y-%m-%d %H:%M:%S"))?;
        tracing::info!(
            "{} files: {} ok, {} warnings, {} errors, {} skipped (report: {})",
            summary.total(),
            summary.ok,
            summary.warn,
            summary.error,
            summary.skipped,
            report_path.display()
        );
        Ok(summary)
    }

    /// Files named by one command line input.
    ///
    /// `*` walks the working directory for presets; a directory yields its
    /// shader and preset files (not recursive); a leading `-` excludes.
    pub fn expand_input(&self, input: &str) -> Vec<PathBuf> {
        if input.starts_with('-') {
            return Vec::new();
        }
        if input == "*" {
            return collect_presets(Path::new("."), self.options.force);
        }
        let path = Path::new(input);
        if path.is_dir() {
            return list_dir(path);
        }
        vec![path.to_path_buf()]
    }

    /// Compile one file to its packed artifact and record the outcome.
    pub fn process_file(&mut self, path: &Path) -> FileStatus {
        let path = paths::normalize(path);
        if paths::file_name(&path).starts_with('-') {
            return FileStatus::Skipped;
        }

        let output = output_path(&self.options.output_dir, &path);
        if let Some(owner) = self.claimed.get(&output).filter(|owner| **owner != path) {
            let message = format!(
                "ERROR: {} would overwrite {}, already written for {}",
                path.display(),
                output.display(),
                owner.display()
            );
            tracing::error!("{}", message);
            let mut log = CompileLog::new();
            log.note(message);
            self.write_log(&path, FileStatus::Error, &log);
            return FileStatus::Error;
        }
        self.claimed.insert(output.clone(), path.clone());

        if output.exists() && !self.options.force {
            tracing::debug!("{} is up to date", output.display());
            let entry = self.registry_entry(&path, &output);
            self.registry.append(entry);
            return FileStatus::Skipped;
        }

        tracing::info!("compiling {}", path.display());
        let mut log = CompileLog::new();
        let status = match self.compile_to(&path, &output, &mut log) {
            Ok(()) if log.has_warnings() => FileStatus::Warn,
            Ok(()) => FileStatus::Ok,
            Err(e) => {
                tracing::error!("{}: {:#}", path.display(), e);
                log.note(format!("ERROR: {:#}", e));
                FileStatus::Error
            }
        };
        if status == FileStatus::Ok {
            log.note("OK");
        }
        self.write_log(&path, status, &log);
        status
    }

    fn compile_to(&mut self, path: &Path, output: &Path, log: &mut CompileLog) -> Result<()> {
        let mut compiler = Compiler::new(self.toolchain, &self.cache);
        let result = compiler.compile_file(path, log);
        let fresh = compiler.take_fresh_entries();
        let comments = compiler.take_comments();

        // Keep whatever compiled, even when a later pass failed.
        for (hash, byte_code) in fresh {
            self.cache.insert(hash, byte_code);
        }

        let preset = result?;
        let header = attribution_header(&preset, path, &comments);
        let bytes = PackedPreset::from_preset(&preset, header).to_bytes()?;

        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(output, bytes)
            .with_context(|| format!("Failed to write {}", output.display()))?;
        log.note(format!("wrote {}", output.display()));

        let entry = self.registry_entry(path, output);
        self.registry.append(entry);
        Ok(())
    }

    fn registry_entry(&self, path: &Path, output: &Path) -> RegistryEntry {
        let kind = if paths::has_extension(path, "slang") {
            EntryKind::Shader
        } else {
            EntryKind::Preset
        };
        let relative = output
            .strip_prefix(&self.options.output_dir)
            .unwrap_or(output);
        RegistryEntry {
            kind,
            category: category_of(path),
            name: paths::file_name(path),
            output: relative.to_string_lossy().replace('\\', "/"),
            source: path.to_string_lossy().replace('\\', "/"),
        }
    }

    fn logs_dir(&self) -> PathBuf {
        self.options.temp_dir.join("logs")
    }

    /// Write the per-file log, replacing logs of earlier runs.
    fn write_log(&self, path: &Path, status: FileStatus, log: &CompileLog) {
        if let Err(e) = fs::create_dir_all(self.logs_dir()) {
            tracing::warn!("failed to create {}: {}", self.logs_dir().display(), e);
            return;
        }
        let stem = self.logs_dir().join(paths::flatten(path));
        let name = |suffix: &str| {
            let mut file = stem.clone().into_os_string();
            file.push(suffix);
            PathBuf::from(file)
        };
        for suffix in [".log", ".WARN.log", ".ERROR.log"] {
            let _ = fs::remove_file(name(suffix));
        }
        let target = match status {
            FileStatus::Warn => name(".WARN.log"),
            FileStatus::Error => name(".ERROR.log"),
            _ => name(".log"),
        };
        if let Err(e) = log.write_to(&target) {
            tracing::warn!("failed to write {}: {}", target.display(), e);
        }
    }
}

/// Where the packed artifact for `input` goes: the input's file name with
/// `.sgpreset` appended, so `crt.slang` and `crt.slangp` stay apart.
///
/// Relative inputs keep their directory structure under `output_dir`;
/// absolute inputs land directly in it.
pub fn output_path(output_dir: &Path, input: &Path) -> PathBuf {
    let relative: PathBuf = if input.is_absolute() {
        PathBuf::from(paths::file_name(input))
    } else {
        paths::normalize(input)
            .components()
            .filter(|c| matches!(c, Component::Normal(_)))
            .collect()
    };
    let mut name = relative.into_os_string();
    name.push(".");
    name.push(PRESET_FORMAT.extension);
    output_dir.join(name)
}

/// Top-level directory of a relative input, used as registry category.
pub fn category_of(path: &Path) -> String {
    let normal: Vec<_> = paths::normalize(path)
        .components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if path.is_relative() && normal.len() > 1 {
        normal[0].clone()
    } else {
        IMPORTED_CATEGORY.to_string()
    }
}

fn is_source_file(path: &Path) -> bool {
    paths::has_extension(path, "slang") || is_preset_file(path)
}

fn is_preset_file(path: &Path) -> bool {
    paths::has_extension(path, "slangp")
}

fn list_dir(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = match fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file() && is_source_file(p))
            .collect(),
        Err(e) => {
            tracing::error!("cannot read {}: {}", dir.display(), e);
            Vec::new()
        }
    };
    files.sort();
    files
}

/// Every `.slangp` below `root`, skipping trees marked with `.exclude`
/// unless `force` is set.
pub fn collect_presets(root: &Path, force: bool) -> Vec<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| {
            force || !(e.file_type().is_dir() && e.path().join(EXCLUDE_MARKER).exists())
        })
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_preset_file(e.path()))
        .map(|e| paths::normalize(e.path()))
        .collect()
}
