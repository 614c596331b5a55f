//! Per-file diagnostic log.
//!
//! Every compile call writes into a [`CompileLog`]: tool output, dropped
//! overrides and parse leniency notes. The batch driver writes it next to the
//! run report; the warning flag decides between OK and WARN status.

use std::fs;
use std::io;
use std::path::Path;

#[derive(Debug, Default, Clone)]
pub struct CompileLog {
    lines: Vec<String>,
    warned: bool,
}

impl CompileLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an informational line.
    pub fn note(&mut self, line: impl Into<String>) {
        let line = line.into();
        tracing::debug!("{}", line);
        self.lines.push(line);
    }

    /// Record a line and raise the warning flag.
    pub fn warn(&mut self, line: impl Into<String>) {
        let line = line.into();
        tracing::warn!("{}", line);
        self.lines.push(line);
        self.warned = true;
    }

    pub fn has_warnings(&self) -> bool {
        self.warned
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|l| l.contains(needle))
    }

    pub fn write_to(&self, path: &Path) -> io::Result<()> {
        let mut text = self.lines.join("\n");
        text.push('\n');
        fs::write(path, text)
    }
}
