//! Grader configuration, usually `grader.toml` next to where the grader runs.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::keyword::Keyword;
use crate::core::verify::CountPolicy;

/// Grader configuration (TOML).
///
/// Built once at startup and passed to every stage. Missing fields default to
/// the values used for the keyword assignment (`apple`, gcc, valgrind).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GraderConfig {
    /// Keyword passed to the program under test and checked in its output.
    pub keyword: String,

    /// Directory holding one sub-directory per fixture test.
    pub fixtures_dir: PathBuf,

    /// Name of the grading workspace created inside each submission.
    pub grading_dir_name: String,

    /// Name of the fixture copy inside the grading workspace.
    pub test_dirs_name: String,

    /// File name of the compiled program.
    pub binary_name: String,

    /// Extensions (case-insensitive) of source files copied into the workspace.
    pub source_extensions: Vec<String>,

    /// Extension (case-insensitive) of the copied sources handed to the compiler.
    pub compile_extension: String,

    /// Extra file names (case-insensitive) copied alongside the sources.
    pub extra_source_files: Vec<String>,

    /// Extension of fixture files that are verified.
    pub verify_extension: String,

    /// OS metadata file names never treated as fixture output.
    pub metadata_files: Vec<String>,

    pub count_policy: CountPolicy,

    /// Truncate captured stdout/stderr beyond this many bytes per stream.
    pub output_limit_bytes: usize,

    pub compiler: CompilerConfig,
    pub memcheck: MemcheckConfig,
    pub timeouts: TimeoutConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CompilerConfig {
    /// Compiler invocation; sources and `-o <binary>` are appended.
    pub command: Vec<String>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            command: ["gcc", "-Wall", "-g", "-gdwarf-4"]
                .map(String::from)
                .to_vec(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MemcheckConfig {
    /// Memory checker invocation; the binary and keyword are appended.
    pub command: Vec<String>,
    /// Text in the checker's stderr that marks a clean run.
    pub clean_marker: String,
}

impl Default for MemcheckConfig {
    fn default() -> Self {
        Self {
            command: vec!["valgrind".to_string(), "--leak-check=full".to_string()],
            clean_marker: "ERROR SUMMARY: 0 errors".to_string(),
        }
    }
}

/// Wall-clock limits per external invocation, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TimeoutConfig {
    pub compile_secs: u64,
    pub test_secs: u64,
    pub memcheck_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            compile_secs: 120,
            test_secs: 30,
            memcheck_secs: 120,
        }
    }
}

impl TimeoutConfig {
    pub fn compile(&self) -> Duration {
        Duration::from_secs(self.compile_secs)
    }

    pub fn test(&self) -> Duration {
        Duration::from_secs(self.test_secs)
    }

    pub fn memcheck(&self) -> Duration {
        Duration::from_secs(self.memcheck_secs)
    }
}

impl Default for GraderConfig {
    fn default() -> Self {
        Self {
            keyword: "apple".to_string(),
            fixtures_dir: PathBuf::from("test_folders"),
            grading_dir_name: "grading".to_string(),
            test_dirs_name: "test_dirs".to_string(),
            binary_name: "a.out".to_string(),
            source_extensions: vec!["c".to_string(), "h".to_string()],
            compile_extension: "c".to_string(),
            extra_source_files: vec!["readme.txt".to_string()],
            verify_extension: "txt".to_string(),
            metadata_files: [".DS_Store", "Thumbs.db", "desktop.ini"]
                .map(String::from)
                .to_vec(),
            count_policy: CountPolicy::Truncate,
            output_limit_bytes: 1_000_000,
            compiler: CompilerConfig::default(),
            memcheck: MemcheckConfig::default(),
            timeouts: TimeoutConfig::default(),
        }
    }
}

impl GraderConfig {
    pub fn validate(&self) -> Result<()> {
        Keyword::new(&self.keyword).context("keyword")?;
        for (label, name) in [
            ("grading_dir_name", &self.grading_dir_name),
            ("test_dirs_name", &self.test_dirs_name),
            ("binary_name", &self.binary_name),
        ] {
            if name.trim().is_empty() {
                return Err(anyhow!("{label} must be non-empty"));
            }
            if name.contains('/') || name.contains('\\') || name == ".." {
                return Err(anyhow!("{label} must be a plain file name"));
            }
        }
        if self.source_extensions.is_empty() {
            return Err(anyhow!("source_extensions must be a non-empty array"));
        }
        if self.compile_extension.trim().is_empty() {
            return Err(anyhow!("compile_extension must be non-empty"));
        }
        if self.verify_extension.trim().is_empty() {
            return Err(anyhow!("verify_extension must be non-empty"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        if self.compiler.command.is_empty() || self.compiler.command[0].trim().is_empty() {
            return Err(anyhow!("compiler.command must be a non-empty array"));
        }
        if self.memcheck.command.is_empty() || self.memcheck.command[0].trim().is_empty() {
            return Err(anyhow!("memcheck.command must be a non-empty array"));
        }
        if self.memcheck.clean_marker.is_empty() {
            return Err(anyhow!("memcheck.clean_marker must be non-empty"));
        }
        if self.timeouts.compile_secs == 0
            || self.timeouts.test_secs == 0
            || self.timeouts.memcheck_secs == 0
        {
            return Err(anyhow!("timeouts must be > 0"));
        }
        Ok(())
    }

    /// The validated keyword.
    pub fn keyword(&self) -> Result<Keyword> {
        Keyword::new(&self.keyword)
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `GraderConfig::default()`.
pub fn load_config(path: &Path) -> Result<GraderConfig> {
    if !path.exists() {
        let cfg = GraderConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: GraderConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}

/// Write config to disk as pretty TOML.
pub fn write_config(path: &Path, cfg: &GraderConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    fs::write(path, buf).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
