//! Grading workspace layout and setup.
//!
//! Each submission gets `<submission>/<grading_dir_name>/` holding copies of
//! its sources, the compiled program, the reports, and a fresh copy of every
//! fixture directory under `<test_dirs_name>/`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{debug, info, instrument, warn};

use crate::io::config::GraderConfig;
use crate::io::files::{copy_dir_recursive, file_name, has_extension, list_entries};

/// Canonical paths for one grading run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradingPaths {
    pub source_dir: PathBuf,
    pub grading_dir: PathBuf,
    pub test_dirs: PathBuf,
    pub binary: PathBuf,
    pub summary_path: PathBuf,
}

impl GradingPaths {
    /// Resolve paths for `source_dir`, which must exist.
    ///
    /// Paths are absolute so programs can be spawned from any working directory.
    pub fn resolve(source_dir: &Path, cfg: &GraderConfig) -> Result<Self> {
        if !source_dir.is_dir() {
            bail!("source directory {} not found", source_dir.display());
        }
        let source_dir = source_dir
            .canonicalize()
            .with_context(|| format!("resolve {}", source_dir.display()))?;
        let grading_dir = source_dir.join(&cfg.grading_dir_name);
        Ok(Self {
            test_dirs: grading_dir.join(&cfg.test_dirs_name),
            binary: grading_dir.join(&cfg.binary_name),
            summary_path: grading_dir.join("summary.json"),
            source_dir,
            grading_dir,
        })
    }

    /// Where the fixture `name` is copied and executed.
    pub fn fixture_dir(&self, name: &str) -> PathBuf {
        self.test_dirs.join(name)
    }
}

/// Student label from a submission directory name (`jane_doe_123` -> `jane`).
pub fn student_label(source_dir: &Path) -> String {
    let name = file_name(source_dir);
    name.split('_').next().unwrap_or_default().to_string()
}

/// Create the grading directory if it does not exist.
pub fn make_grading_dir(paths: &GradingPaths) -> Result<()> {
    fs::create_dir_all(&paths.grading_dir)
        .with_context(|| format!("create grading dir {}", paths.grading_dir.display()))?;
    info!(grading_dir = %paths.grading_dir.display(), "grading directory ready");
    Ok(())
}

/// Copy top-level source files (and extra files like `readme.txt`) into the grading dir.
#[instrument(skip_all, fields(source_dir = %paths.source_dir.display()))]
pub fn copy_sources(paths: &GradingPaths, cfg: &GraderConfig) -> Result<Vec<PathBuf>> {
    let mut copied = Vec::new();
    for path in list_entries(&paths.source_dir)? {
        if !path.is_file() || !is_source_file(&path, cfg) {
            continue;
        }
        let name = file_name(&path);
        let target = paths.grading_dir.join(&name);
        fs::copy(&path, &target)
            .with_context(|| format!("copy {} to {}", path.display(), target.display()))?;
        info!(file = %name, "copied source file");
        copied.push(target);
    }
    if copied.is_empty() {
        warn!("no source files found");
    }
    Ok(copied)
}

fn is_source_file(path: &Path, cfg: &GraderConfig) -> bool {
    let name = file_name(path);
    cfg.source_extensions
        .iter()
        .any(|ext| has_extension(path, ext))
        || cfg
            .extra_source_files
            .iter()
            .any(|extra| extra.eq_ignore_ascii_case(&name))
}

/// Replace the workspace fixture copy with a fresh copy of `fixtures_dir`.
///
/// Returns the fixture names (sorted sub-directory names).
#[instrument(skip_all, fields(fixtures_dir = %fixtures_dir.display()))]
pub fn set_up_fixtures(paths: &GradingPaths, fixtures_dir: &Path) -> Result<Vec<String>> {
    if paths.test_dirs.exists() {
        fs::remove_dir_all(&paths.test_dirs)
            .with_context(|| format!("remove {}", paths.test_dirs.display()))?;
    }
    copy_dir_recursive(fixtures_dir, &paths.test_dirs).context("copy fixtures")?;

    let mut names = Vec::new();
    for entry in list_entries(&paths.test_dirs)? {
        if entry.is_dir() {
            names.push(file_name(&entry));
        } else {
            debug!(path = %entry.display(), "skipping non-directory fixture entry");
        }
    }
    info!(fixtures = names.len(), "fixture directories ready");
    Ok(names)
}

/// Sorted files in the grading dir with `extension`, in the order passed to the compiler.
pub fn compile_units(paths: &GradingPaths, extension: &str) -> Result<Vec<PathBuf>> {
    Ok(list_entries(&paths.grading_dir)?
        .into_iter()
        .filter(|path| path.is_file() && has_extension(path, extension))
        .collect())
}
