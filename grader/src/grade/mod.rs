//! Grading pipeline: workspace setup, compile, run fixtures, memory check.
//!
//! Compilation failure stops the run after its report is written. Everything
//! after that (program failures, missed updates, memcheck findings) is recorded
//! in reports and `summary.json` and never aborts the run.

pub mod compile;
pub mod execute;
pub mod memcheck;

use std::fs;
use std::path::Path;
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};

use crate::core::verify::FileVerdict;
use crate::io::config::GraderConfig;
use crate::io::process::run_command_with_timeout;
use crate::io::report::ProcessRecord;
use crate::io::workspace::{
    GradingPaths, copy_sources, make_grading_dir, set_up_fixtures, student_label,
};

use self::compile::{Compilation, compile};
use self::execute::{FixtureRun, run_fixture};
use self::memcheck::{CLEAN_REPORT, ERRORS_REPORT, Memcheck, check_memory};

/// Everything one grading run produced, persisted as `summary.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradingSummary {
    pub student: String,
    pub source_dir: String,
    pub grading_dir: String,
    pub keyword: String,
    pub compilation: Compilation,
    pub fixtures: Vec<FixtureRun>,
    pub memcheck: Option<Memcheck>,
}

/// Aggregate counts across every verified file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    pub files: usize,
    pub clean_files: usize,
    pub correct_updates: usize,
    pub missed_updates: usize,
    pub alignment_errors: usize,
    pub count_mismatches: usize,
    pub failed_runs: usize,
    /// Fixtures with grader-side errors (unwritable report, missing directory).
    pub fixture_errors: usize,
    pub unreadable_files: usize,
}

impl GradingSummary {
    pub fn compiled(&self) -> bool {
        self.compilation.success()
    }

    pub fn totals(&self) -> Totals {
        let mut totals = Totals::default();
        for fixture in &self.fixtures {
            if !fixture.run.success() {
                totals.failed_runs += 1;
            }
            if !fixture.errors.is_empty() {
                totals.fixture_errors += 1;
            }
            totals.unreadable_files += fixture.unreadable.len();
            for file in &fixture.files {
                let verification = &file.verification;
                totals.files += 1;
                if file.verdict == FileVerdict::Clean {
                    totals.clean_files += 1;
                }
                totals.correct_updates += verification.correct_updates;
                totals.missed_updates += verification.missed_updates;
                totals.alignment_errors += verification.alignment_errors.len();
                if verification.count_mismatch.is_some() {
                    totals.count_mismatches += 1;
                }
            }
        }
        totals
    }
}

/// Grade the submission in `source_dir`.
///
/// Returns `Ok` with `compiled() == false` when compilation fails; errors are
/// reserved for setup and I/O problems.
#[instrument(skip_all, fields(source_dir = %source_dir.display()))]
pub fn run_grading(cfg: &GraderConfig, source_dir: &Path) -> Result<GradingSummary> {
    cfg.validate()?;
    let keyword = cfg.keyword()?;
    let paths = GradingPaths::resolve(source_dir, cfg)?;
    let student = student_label(&paths.source_dir);
    info!(student = %student, "testing student");

    make_grading_dir(&paths)?;
    info!("copying source files to the grading directory");
    copy_sources(&paths, cfg)?;
    info!("setting up test directories");
    let fixtures = set_up_fixtures(&paths, &cfg.fixtures_dir)?;

    clear_previous_outputs(&paths)?;
    info!("compiling code");
    let compilation = compile(&paths, cfg)?;
    let mut summary = GradingSummary {
        student,
        source_dir: paths.source_dir.display().to_string(),
        grading_dir: paths.grading_dir.display().to_string(),
        keyword: keyword.to_string(),
        compilation,
        fixtures: Vec::new(),
        memcheck: None,
    };

    if !summary.compiled() {
        error!("COMPILATION FAILED, cannot proceed with grading");
        write_summary(&paths.summary_path, &summary)?;
        return Ok(summary);
    }

    for name in &fixtures {
        summary.fixtures.push(run_fixture(&paths, cfg, &keyword, name));
    }

    summary.memcheck = Some(check_memory(&paths, cfg, &keyword));
    write_summary(&paths.summary_path, &summary)?;
    Ok(summary)
}

/// Remove the binary, memcheck reports, and summary left by an earlier run.
///
/// Compilation reports are replaced by `compile` itself.
pub fn clear_previous_outputs(paths: &GradingPaths) -> Result<()> {
    let stale = [
        paths.binary.clone(),
        paths.grading_dir.join(CLEAN_REPORT),
        paths.grading_dir.join(ERRORS_REPORT),
        paths.summary_path.clone(),
    ];
    for path in stale {
        if path.is_file() {
            fs::remove_file(&path).with_context(|| format!("remove {}", path.display()))?;
            debug!(path = %path.display(), "removed output from previous run");
        }
    }
    Ok(())
}

/// Write `summary.json`, recreating its directory if the program removed it.
pub fn write_summary(path: &Path, summary: &GradingSummary) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let contents = serde_json::to_string_pretty(summary).context("serialize summary")?;
    fs::write(path, format!("{contents}\n"))
        .with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// Run `argv` in `cwd`, turning spawn failures into a `NotStarted` record.
pub(crate) fn run_recorded(
    argv: Vec<String>,
    cwd: &Path,
    timeout: Duration,
    output_limit_bytes: usize,
) -> ProcessRecord {
    if argv.is_empty() {
        return ProcessRecord::not_started(argv, &anyhow!("empty command"));
    }
    let mut cmd = Command::new(&argv[0]);
    cmd.args(&argv[1..]).current_dir(cwd);
    match run_command_with_timeout(cmd, timeout, output_limit_bytes) {
        Ok(output) => ProcessRecord::from_output(argv, &output),
        Err(err) => {
            error!(command = ?argv, err = %format!("{err:#}"), "could not run command");
            ProcessRecord::not_started(argv, &err)
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::io::process::Termination;

    #[test]
    fn run_recorded_captures_output() {
        let temp = tempfile::tempdir().expect("tempdir");
        let argv = vec!["sh".to_string(), "-c".to_string(), "pwd -P".to_string()];
        let record = run_recorded(argv, temp.path(), Duration::from_secs(5), 1024);
        assert!(record.success());
        let expected = temp.path().canonicalize().expect("canonical");
        assert_eq!(record.stdout.trim(), expected.display().to_string());
    }

    #[test]
    fn run_recorded_reports_missing_program() {
        let temp = tempfile::tempdir().expect("tempdir");
        let argv = vec!["no-such-grader-tool".to_string()];
        let record = run_recorded(argv, temp.path(), Duration::from_secs(5), 1024);
        assert_eq!(record.termination, Termination::NotStarted);
        assert!(record.stderr.contains("spawn"));
    }
}
