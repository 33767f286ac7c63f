//! Memory-safety pass over the compiled program.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::core::keyword::Keyword;
use crate::grade::run_recorded;
use crate::io::config::GraderConfig;
use crate::io::process::Termination;
use crate::io::report::{ProcessRecord, write_report};
use crate::io::workspace::GradingPaths;

pub const CLEAN_REPORT: &str = "NO_ERRORS_memcheck.txt";
pub const ERRORS_REPORT: &str = "ERRORS_memcheck.txt";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memcheck {
    pub clean: bool,
    /// Absent when the report could not be written.
    pub report: Option<PathBuf>,
    pub run: ProcessRecord,
    pub error: Option<String>,
}

/// Clean when the checker finished in time and its stderr carries `marker`.
pub fn is_clean(run: &ProcessRecord, marker: &str) -> bool {
    matches!(run.termination, Termination::Exited | Termination::Signaled)
        && run.stderr.contains(marker)
}

/// Run the memory checker on the program from the grading directory.
///
/// Findings, timeouts, and a missing checker are recorded as `ERRORS`. A report
/// that cannot be written (the program may have removed the grading directory)
/// is recorded in `error`.
#[instrument(skip_all)]
pub fn check_memory(paths: &GradingPaths, cfg: &GraderConfig, keyword: &Keyword) -> Memcheck {
    let mut argv = cfg.memcheck.command.clone();
    argv.push(paths.binary.display().to_string());
    argv.push(keyword.to_string());

    let run = run_recorded(
        argv,
        &paths.grading_dir,
        cfg.timeouts.memcheck(),
        cfg.output_limit_bytes,
    );
    let clean = is_clean(&run, &cfg.memcheck.clean_marker);
    let (report_name, stale_name) = if clean {
        info!("memcheck: NO ERRORS");
        (CLEAN_REPORT, ERRORS_REPORT)
    } else {
        warn!(termination = ?run.termination, "memcheck: ERRORS");
        (ERRORS_REPORT, CLEAN_REPORT)
    };
    let (report, error) = match write_report(
        &paths.grading_dir,
        report_name,
        Some(stale_name),
        "MEMCHECK",
        &run,
    ) {
        Ok(report) => (Some(report), None),
        Err(err) => {
            let message = format!("{err:#}");
            error!(err = %message, "memcheck report could not be written");
            (None, Some(message))
        }
    };
    Memcheck {
        clean,
        report,
        run,
        error,
    }
}
