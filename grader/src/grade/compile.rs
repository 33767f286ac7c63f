//! Compilation of the submission sources.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use crate::grade::run_recorded;
use crate::io::config::GraderConfig;
use crate::io::report::{ProcessRecord, write_report};
use crate::io::workspace::{GradingPaths, compile_units};

pub const SUCCESS_REPORT: &str = "SUCCESSFUL_compilation.txt";
pub const FAILURE_REPORT: &str = "FAILED_compilation.txt";

/// Result of compiling the workspace sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Compilation {
    pub report: PathBuf,
    pub run: ProcessRecord,
}

impl Compilation {
    pub fn success(&self) -> bool {
        self.run.success()
    }
}

/// Compiler argv: configured command, sorted compile units, then `-o <binary>`.
pub fn compile_argv(paths: &GradingPaths, cfg: &GraderConfig) -> Result<Vec<String>> {
    let units = compile_units(paths, &cfg.compile_extension)?;
    if units.is_empty() {
        warn!(extension = %cfg.compile_extension, "no source files to compile");
    }
    let mut argv = cfg.compiler.command.clone();
    argv.extend(units.iter().map(|unit| unit.display().to_string()));
    argv.push("-o".to_string());
    argv.push(paths.binary.display().to_string());
    Ok(argv)
}

/// Compile the workspace and write the compilation report.
///
/// A compiler that cannot be started counts as a failed compilation.
#[instrument(skip_all)]
pub fn compile(paths: &GradingPaths, cfg: &GraderConfig) -> Result<Compilation> {
    let argv = compile_argv(paths, cfg)?;
    debug!(command = ?argv, "compiling");

    let run = run_recorded(
        argv,
        &paths.grading_dir,
        cfg.timeouts.compile(),
        cfg.output_limit_bytes,
    );
    let (report_name, stale_name) = if run.success() {
        info!("Compiling: SUCCESSFUL");
        (SUCCESS_REPORT, FAILURE_REPORT)
    } else {
        error!(return_code = ?run.return_code, termination = ?run.termination, "Compiling: FAILED");
        (FAILURE_REPORT, SUCCESS_REPORT)
    };
    let report = write_report(
        &paths.grading_dir,
        report_name,
        Some(stale_name),
        "COMPILATION",
        &run,
    )?;
    Ok(Compilation { report, run })
}
