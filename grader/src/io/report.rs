//! Plain-text reports for external invocations.
//!
//! Every report has three labeled sections (return code, stdout, stderr),
//! each followed by a blank line:
//!
//! ```text
//! COMPILATION RETURN CODE: 0
//!
//! COMPILATION STDOUT: ...
//!
//! COMPILATION STDERR: ...
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::io::process::{CommandOutput, Termination};

/// Structured result of one external invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessRecord {
    pub command: Vec<String>,
    pub return_code: Option<i32>,
    pub termination: Termination,
    pub stdout: String,
    pub stderr: String,
    pub stdout_truncated: usize,
    pub stderr_truncated: usize,
}

impl ProcessRecord {
    pub fn from_output(command: Vec<String>, output: &CommandOutput) -> Self {
        Self {
            command,
            return_code: output.status.code(),
            termination: output.termination(),
            stdout: output.stdout_lossy(),
            stderr: output.stderr_lossy(),
            stdout_truncated: output.stdout_truncated,
            stderr_truncated: output.stderr_truncated,
        }
    }

    /// Record for a command that could not be spawned at all.
    pub fn not_started(command: Vec<String>, err: &anyhow::Error) -> Self {
        Self {
            command,
            return_code: None,
            termination: Termination::NotStarted,
            stdout: String::new(),
            stderr: format!("{err:#}"),
            stdout_truncated: 0,
            stderr_truncated: 0,
        }
    }

    pub fn success(&self) -> bool {
        self.termination == Termination::Exited && self.return_code == Some(0)
    }
}

/// Render a report body with the given section label (e.g. `COMPILATION`).
pub fn render_report(label: &str, record: &ProcessRecord) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{label} RETURN CODE: {}\n\n",
        render_return_code(record)
    ));
    out.push_str(&format!("{label} STDOUT: {}", record.stdout));
    out.push_str(&truncated_notice("stdout", record.stdout_truncated));
    out.push_str("\n\n");
    out.push_str(&format!("{label} STDERR: {}", record.stderr));
    out.push_str(&truncated_notice("stderr", record.stderr_truncated));
    out.push_str("\n\n");
    out
}

fn render_return_code(record: &ProcessRecord) -> String {
    match (record.termination, record.return_code) {
        (Termination::Exited, Some(code)) => code.to_string(),
        (Termination::TimedOut, _) => "none (killed after timeout)".to_string(),
        (Termination::NotStarted, _) => "none (could not start)".to_string(),
        _ => "none (terminated by signal)".to_string(),
    }
}

fn truncated_notice(stream: &str, truncated: usize) -> String {
    if truncated > 0 {
        format!("\n[{stream} truncated {truncated} bytes]")
    } else {
        String::new()
    }
}

/// Write `record` to `dir/file_name`, first removing a stale report from a
/// previous run whose name encoded the opposite outcome.
pub fn write_report(
    dir: &Path,
    file_name: &str,
    stale_name: Option<&str>,
    label: &str,
    record: &ProcessRecord,
) -> Result<PathBuf> {
    if let Some(stale) = stale_name {
        let stale_path = dir.join(stale);
        if stale_path.exists() {
            fs::remove_file(&stale_path)
                .with_context(|| format!("remove stale report {}", stale_path.display()))?;
        }
    }
    let path = dir.join(file_name);
    fs::write(&path, render_report(label, record))
        .with_context(|| format!("write report {}", path.display()))?;
    debug!(path = %path.display(), "report written");
    Ok(path)
}
