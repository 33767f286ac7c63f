//! Running the compiled program once per fixture directory.

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::core::keyword::Keyword;
use crate::discover::{FileCheck, UnreadableFile, check_fixture};
use crate::grade::run_recorded;
use crate::io::config::GraderConfig;
use crate::io::report::{ProcessRecord, write_report};
use crate::io::workspace::GradingPaths;

/// One fixture: the program run plus the verification of every output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureRun {
    pub name: String,
    /// `<fixture>.txt`, absent when it could not be written.
    pub report: Option<PathBuf>,
    pub run: ProcessRecord,
    pub files: Vec<FileCheck>,
    pub unreadable: Vec<UnreadableFile>,
    /// Grader-side failures for this fixture (staging, report, verification).
    pub errors: Vec<String>,
}

impl FixtureRun {
    fn new(name: &str, run: ProcessRecord) -> Self {
        Self {
            name: name.to_string(),
            report: None,
            run,
            files: Vec::new(),
            unreadable: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty() || !self.unreadable.is_empty()
    }

    fn record_error(&mut self, err: &anyhow::Error) {
        let message = format!("{err:#}");
        error!(fixture = %self.name, err = %message, "fixture could not be completed");
        self.errors.push(message);
    }
}

/// Copy the binary into the fixture copy, run it there with the keyword, then
/// verify its output files against the pristine fixture.
///
/// Never fails: the program under test may break its own fixture directory, so
/// every error here is recorded on the returned run and grading moves on.
#[instrument(skip_all, fields(fixture = %name))]
pub fn run_fixture(
    paths: &GradingPaths,
    cfg: &GraderConfig,
    keyword: &Keyword,
    name: &str,
) -> FixtureRun {
    let fixture_dir = paths.fixture_dir(name);
    let binary = fixture_dir.join(&cfg.binary_name);
    let argv = vec![binary.display().to_string(), keyword.to_string()];
    if let Err(err) = fs::copy(&paths.binary, &binary)
        .with_context(|| format!("copy executable to {}", fixture_dir.display()))
    {
        let mut fixture = FixtureRun::new(name, ProcessRecord::not_started(argv, &err));
        fixture.record_error(&err);
        return fixture;
    }
    info!("copied executable to [...]/{name}");

    let run = run_recorded(argv, &fixture_dir, cfg.timeouts.test(), cfg.output_limit_bytes);
    let mut fixture = FixtureRun::new(name, run);
    if fixture.run.success() {
        info!("{name}: ran without errors");
    } else {
        warn!(return_code = ?fixture.run.return_code, termination = ?fixture.run.termination, "{name}: ERROR while running");
    }

    match write_report(&fixture_dir, &format!("{name}.txt"), None, "TEST", &fixture.run) {
        Ok(report) => {
            info!("{name}: test report saved");
            fixture.report = Some(report);
        }
        Err(err) => fixture.record_error(&err),
    }

    match check_fixture(name, &cfg.fixtures_dir.join(name), &fixture_dir, cfg, keyword) {
        Ok(checked) => {
            fixture.files = checked.files;
            fixture.unreadable = checked.unreadable;
        }
        Err(err) => fixture.record_error(&err),
    }
    fixture
}
