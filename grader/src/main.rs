//! Grade one submission.
//!
//! Copies the submission sources and the fixture directories into
//! `<submission>/grading/`, compiles, runs the program in every fixture, checks
//! the keyword updates, and finishes with a memory check.

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use clap::Parser;
use grader::core::verify::CountPolicy;
use grader::exit_codes;
use grader::grade::{GradingSummary, run_grading};
use grader::io::config::{GraderConfig, load_config};
use tracing::debug;

const DEFAULT_CONFIG: &str = "grader.toml";

#[derive(Parser)]
#[command(
    name = "grader",
    version,
    about = "Compile, run, and check a keyword-transformation submission"
)]
struct Cli {
    /// Submission source directory.
    source_dir: PathBuf,

    /// Config file (TOML). Defaults to `grader.toml` in the current directory when present.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Keyword to pass to the program and check for.
    #[arg(long)]
    keyword: Option<String>,

    /// Directory of fixture tests (one sub-directory per test).
    #[arg(long)]
    fixtures: Option<PathBuf>,

    /// Skip files whose keyword-token counts differ instead of comparing a prefix.
    #[arg(long)]
    strict: bool,
}

fn main() {
    grader::logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let cfg = resolve_config(&cli)?;
    debug!(config = ?cfg, "config loaded");

    let summary = run_grading(&cfg, &cli.source_dir)?;
    print_summary(&summary);
    if !summary.compiled() {
        return Ok(exit_codes::COMPILATION_FAILED);
    }
    Ok(exit_codes::OK)
}

fn resolve_config(cli: &Cli) -> Result<GraderConfig> {
    let mut cfg = match &cli.config {
        Some(path) => {
            if !path.exists() {
                bail!("config {} not found", path.display());
            }
            load_config(path)?
        }
        None => load_config(Path::new(DEFAULT_CONFIG))?,
    };
    if let Some(keyword) = &cli.keyword {
        cfg.keyword = keyword.clone();
    }
    if let Some(fixtures) = &cli.fixtures {
        cfg.fixtures_dir = fixtures.clone();
    }
    if cli.strict {
        cfg.count_policy = CountPolicy::Strict;
    }
    cfg.validate()?;
    Ok(cfg)
}

fn print_summary(summary: &GradingSummary) {
    println!(
        "grade: student={} compiled={} report={}",
        summary.student,
        summary.compiled(),
        summary.compilation.report.display()
    );
    if !summary.compiled() {
        return;
    }
    for fixture in &summary.fixtures {
        println!(
            "grade: fixture={} return_code={:?} termination={:?} files={}",
            fixture.name,
            fixture.run.return_code,
            fixture.run.termination,
            fixture.files.len()
        );
        for err in &fixture.errors {
            println!("grade:   error: {err}");
        }
        for file in &fixture.unreadable {
            println!("grade:   {} unreadable: {}", file.file_name, file.error);
        }
        for file in &fixture.files {
            let verification = &file.verification;
            println!(
                "grade:   {} verdict={:?} correct={} missed={} misaligned={} words={}",
                file.file_name,
                file.verdict,
                verification.correct_updates,
                verification.missed_updates,
                verification.alignment_errors.len(),
                verification.original_candidates
            );
        }
    }
    let totals = summary.totals();
    println!(
        "grade: files={} clean={} correct={} missed={} misaligned={} count_mismatches={} failed_runs={} fixture_errors={} unreadable={}",
        totals.files,
        totals.clean_files,
        totals.correct_updates,
        totals.missed_updates,
        totals.alignment_errors,
        totals.count_mismatches,
        totals.failed_runs,
        totals.fixture_errors,
        totals.unreadable_files
    );
    if let Some(memcheck) = &summary.memcheck {
        let report = memcheck
            .report
            .as_ref()
            .map_or_else(|| "none".to_string(), |path| path.display().to_string());
        println!(
            "grade: memcheck={} report={}",
            if memcheck.clean { "NO_ERRORS" } else { "ERRORS" },
            report
        );
        if let Some(err) = &memcheck.error {
            println!("grade: memcheck error: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_positional_source_dir() {
        let cli = Cli::parse_from(["grader", "subs/jane_doe"]);
        assert_eq!(cli.source_dir, PathBuf::from("subs/jane_doe"));
        assert!(cli.config.is_none());
        assert!(!cli.strict);
    }

    #[test]
    fn overrides_apply_on_top_of_config() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("grader.toml");
        std::fs::write(&path, "keyword = \"pear\"\n").expect("config");
        let config_arg = path.display().to_string();

        let cli = Cli::parse_from([
            "grader",
            "subs/jane_doe",
            "--config",
            config_arg.as_str(),
            "--fixtures",
            "fx",
            "--strict",
        ]);
        let cfg = resolve_config(&cli).expect("config");
        assert_eq!(cfg.keyword, "pear");
        assert_eq!(cfg.fixtures_dir, PathBuf::from("fx"));
        assert_eq!(cfg.count_policy, CountPolicy::Strict);
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let cli = Cli::parse_from(["grader", "x", "--config", "/definitely/missing.toml"]);
        assert!(resolve_config(&cli).is_err());
    }
}
