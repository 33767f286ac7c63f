//! Prepare raw submissions for grading.
//!
//! Keeps the submissions that belong to roster students, reports students with
//! no submission, copies the kept entries into a working folder, checks that
//! folder against the roster again, and unzips any archives inside it.

mod archive;
mod config;
mod roster;
mod submissions;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use grader::exit_codes;
use tracing::{info, warn};

use crate::config::IntakeConfig;
use crate::roster::load_roster;
use crate::submissions::{copy_submissions, filter_submissions, list_submissions, report_missing};

#[derive(Parser)]
#[command(name = "intake", version, about = "Filter, copy, and unzip submissions for grading")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Filter, copy, recheck, and unzip submissions.
    Prepare(PathArgs),
    /// Only report roster students with no submission.
    Missing(PathArgs),
}

#[derive(Args)]
struct PathArgs {
    /// Folder with one entry per submission.
    #[arg(long)]
    submissions: PathBuf,
    /// Roster CSV with `id`, `first_name`, `last_name` columns.
    #[arg(long)]
    roster: PathBuf,
    /// Working folder. Defaults to `<submissions>_filtered` beside the input.
    #[arg(long)]
    output: Option<PathBuf>,
}

impl PathArgs {
    fn into_config(self) -> Result<IntakeConfig> {
        IntakeConfig::new(self.submissions, self.roster, self.output)
    }
}

fn main() {
    grader::logging::init();
    let cli = Cli::parse();
    let result = match cli.command {
        Command::Prepare(args) => args.into_config().and_then(|cfg| prepare(&cfg)),
        Command::Missing(args) => args.into_config().and_then(|cfg| missing(&cfg)),
    };
    if let Err(err) = result {
        eprintln!("{:#}", err);
        std::process::exit(exit_codes::INVALID);
    }
}

fn prepare(cfg: &IntakeConfig) -> Result<()> {
    let entries = list_submissions(&cfg.submissions_dir)?;
    info!("found {} submissions", entries.len());

    let students = load_roster(&cfg.roster_path)?;
    info!("assigned {} students for grading", students.len());

    let kept = filter_submissions(&students, &entries);
    info!("filtered submissions based on assigned students: {}", kept.len());

    info!("missing submissions for the following students:");
    report_missing(&students, &kept);

    let copied = copy_submissions(&cfg.output_dir, &kept)?;
    info!(
        "moving submissions to {}: {}",
        cfg.output_dir.display(),
        copied.len()
    );

    let staged = list_submissions(&cfg.output_dir)?;
    info!(
        "submissions for grading in {}: {}",
        cfg.output_dir.display(),
        staged.len()
    );
    warn!("missing students for grading:");
    let missing = report_missing(&students, &staged);

    let extraction = archive::extract_all(&cfg.output_dir)?;
    info!(
        "unzipped {} archives in {}",
        extraction.unpacked.len(),
        cfg.output_dir.display()
    );
    for failed in &extraction.failed {
        warn!("could not unzip {}, check it by hand", failed.display());
    }
    println!(
        "intake: submissions={} kept={} missing={} unzipped={} unzip_failed={} output={}",
        entries.len(),
        copied.len(),
        missing,
        extraction.unpacked.len(),
        extraction.failed.len(),
        cfg.output_dir.display()
    );
    Ok(())
}

fn missing(cfg: &IntakeConfig) -> Result<()> {
    let entries = list_submissions(&cfg.submissions_dir)?;
    let students = load_roster(&cfg.roster_path)?;
    let missing = report_missing(&students, &entries);
    println!(
        "intake: students={} submissions={} missing={}",
        students.len(),
        entries.len(),
        missing
    );
    Ok(())
}
