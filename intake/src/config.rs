//! Intake paths resolved from the command line.

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};

/// Where submissions come from and where the filtered copies go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakeConfig {
    pub submissions_dir: PathBuf,
    pub roster_path: PathBuf,
    pub output_dir: PathBuf,
}

impl IntakeConfig {
    /// Build the config, defaulting the output to `<submissions>_filtered` beside the input.
    pub fn new(
        submissions_dir: PathBuf,
        roster_path: PathBuf,
        output_dir: Option<PathBuf>,
    ) -> Result<Self> {
        let output_dir = match output_dir {
            Some(dir) => dir,
            None => default_output_dir(&submissions_dir)?,
        };
        let cfg = Self {
            submissions_dir,
            roster_path,
            output_dir,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.submissions_dir.is_dir() {
            bail!(
                "submissions directory {} not found",
                self.submissions_dir.display()
            );
        }
        if !self.roster_path.is_file() {
            bail!("roster {} not found", self.roster_path.display());
        }
        if self.output_dir == self.submissions_dir {
            bail!("output directory must differ from the submissions directory");
        }
        Ok(())
    }
}

fn default_output_dir(submissions_dir: &Path) -> Result<PathBuf> {
    let Some(name) = submissions_dir.file_name() else {
        bail!(
            "cannot derive an output directory from {}",
            submissions_dir.display()
        );
    };
    let name = format!("{}_filtered", name.to_string_lossy());
    Ok(submissions_dir.with_file_name(name))
}
