//! Zip extraction for copied submissions.
//!
//! Every `.zip` found beneath the root is unpacked into its own directory.
//! Archives are collected before extraction starts, so zips that appear from
//! extraction are left packed.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use grader::io::files::{has_extension, list_files_recursive};
use tracing::{debug, info, instrument, warn};
use zip::ZipArchive;

/// Archives found under a root, split by whether they could be unpacked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub unpacked: Vec<PathBuf>,
    pub failed: Vec<PathBuf>,
}

/// Extract all archives under `root`.
///
/// A corrupt archive is logged and skipped; the rest are still unpacked.
#[instrument(skip_all, fields(root = %root.display()))]
pub fn extract_all(root: &Path) -> Result<Extraction> {
    let archives: Vec<PathBuf> = list_files_recursive(root)?
        .into_iter()
        .filter(|path| has_extension(path, "zip"))
        .collect();

    let mut extraction = Extraction::default();
    for archive in archives {
        let Some(parent) = archive.parent() else {
            continue;
        };
        match extract_into(&archive, parent) {
            Ok(count) => {
                info!(archive = %archive.display(), entries = count, "unzipped");
                extraction.unpacked.push(archive);
            }
            Err(err) => {
                warn!(archive = %archive.display(), err = %format!("{err:#}"), "could not unzip");
                extraction.failed.push(archive);
            }
        }
    }
    Ok(extraction)
}

/// Unpack `archive` into `destination`, returning the number of files written.
///
/// Entries whose names would escape `destination` are skipped.
pub fn extract_into(archive: &Path, destination: &Path) -> Result<usize> {
    let file = File::open(archive).with_context(|| format!("open {}", archive.display()))?;
    let mut zip =
        ZipArchive::new(file).with_context(|| format!("read archive {}", archive.display()))?;

    let mut written = 0;
    for idx in 0..zip.len() {
        let mut entry = zip
            .by_index(idx)
            .with_context(|| format!("read entry {idx} of {}", archive.display()))?;
        let Some(relative) = entry.enclosed_name() else {
            warn!(archive = %archive.display(), entry = %entry.name(), "skipping unsafe entry path");
            continue;
        };
        let target = destination.join(relative);
        if entry.is_dir() {
            fs::create_dir_all(&target).with_context(|| format!("create {}", target.display()))?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        let mut out =
            File::create(&target).with_context(|| format!("create {}", target.display()))?;
        io::copy(&mut entry, &mut out).with_context(|| format!("write {}", target.display()))?;
        debug!(file = %target.display(), "extracted");
        written += 1;
    }
    Ok(written)
}
