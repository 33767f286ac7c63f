//! Filtering, copying, and rechecking submission entries against the roster.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use grader::io::files::{copy_dir_recursive, file_name, list_entries};
use tracing::{info, instrument, warn};

use crate::roster::Student;

/// Top-level entries (directories or files) in the submissions folder, sorted.
pub fn list_submissions(dir: &Path) -> Result<Vec<PathBuf>> {
    list_entries(dir)
}

/// Entries whose name matches at least one roster student.
pub fn filter_submissions(students: &[Student], entries: &[PathBuf]) -> Vec<PathBuf> {
    entries
        .iter()
        .filter(|entry| {
            let name = file_name(entry);
            students.iter().any(|student| student.matches(&name))
        })
        .cloned()
        .collect()
}

/// Roster students with no matching entry, in roster order.
pub fn missing_students<'a>(students: &'a [Student], entries: &[PathBuf]) -> Vec<&'a Student> {
    let names: Vec<String> = entries.iter().map(|entry| file_name(entry)).collect();
    students
        .iter()
        .filter(|student| !names.iter().any(|name| student.matches(name)))
        .collect()
}

/// Log one warning per missing student and return how many were missing.
pub fn report_missing(students: &[Student], entries: &[PathBuf]) -> usize {
    let missing = missing_students(students, entries);
    for student in &missing {
        warn!(id = %student.id, name = %student.full_name(), "{} -> {}", student.id, student.full_name());
    }
    missing.len()
}

/// Copy each entry into `destination`, keeping its name.
///
/// An entry that already exists at the destination is replaced.
#[instrument(skip_all, fields(destination = %destination.display()))]
pub fn copy_submissions(destination: &Path, entries: &[PathBuf]) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(destination)
        .with_context(|| format!("create {}", destination.display()))?;
    let mut copied = Vec::with_capacity(entries.len());
    for entry in entries {
        let target = destination.join(file_name(entry));
        remove_existing(&target)?;
        if entry.is_dir() {
            copy_dir_recursive(entry, &target)?;
        } else {
            fs::copy(entry, &target).with_context(|| {
                format!("copy {} to {}", entry.display(), target.display())
            })?;
        }
        copied.push(target);
    }
    info!(count = copied.len(), "copied submissions");
    Ok(copied)
}

fn remove_existing(path: &Path) -> Result<()> {
    if path.is_dir() {
        fs::remove_dir_all(path).with_context(|| format!("remove {}", path.display()))?;
    } else if path.exists() {
        fs::remove_file(path).with_context(|| format!("remove {}", path.display()))?;
    }
    Ok(())
}
