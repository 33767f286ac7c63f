//! Student roster loading and name matching.

use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

/// One roster row. Extra CSV columns are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Student {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
}

impl Student {
    /// A submission belongs to a student when both names occur in its entry name.
    pub fn matches(&self, entry_name: &str) -> bool {
        entry_name.contains(&self.first_name) && entry_name.contains(&self.last_name)
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

pub fn load_roster(path: &Path) -> Result<Vec<Student>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("open roster {}", path.display()))?;
    let mut students = Vec::new();
    for (idx, row) in reader.deserialize::<Student>().enumerate() {
        let student =
            row.with_context(|| format!("parse roster {} row {}", path.display(), idx + 1))?;
        if student.first_name.is_empty() || student.last_name.is_empty() {
            bail!(
                "roster {} row {}: first_name and last_name must be non-empty",
                path.display(),
                idx + 1
            );
        }
        students.push(student);
    }
    Ok(students)
}
