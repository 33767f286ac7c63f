//! File-pair discovery for one fixture test.
//!
//! Pairs each file the program left in its fixture copy with the pristine
//! original of the same name, then runs the keyword verification on every pair.
//! Files are matched by final path segment only.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use crate::core::keyword::Keyword;
use crate::core::verify::{CountPolicy, FileVerdict, Verification, verify};
use crate::io::config::GraderConfig;
use crate::io::files::{file_name, has_extension, list_files_recursive};

/// Names that never count as fixture output.
#[derive(Debug, Clone)]
pub struct ExclusionFilter<'a> {
    pub binary_name: &'a str,
    /// The per-run report, `<fixture>.txt`.
    pub report_name: String,
    pub metadata_files: &'a [String],
    pub extension: &'a str,
}

impl<'a> ExclusionFilter<'a> {
    pub fn for_fixture(cfg: &'a GraderConfig, fixture: &str) -> Self {
        Self {
            binary_name: &cfg.binary_name,
            report_name: format!("{fixture}.txt"),
            metadata_files: &cfg.metadata_files,
            extension: &cfg.verify_extension,
        }
    }

    pub fn accepts(&self, path: &Path) -> bool {
        let name = file_name(path);
        if name == self.binary_name || name == self.report_name {
            return false;
        }
        if name.starts_with("._") || self.metadata_files.iter().any(|meta| *meta == name) {
            return false;
        }
        has_extension(path, self.extension)
    }
}

/// Sorted files under `dir` that pass `filter`.
pub fn list_candidates(dir: &Path, filter: &ExclusionFilter<'_>) -> Result<Vec<PathBuf>> {
    Ok(list_files_recursive(dir)?
        .into_iter()
        .filter(|path| filter.accepts(path))
        .collect())
}

/// Pair files with identical final path segments.
///
/// Every modified file is paired with every original of the same name, in
/// listing order.
pub fn pair_by_name(originals: &[PathBuf], modified: &[PathBuf]) -> Vec<(PathBuf, PathBuf)> {
    let mut pairs = Vec::new();
    for changed in modified {
        let name = file_name(changed);
        let mut matched = false;
        for original in originals.iter().filter(|original| file_name(original) == name) {
            pairs.push((original.clone(), changed.clone()));
            matched = true;
        }
        if !matched {
            debug!(file = %name, "no original counterpart");
        }
    }
    pairs
}

/// Verification result for one (original, modified) file pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCheck {
    pub file_name: String,
    pub original: PathBuf,
    pub modified: PathBuf,
    pub verdict: FileVerdict,
    pub verification: Verification,
}

/// A paired file that could not be read, so it was not verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreadableFile {
    pub file_name: String,
    pub original: PathBuf,
    pub modified: PathBuf,
    pub error: String,
}

/// Outcome of verifying one fixture directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixtureCheck {
    pub files: Vec<FileCheck>,
    pub unreadable: Vec<UnreadableFile>,
}

/// Verify every file the program left in `modified_dir` against `original_dir`.
///
/// Errors only when a directory cannot be listed. A file that cannot be read
/// is recorded in `unreadable` and the remaining pairs are still checked.
#[instrument(skip_all, fields(fixture = %fixture))]
pub fn check_fixture(
    fixture: &str,
    original_dir: &Path,
    modified_dir: &Path,
    cfg: &GraderConfig,
    keyword: &Keyword,
) -> Result<FixtureCheck> {
    let filter = ExclusionFilter::for_fixture(cfg, fixture);
    let originals = list_candidates(original_dir, &filter)?;
    let modified = list_candidates(modified_dir, &filter)?;

    info!("checking test directory");
    Ok(check_pairs(
        pair_by_name(&originals, &modified),
        keyword,
        cfg.count_policy,
    ))
}

/// Verify each pair, collecting unreadable files instead of stopping.
pub fn check_pairs(
    pairs: Vec<(PathBuf, PathBuf)>,
    keyword: &Keyword,
    policy: CountPolicy,
) -> FixtureCheck {
    let mut checked = FixtureCheck::default();
    for (original, changed) in pairs {
        match check_pair(&original, &changed, keyword, policy) {
            Ok(check) => checked.files.push(check),
            Err(err) => {
                let error = format!("{err:#}");
                let name = file_name(&changed);
                error!(file = %name, err = %error, "could not verify file");
                checked.unreadable.push(UnreadableFile {
                    file_name: name,
                    original,
                    modified: changed,
                    error,
                });
            }
        }
    }
    checked
}

/// Verify one file pair and log the outcome.
pub fn check_pair(
    original: &Path,
    modified: &Path,
    keyword: &Keyword,
    policy: CountPolicy,
) -> Result<FileCheck> {
    let name = file_name(modified);
    let before = read_text(original)?;
    let after = read_text(modified)?;
    let verification = verify(&before, &after, keyword, policy);

    for misaligned in &verification.alignment_errors {
        error!(
            file = %name,
            pair = misaligned.pair_index,
            original = %misaligned.original_token,
            modified = %misaligned.modified_token,
            "starting indices of modified keywords do not match"
        );
    }
    for missed in &verification.missed {
        debug!(file = %name, span = %missed.span, "missed update");
    }
    if let Some(mismatch) = verification.count_mismatch {
        warn!(
            file = %name,
            original = mismatch.original,
            modified = mismatch.modified,
            policy = ?policy,
            "candidate token counts differ"
        );
    }
    info!(
        file = %name,
        correct = verification.correct_updates,
        missed = verification.missed_updates,
        words = verification.original_candidates,
        "{} correct updates, {} missed updates, for {} words",
        verification.correct_updates,
        verification.missed_updates,
        verification.original_candidates
    );

    Ok(FileCheck {
        file_name: name,
        original: original.to_path_buf(),
        modified: modified.to_path_buf(),
        verdict: verification.verdict(),
        verification,
    })
}

fn read_text(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(path: &Path, contents: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("parent");
        }
        fs::write(path, contents).expect("write");
    }

    #[test]
    fn filter_excludes_binary_report_and_metadata() {
        let cfg = GraderConfig::default();
        let filter = ExclusionFilter::for_fixture(&cfg, "T1");
        assert!(filter.accepts(Path::new("dir/notes.txt")));
        assert!(!filter.accepts(Path::new("dir/T1.txt")));
        assert!(!filter.accepts(Path::new("dir/a.out")));
        assert!(!filter.accepts(Path::new("dir/.DS_Store")));
        assert!(!filter.accepts(Path::new("dir/._notes.txt")));
        assert!(!filter.accepts(Path::new("dir/image.png")));
    }

    #[test]
    fn pairs_by_final_segment_only() {
        let originals = vec![
            PathBuf::from("/fixtures/T1/a.txt"),
            PathBuf::from("/fixtures/T1/sub/b.txt"),
        ];
        let modified = vec![
            PathBuf::from("/work/T1/a.txt"),
            PathBuf::from("/work/T1/other/b.txt"),
            PathBuf::from("/work/T1/new.txt"),
        ];
        let pairs = pair_by_name(&originals, &modified);
        assert_eq!(
            pairs,
            vec![
                (originals[0].clone(), modified[0].clone()),
                (originals[1].clone(), modified[1].clone()),
            ]
        );
    }

    #[test]
    fn checks_every_pair_in_a_fixture() {
        let temp = tempdir().expect("tempdir");
        let original = temp.path().join("fixtures/T1");
        let modified = temp.path().join("work/T1");
        write(&original.join("a.txt"), "an apple a day");
        write(&original.join("deep/b.txt"), "ApplePie appleapple");
        write(&modified.join("a.txt"), "an APPLE a day");
        write(&modified.join("deep/b.txt"), "ApplePie APPLEAPPLE");
        write(&modified.join("T1.txt"), "TEST RETURN CODE: 0");
        write(&modified.join("a.out"), "binary");

        let cfg = GraderConfig::default();
        let keyword = cfg.keyword().expect("keyword");
        let checked = check_fixture("T1", &original, &modified, &cfg, &keyword).expect("checks");
        assert!(checked.unreadable.is_empty());
        let checks = checked.files;

        assert_eq!(checks.len(), 2);
        assert_eq!(checks[0].file_name, "a.txt");
        assert_eq!(checks[0].verdict, FileVerdict::Clean);
        assert_eq!(checks[1].file_name, "b.txt");
        assert_eq!(checks[1].verification.correct_updates, 2);
        assert_eq!(checks[1].verification.missed_updates, 1);
        assert_eq!(checks[1].verdict, FileVerdict::MissedUpdates);
    }

    #[test]
    fn unreadable_file_is_recorded_and_later_pairs_still_checked() {
        let temp = tempdir().expect("tempdir");
        let original = temp.path().join("fixtures/T1");
        let modified = temp.path().join("work/T1");
        write(&original.join("a.txt"), "apple");
        write(&original.join("b.txt"), "apple pie");
        write(&modified.join("b.txt"), "APPLE pie");

        let keyword = Keyword::new("apple").expect("keyword");
        let pairs = vec![
            (original.join("a.txt"), modified.join("a.txt")),
            (original.join("b.txt"), modified.join("b.txt")),
        ];
        let checked = check_pairs(pairs, &keyword, CountPolicy::Truncate);

        assert_eq!(checked.unreadable.len(), 1);
        assert_eq!(checked.unreadable[0].file_name, "a.txt");
        assert!(checked.unreadable[0].error.contains("read"));
        assert_eq!(checked.files.len(), 1);
        assert_eq!(checked.files[0].verdict, FileVerdict::Clean);
    }

    #[test]
    fn invalid_utf8_is_read_lossily() {
        let temp = tempdir().expect("tempdir");
        let original = temp.path().join("a.txt");
        let modified = temp.path().join("b.txt");
        fs::write(&original, b"apple \xff").expect("original");
        fs::write(&modified, b"APPLE \xff").expect("modified");
        let keyword = Keyword::new("apple").expect("keyword");
        let check = check_pair(&original, &modified, &keyword, CountPolicy::Truncate)
            .expect("check");
        assert_eq!(check.verdict, FileVerdict::Clean);
    }
}
