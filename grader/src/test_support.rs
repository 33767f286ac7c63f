//! Test-only helpers for building submissions, fixtures, and a fake toolchain.
//!
//! The fake compiler copies the first source file to the output path and marks
//! it executable, so a "C source" written as a shell script becomes the program
//! under test. This keeps pipeline tests independent of gcc and valgrind.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;

use crate::io::config::GraderConfig;

/// Program that uppercases every `.txt` file beneath its working directory.
pub const UPPERCASE_PROGRAM: &str = "#!/bin/sh
find . -type f -name '*.txt' | while read -r f; do
  tr '[:lower:]' '[:upper:]' < \"$f\" > \"$f.tmp\" && mv \"$f.tmp\" \"$f\"
done
";

/// Program that leaves files untouched and exits with an error.
pub const LAZY_PROGRAM: &str = "#!/bin/sh
echo \"not implemented: $1\" >&2
exit 1
";

/// Program that deletes the directory it was started in.
pub const SELF_DESTRUCTING_PROGRAM: &str = "#!/bin/sh
d=$(pwd); cd ..; rm -rf \"$d\"
";

/// Program that never finishes on its own.
pub const HANGING_PROGRAM: &str = "#!/bin/sh
exec sleep 30
";

/// Compiler stand-in: `cat <first source> > <last arg>; chmod +x <last arg>`.
pub fn fake_compiler() -> Vec<String> {
    vec![
        "sh".to_string(),
        "-c".to_string(),
        "for last; do :; done; cat \"$1\" > \"$last\" && chmod +x \"$last\"".to_string(),
        "cc".to_string(),
    ]
}

/// Compiler stand-in that always fails with a diagnostic on stderr.
pub fn failing_compiler() -> Vec<String> {
    vec![
        "sh".to_string(),
        "-c".to_string(),
        "echo 'main.c:1:1: error: expected declaration' >&2; exit 1".to_string(),
        "cc".to_string(),
    ]
}

/// Memory checker stand-in reporting `errors` errors in valgrind's format.
pub fn fake_memcheck(errors: usize) -> Vec<String> {
    vec![
        "sh".to_string(),
        "-c".to_string(),
        format!("echo '==1== ERROR SUMMARY: {errors} errors from {errors} contexts' >&2"),
        "memcheck".to_string(),
    ]
}

/// A temporary tree with a fixtures directory and one submission directory.
pub struct GradingSandbox {
    temp: TempDir,
    pub fixtures_dir: PathBuf,
    pub submission_dir: PathBuf,
}

impl GradingSandbox {
    pub fn new() -> Result<Self> {
        let temp = tempfile::tempdir().context("create tempdir")?;
        let fixtures_dir = temp.path().join("test_folders");
        let submission_dir = temp.path().join("submissions").join("jane_doe_1234");
        fs::create_dir_all(&fixtures_dir).context("create fixtures dir")?;
        fs::create_dir_all(&submission_dir).context("create submission dir")?;
        Ok(Self {
            temp,
            fixtures_dir,
            submission_dir,
        })
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    /// Write `contents` to `<fixtures>/<fixture>/<relative>`.
    pub fn add_fixture_file(&self, fixture: &str, relative: &str, contents: &str) -> Result<PathBuf> {
        write_file(&self.fixtures_dir.join(fixture).join(relative), contents)
    }

    /// Write a top-level file into the submission.
    pub fn add_source(&self, name: &str, contents: &str) -> Result<PathBuf> {
        write_file(&self.submission_dir.join(name), contents)
    }

    /// Config pointing at this sandbox's fixtures with the given tool stand-ins.
    pub fn config(&self, compiler: Vec<String>, memcheck: Vec<String>) -> GraderConfig {
        let mut cfg = GraderConfig {
            fixtures_dir: self.fixtures_dir.clone(),
            ..GraderConfig::default()
        };
        cfg.compiler.command = compiler;
        cfg.memcheck.command = memcheck;
        cfg.timeouts.test_secs = 5;
        cfg.timeouts.compile_secs = 10;
        cfg.timeouts.memcheck_secs = 10;
        cfg
    }

    /// `<submission>/grading`.
    pub fn grading_dir(&self) -> PathBuf {
        self.submission_dir.join("grading")
    }
}

fn write_file(path: &Path, contents: &str) -> Result<PathBuf> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("write {}", path.display()))?;
    Ok(path.to_path_buf())
}
