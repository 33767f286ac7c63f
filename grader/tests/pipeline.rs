//! End-to-end grading runs against a scripted toolchain.
//!
//! The "C sources" here are shell scripts and the compiler is a stand-in that
//! copies them into place, so these tests exercise workspace setup, reports,
//! fixture discovery, and verification without gcc or valgrind.

use std::fs;

use grader::core::verify::FileVerdict;
use grader::grade::run_grading;
use grader::io::process::Termination;
use grader::test_support::{
    GradingSandbox, HANGING_PROGRAM, LAZY_PROGRAM, SELF_DESTRUCTING_PROGRAM, UPPERCASE_PROGRAM,
    failing_compiler, fake_compiler, fake_memcheck,
};

fn sandbox_with_fixtures() -> GradingSandbox {
    let sandbox = GradingSandbox::new().expect("sandbox");
    sandbox
        .add_fixture_file("T1", "a.txt", "An apple a day\nApplePie and appleapple\n")
        .expect("a");
    sandbox
        .add_fixture_file("T1", "b.txt", "no fruit here\n")
        .expect("b");
    sandbox
        .add_fixture_file("T2", "nested/c.txt", "pineapple   apple\n")
        .expect("c");
    sandbox
        .add_fixture_file("T2", ".DS_Store", "meta")
        .expect("meta");
    sandbox
}

#[test]
fn correct_submission_updates_every_occurrence() {
    let sandbox = sandbox_with_fixtures();
    sandbox.add_source("main.c", UPPERCASE_PROGRAM).expect("main");
    sandbox.add_source("readme.txt", "my notes").expect("readme");
    let cfg = sandbox.config(fake_compiler(), fake_memcheck(0));

    let summary = run_grading(&cfg, &sandbox.submission_dir).expect("grading");

    let grading = sandbox.grading_dir();
    assert!(summary.compiled());
    assert!(grading.join("SUCCESSFUL_compilation.txt").exists());
    assert!(grading.join("readme.txt").exists());
    assert_eq!(summary.student, "jane");

    let names: Vec<&str> = summary.fixtures.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["T1", "T2"]);

    let t1 = &summary.fixtures[0];
    assert!(t1.run.success());
    let files: Vec<&str> = t1.files.iter().map(|f| f.file_name.as_str()).collect();
    assert_eq!(files, vec!["a.txt", "b.txt"]);
    assert_eq!(t1.files[0].verification.correct_updates, 4);
    assert_eq!(t1.files[1].verification.original_candidates, 0);
    assert!(t1.files.iter().all(|f| f.verdict == FileVerdict::Clean));

    let report = fs::read_to_string(grading.join("test_dirs/T1/T1.txt")).expect("test report");
    assert!(report.starts_with("TEST RETURN CODE: 0\n\n"));

    let totals = summary.totals();
    assert_eq!(totals.files, 3);
    assert_eq!(totals.correct_updates, 6);
    assert_eq!(totals.missed_updates, 0);
    assert_eq!(totals.failed_runs, 0);

    let memcheck = summary.memcheck.as_ref().expect("memcheck ran");
    assert!(memcheck.clean);
    assert!(grading.join("NO_ERRORS_memcheck.txt").exists());
    assert!(grading.join("summary.json").exists());
}

#[test]
fn failing_program_is_recorded_and_grading_continues() {
    let sandbox = sandbox_with_fixtures();
    sandbox.add_source("main.c", LAZY_PROGRAM).expect("main");
    let cfg = sandbox.config(fake_compiler(), fake_memcheck(3));

    let summary = run_grading(&cfg, &sandbox.submission_dir).expect("grading");

    assert!(summary.compiled());
    assert_eq!(summary.fixtures.len(), 2);
    let t1 = &summary.fixtures[0];
    assert_eq!(t1.run.return_code, Some(1));
    assert!(t1.run.stderr.contains("not implemented: apple"));

    let totals = summary.totals();
    assert_eq!(totals.failed_runs, 2);
    assert_eq!(totals.correct_updates, 0);
    assert_eq!(totals.missed_updates, 6);

    let memcheck = summary.memcheck.as_ref().expect("memcheck ran");
    assert!(!memcheck.clean);
    assert!(sandbox.grading_dir().join("ERRORS_memcheck.txt").exists());
}

#[test]
fn compilation_failure_stops_before_tests() {
    let sandbox = sandbox_with_fixtures();
    sandbox.add_source("main.c", "int main(void) {").expect("main");
    let cfg = sandbox.config(failing_compiler(), fake_memcheck(0));

    let summary = run_grading(&cfg, &sandbox.submission_dir).expect("grading");

    assert!(!summary.compiled());
    assert!(summary.fixtures.is_empty());
    assert!(summary.memcheck.is_none());

    let grading = sandbox.grading_dir();
    let report = fs::read_to_string(grading.join("FAILED_compilation.txt")).expect("report");
    assert!(report.starts_with("COMPILATION RETURN CODE: 1\n\n"));
    assert!(report.contains("error: expected declaration"));
    assert!(!grading.join("test_dirs/T1/T1.txt").exists());
    assert!(grading.join("summary.json").exists());
}

#[test]
fn hanging_program_is_killed_after_timeout() {
    let sandbox = GradingSandbox::new().expect("sandbox");
    sandbox
        .add_fixture_file("T1", "a.txt", "apple\n")
        .expect("a");
    sandbox.add_source("main.c", HANGING_PROGRAM).expect("main");
    let mut cfg = sandbox.config(fake_compiler(), fake_memcheck(0));
    cfg.timeouts.test_secs = 1;

    let summary = run_grading(&cfg, &sandbox.submission_dir).expect("grading");

    let t1 = &summary.fixtures[0];
    assert_eq!(t1.run.termination, Termination::TimedOut);
    assert_eq!(t1.files[0].verification.missed_updates, 1);
    let report =
        fs::read_to_string(sandbox.grading_dir().join("test_dirs/T1/T1.txt")).expect("report");
    assert!(report.contains("killed after timeout"));
    assert!(summary.memcheck.is_some());
}

#[test]
fn program_that_removes_its_fixture_does_not_stop_grading() {
    let sandbox = sandbox_with_fixtures();
    sandbox.add_source("main.c", SELF_DESTRUCTING_PROGRAM).expect("main");
    let cfg = sandbox.config(fake_compiler(), fake_memcheck(0));

    let summary = run_grading(&cfg, &sandbox.submission_dir).expect("grading");

    let grading = sandbox.grading_dir();
    assert!(!grading.join("test_dirs/T1").exists());
    let names: Vec<&str> = summary.fixtures.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["T1", "T2"]);
    for fixture in &summary.fixtures {
        assert!(fixture.run.success());
        assert!(fixture.report.is_none());
        assert!(fixture.files.is_empty());
        assert!(fixture.has_errors());
        assert!(fixture.errors[0].contains("write report"));
    }
    assert_eq!(summary.totals().fixture_errors, 2);

    let memcheck = summary.memcheck.as_ref().expect("memcheck ran");
    assert!(memcheck.clean);
    assert!(grading.join("NO_ERRORS_memcheck.txt").exists());
    assert!(grading.join("summary.json").exists());
}

#[test]
fn failed_recompile_clears_outputs_of_previous_run() {
    let sandbox = sandbox_with_fixtures();
    sandbox.add_source("main.c", UPPERCASE_PROGRAM).expect("main");
    let grading = sandbox.grading_dir();

    let first = run_grading(
        &sandbox.config(fake_compiler(), fake_memcheck(0)),
        &sandbox.submission_dir,
    )
    .expect("first run");
    assert!(first.compiled());
    assert!(grading.join("a.out").exists());
    assert!(grading.join("NO_ERRORS_memcheck.txt").exists());

    let second = run_grading(
        &sandbox.config(failing_compiler(), fake_memcheck(0)),
        &sandbox.submission_dir,
    )
    .expect("second run");
    assert!(!second.compiled());
    assert!(grading.join("FAILED_compilation.txt").exists());
    assert!(!grading.join("SUCCESSFUL_compilation.txt").exists());
    assert!(!grading.join("NO_ERRORS_memcheck.txt").exists());
    assert!(!grading.join("ERRORS_memcheck.txt").exists());
    assert!(!grading.join("a.out").exists());

    let summary = fs::read_to_string(grading.join("summary.json")).expect("summary");
    assert!(summary.contains("\"memcheck\": null"));
}
