//! Automated grading of keyword-transformation assignments.
//!
//! Students write a C program that uppercases every occurrence of a keyword in
//! the text files of its working directory. The grader compiles a submission,
//! runs it in a copy of every fixture directory, and checks each output file
//! occurrence by occurrence against the pristine fixture. The architecture
//! keeps a strict separation:
//!
//! - **[`core`]**: Pure, deterministic verification (tokenizing, keyword
//!   matching, per-occurrence scoring). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (config, filesystem, process
//!   execution, reports).
//!
//! Orchestration modules ([`grade`], [`discover`]) coordinate core logic with
//! I/O to implement the CLI.

pub mod core;
pub mod discover;
pub mod exit_codes;
pub mod grade;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
