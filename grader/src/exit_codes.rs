//! Stable exit codes for the grader and intake CLIs.

/// Grading ran to completion (individual fixtures may still have failed).
pub const OK: i32 = 0;
/// Invalid arguments/config, or an I/O error during setup.
pub const INVALID: i32 = 1;
/// The submission did not compile; nothing after compilation ran.
pub const COMPILATION_FAILED: i32 = 2;
