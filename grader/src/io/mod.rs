//! I/O helpers for grading: config, filesystem, processes, reports.

pub mod config;
pub mod files;
pub mod process;
pub mod report;
pub mod workspace;
