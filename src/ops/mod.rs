//! High-level operations.
//!
//! This module contains what the host and the command line ask of a file or
//! manifest: the actions it offers, what it builds into, and test builds.

pub mod file_context;
pub mod file_scan;
pub mod test_build;

pub use file_context::{file_contexts, ContextKind, FileContext};
pub use file_scan::{is_up_to_date, output_references, target_info, OutputReference};
pub use test_build::{build_tests, TestBuildOutcome};
