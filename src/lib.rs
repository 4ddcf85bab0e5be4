//! berth - bridges an IDE's project model to cargo
//!
//! This crate provides the core library functionality for berth: resolving
//! which manifest governs a file, loading and caching workspace graphs from
//! `cargo metadata`, driving builds as cancellable subprocesses, and keeping
//! an index of the test containers those builds produce.

pub mod core;
pub mod error;
pub mod metadata;
pub mod ops;
pub mod testing;
pub mod toolchain;
pub mod util;

/// Test utilities and mocks for berth unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides a counting toolchain, recording sinks and
/// telemetry, and workspace fixtures.
#[cfg(test)]
pub mod test_support;

pub use crate::core::{NormalizedPath, Package, PackageRef, Target, Workspace};
pub use error::{Error, Result};
pub use metadata::{MetadataService, WorkspaceEvent};
pub use testing::TestContainerIndex;
pub use toolchain::{CargoToolchain, Toolchain};
pub use util::context::GlobalContext;
