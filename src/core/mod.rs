//! Core data structures for berth.
//!
//! This module contains the foundational types used throughout berth:
//! - Normalized, case-insensitive paths
//! - Manifest classification and governing-manifest resolution
//! - Workspaces, packages and targets decoded from cargo metadata
//! - Build profiles

pub mod manifest;
pub mod package;
pub mod path;
pub mod profile;
pub mod target;
pub mod workspace;

pub use manifest::{resolve_governing_manifest, MANIFEST_NAME};
pub use package::{Package, PackageRef};
pub use path::NormalizedPath;
pub use target::{CrateType, Target, TargetKind};
pub use workspace::Workspace;
