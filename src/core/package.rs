//! Package - one manifest and the targets it declares.
//!
//! Packages are owned by their [`Workspace`]. Code that needs to walk back
//! from a package to its workspace (target directory, workspace root) holds a
//! [`PackageRef`], a shared handle to the workspace plus the package's index.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::path::NormalizedPath;
use crate::core::target::Target;
use crate::core::workspace::Workspace;

/// Name given to the placeholder package of a virtual workspace manifest.
pub const ROOT_PACKAGE_NAME: &str = "<root>";

/// A package as reported by cargo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    /// Package name
    pub name: String,

    /// Package version, absent for the root placeholder
    #[serde(default)]
    pub version: Option<String>,

    /// Path of the package manifest; unique within a workspace
    pub manifest_path: NormalizedPath,

    /// Targets declared by the package
    #[serde(default)]
    pub targets: Vec<Target>,

    /// False for the placeholder that stands in for a virtual manifest
    #[serde(skip, default = "default_is_package")]
    pub is_package: bool,
}

fn default_is_package() -> bool {
    true
}

impl Package {
    /// Placeholder for a manifest that aggregates members but owns no code.
    pub fn root_placeholder(manifest_path: NormalizedPath) -> Self {
        Package {
            name: ROOT_PACKAGE_NAME.to_string(),
            version: None,
            manifest_path,
            targets: Vec::new(),
            is_package: false,
        }
    }

    /// Directory holding the manifest.
    pub fn full_path(&self) -> NormalizedPath {
        self.manifest_path
            .parent()
            .unwrap_or_else(|| self.manifest_path.clone())
    }

    /// Get all targets.
    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    /// Get a target by name.
    pub fn target(&self, name: &str) -> Option<&Target> {
        self.targets.iter().find(|t| t.name == name)
    }

    /// The runnable target whose root source file is `file`.
    pub fn runnable_target_for(&self, file: &NormalizedPath) -> Option<&Target> {
        self.targets
            .iter()
            .find(|t| t.is_runnable() && t.src_path == *file)
    }

    /// The test containers this package can produce under a profile output
    /// directory, in target order. Targets that can have tests each get one,
    /// except that targets sharing a container path share the container.
    pub fn test_containers_in(&self, profile_dir: &NormalizedPath) -> Vec<TestContainerInfo> {
        let mut containers: Vec<TestContainerInfo> = Vec::new();
        for target in self.targets.iter().filter(|t| t.can_have_tests()) {
            let path = target.test_container_path(profile_dir);
            if containers.iter().all(|c| c.path != path) {
                containers.push(TestContainerInfo {
                    path,
                    target: target.name.clone(),
                });
            }
        }
        containers
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.manifest_path)
    }
}

/// A package together with the workspace that owns it.
#[derive(Clone)]
pub struct PackageRef {
    workspace: Arc<Workspace>,
    index: usize,
}

/// A test container a package can produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestContainerInfo {
    /// Where the container file lives
    pub path: NormalizedPath,

    /// Name of the target the container belongs to
    pub target: String,
}

impl PackageRef {
    /// Create a handle; `index` must address a package of `workspace`.
    pub(crate) fn new(workspace: Arc<Workspace>, index: usize) -> Self {
        debug_assert!(index < workspace.packages().len());
        PackageRef { workspace, index }
    }

    /// The owning workspace.
    pub fn workspace(&self) -> &Arc<Workspace> {
        &self.workspace
    }

    /// Root directory of the owning workspace.
    pub fn workspace_root(&self) -> &NormalizedPath {
        self.workspace.workspace_root()
    }

    /// Output directory for a profile.
    pub fn profile_dir(&self, profile: &str) -> NormalizedPath {
        self.workspace.profile_dir(profile)
    }

    /// Where a target of this package lands for a profile.
    pub fn artifact_path(&self, target: &Target, profile: &str) -> NormalizedPath {
        target.artifact_path(&self.profile_dir(profile))
    }

    /// The test containers this package can produce for a profile.
    pub fn test_containers(&self, profile: &str) -> Vec<TestContainerInfo> {
        self.test_containers_in(&self.profile_dir(profile))
    }
}

impl Deref for PackageRef {
    type Target = Package;

    fn deref(&self) -> &Package {
        &self.workspace.packages()[self.index]
    }
}

impl PartialEq for PackageRef {
    fn eq(&self, other: &Self) -> bool {
        self.manifest_path == other.manifest_path
    }
}

impl Eq for PackageRef {}

impl fmt::Debug for PackageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackageRef")
            .field("name", &self.name)
            .field("manifest_path", &self.manifest_path)
            .finish()
    }
}

impl fmt::Display for PackageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&**self, f)
    }
}
