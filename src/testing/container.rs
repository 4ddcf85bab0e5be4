//! Test container files.
//!
//! A container is a small JSON document written next to a package's build
//! output after a test build. It names the test harness executables that
//! were produced and carries the arguments and environment they run with,
//! so discovery and execution never need to go back to cargo.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::package::Package;
use crate::core::path::NormalizedPath;
use crate::core::target::Target;
use crate::core::workspace::Workspace;
use crate::error::{Error, Result};
use crate::toolchain::{Artifact, BuildTargetInfo};

/// Format version written into every container.
pub const CONTAINER_FORMAT_VERSION: u32 = 1;

/// Contents of a `.rusttests` file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestContainer {
    pub version: u32,

    /// Name of the package the tests belong to
    pub package: String,

    /// Target the container is named after
    pub target: String,

    pub manifest_path: NormalizedPath,

    pub profile: String,

    /// Test harnesses, in build order
    pub executables: Vec<TestExecutable>,

    #[serde(default)]
    pub discovery_args: Vec<String>,

    #[serde(default)]
    pub execution_args: Vec<String>,

    #[serde(default)]
    pub environment: BTreeMap<String, String>,
}

/// One test harness executable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestExecutable {
    /// Unique within the container; prefixes fully qualified test names
    pub name: String,

    /// Target the harness was compiled from
    pub target: String,

    pub path: NormalizedPath,
}

impl TestContainer {
    /// Read and validate a container file.
    pub fn read(path: &NormalizedPath) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_path())?;
        let container: TestContainer =
            serde_json::from_str(&contents).map_err(|e| Error::Container {
                path: path.clone(),
                message: e.to_string(),
            })?;

        if container.version != CONTAINER_FORMAT_VERSION {
            return Err(Error::Container {
                path: path.clone(),
                message: format!("unsupported version {}", container.version),
            });
        }
        Ok(container)
    }

    /// Write the container, creating the output directory if needed.
    pub fn write(&self, path: &NormalizedPath) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent.as_path())?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| Error::Container {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(path.as_path(), json)?;
        Ok(())
    }

    /// Directory the executables run in.
    pub fn working_dir(&self) -> NormalizedPath {
        self.manifest_path
            .parent()
            .unwrap_or_else(|| self.manifest_path.clone())
    }

    /// The executable whose name prefixes `fully_qualified_name`, and the
    /// rest of the name after the separating dot.
    pub fn split_name<'a>(&self, fully_qualified_name: &'a str) -> Option<(&TestExecutable, &'a str)> {
        self.executables.iter().find_map(|exe| {
            let rest = fully_qualified_name.strip_prefix(exe.name.as_str())?;
            let rest = rest.strip_prefix('.')?;
            (!rest.is_empty()).then_some((exe, rest))
        })
    }
}

/// Write the containers of every package of `workspace` that produced
/// test harnesses, returning the paths written.
///
/// A package gets one container per path [`Package::test_containers_in`]
/// names, so the files written are exactly the ones the index watches for.
/// A harness built from a target that has its own container goes there;
/// every other harness goes to the package's first container. Packages
/// without a target that can have tests get none.
pub fn write_containers(
    workspace: &Workspace,
    info: &BuildTargetInfo,
    artifacts: &[Artifact],
) -> Result<Vec<NormalizedPath>> {
    let profile_dir = workspace.profile_dir(&info.profile);
    let mut written = Vec::new();

    for package in workspace.packages().iter().filter(|p| p.is_package) {
        let containers = package.test_containers_in(&profile_dir);
        if containers.is_empty() {
            continue;
        }

        let mut executables = vec![Vec::new(); containers.len()];
        let mut any = false;
        for artifact in artifacts.iter().filter(|a| belongs_to(a, package)) {
            let Some(path) = &artifact.executable else {
                continue;
            };

            let slot = if artifact.target.can_have_tests() {
                let own = artifact.target.test_container_path(&profile_dir);
                containers.iter().position(|c| c.path == own).unwrap_or(0)
            } else {
                0
            };
            add_executable(&mut executables[slot], &artifact.target, path);
            any = true;
        }
        if !any {
            continue;
        }

        for (container_info, executables) in containers.into_iter().zip(executables) {
            let container = TestContainer {
                version: CONTAINER_FORMAT_VERSION,
                package: package.name.clone(),
                target: container_info.target,
                manifest_path: package.manifest_path.clone(),
                profile: info.profile.clone(),
                executables,
                discovery_args: info.additional_test_discovery_args.clone(),
                execution_args: info.additional_test_execution_args.clone(),
                environment: info.test_execution_environment.iter().cloned().collect(),
            };

            container.write(&container_info.path)?;
            tracing::debug!(
                "wrote {} with {} executables",
                container_info.path,
                container.executables.len()
            );
            written.push(container_info.path);
        }
    }

    Ok(written)
}

/// Names are unique within a container; a second harness of the same name
/// is told apart by its kind.
fn add_executable(executables: &mut Vec<TestExecutable>, target: &Target, path: &NormalizedPath) {
    let name = if executables.iter().any(|e| e.name == target.name) {
        format!("{}-{}", target.name, target.kind().as_str())
    } else {
        target.name.clone()
    };

    executables.push(TestExecutable {
        name,
        target: target.name.clone(),
        path: path.clone(),
    });
}

fn belongs_to(artifact: &Artifact, package: &Package) -> bool {
    match &artifact.manifest_path {
        Some(manifest) => *manifest == package.manifest_path,
        None => package
            .targets()
            .iter()
            .any(|t| t.name == artifact.target.name && t.src_path == artifact.target.src_path),
    }
}
