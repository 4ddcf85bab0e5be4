//! Workspace - the package graph one `cargo metadata` query reports.
//!
//! A Workspace is decoded fresh from each successful metadata query and is
//! immutable afterwards, apart from the root-package repair applied during
//! construction.

use std::sync::Arc;

use serde::Deserialize;

use crate::core::package::{Package, PackageRef};
use crate::core::path::NormalizedPath;
use crate::core::profile::profile_dir_name;
use crate::error::{Error, Result};

/// The `cargo metadata --format-version 1` document, reduced to what the
/// graph needs.
#[derive(Debug, Deserialize)]
struct RawMetadata {
    packages: Vec<Package>,
    target_directory: NormalizedPath,
    #[serde(default)]
    workspace_root: Option<NormalizedPath>,
}

/// A workspace: its packages plus the directories cargo reported.
#[derive(Debug)]
pub struct Workspace {
    /// Manifest the metadata query was issued for
    manifest_path: NormalizedPath,

    /// Root directory of the workspace
    workspace_root: NormalizedPath,

    /// Target directory for build outputs
    target_directory: NormalizedPath,

    /// Packages, each with a unique manifest path
    packages: Vec<Package>,
}

impl Workspace {
    /// Decode a metadata document produced for `manifest_path`.
    ///
    /// When no package owns `manifest_path` (a virtual workspace manifest)
    /// a placeholder package is appended, so every manifest the query
    /// succeeded for resolves to some package.
    pub fn from_metadata_json(json: &str, manifest_path: &NormalizedPath) -> Result<Self> {
        let raw: RawMetadata = serde_json::from_str(json).map_err(|source| Error::MetadataDecode {
            manifest: manifest_path.clone(),
            source,
        })?;

        let workspace_root = raw.workspace_root.unwrap_or_else(|| {
            manifest_path
                .parent()
                .unwrap_or_else(|| manifest_path.clone())
        });

        let mut ws = Workspace {
            manifest_path: manifest_path.clone(),
            workspace_root,
            target_directory: raw.target_directory,
            packages: raw.packages,
        };
        ws.add_root_package_if_necessary();
        Ok(ws)
    }

    /// Build a workspace from parts.
    pub fn new(
        manifest_path: NormalizedPath,
        workspace_root: NormalizedPath,
        target_directory: NormalizedPath,
        packages: Vec<Package>,
    ) -> Self {
        let mut ws = Workspace {
            manifest_path,
            workspace_root,
            target_directory,
            packages,
        };
        ws.add_root_package_if_necessary();
        ws
    }

    fn add_root_package_if_necessary(&mut self) {
        if self.find_package(&self.manifest_path).is_none() {
            tracing::debug!(
                "{} is not a package manifest, adding a root placeholder",
                self.manifest_path
            );
            self.packages
                .push(Package::root_placeholder(self.manifest_path.clone()));
        }
    }

    /// The manifest the workspace was queried for.
    pub fn manifest_path(&self) -> &NormalizedPath {
        &self.manifest_path
    }

    /// Get the workspace root directory.
    pub fn workspace_root(&self) -> &NormalizedPath {
        &self.workspace_root
    }

    /// Get the target directory.
    pub fn target_directory(&self) -> &NormalizedPath {
        &self.target_directory
    }

    /// Get the profile-specific output directory.
    pub fn profile_dir(&self, profile: &str) -> NormalizedPath {
        self.target_directory.join(profile_dir_name(profile))
    }

    /// All packages, in the order cargo reported them.
    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    /// Index of the package owning `manifest_path`.
    pub fn find_package(&self, manifest_path: &NormalizedPath) -> Option<usize> {
        self.packages
            .iter()
            .position(|p| p.manifest_path == *manifest_path)
    }

    /// Handle to the package owning `manifest_path`.
    pub fn package_ref(self: &Arc<Self>, manifest_path: &NormalizedPath) -> Option<PackageRef> {
        self.find_package(manifest_path)
            .map(|index| PackageRef::new(Arc::clone(self), index))
    }

    /// The package the workspace was queried for. The root repair makes
    /// this infallible.
    pub fn queried_package(self: &Arc<Self>) -> PackageRef {
        let index = self
            .find_package(&self.manifest_path)
            .unwrap_or(self.packages.len() - 1);
        PackageRef::new(Arc::clone(self), index)
    }

    /// Handles to every package.
    pub fn package_refs(self: &Arc<Self>) -> impl Iterator<Item = PackageRef> + '_ {
        (0..self.packages.len()).map(move |index| PackageRef::new(Arc::clone(self), index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_metadata;

    #[test]
    fn test_decode_member_manifest() {
        let manifest = NormalizedPath::new("/ws/adder/Cargo.toml");
        let ws = Workspace::from_metadata_json(&sample_metadata(), &manifest).unwrap();

        assert_eq!(ws.packages().len(), 2);
        assert!(ws.packages().iter().all(|p| p.is_package));
        assert_eq!(ws.target_directory().as_str(), "/ws/target");
        assert_eq!(ws.workspace_root().as_str(), "/ws");
        assert_eq!(ws.profile_dir("test").as_str(), "/ws/target/debug");
    }

    #[test]
    fn test_virtual_manifest_gets_placeholder() {
        let manifest = NormalizedPath::new("/ws/Cargo.toml");
        let ws = Arc::new(Workspace::from_metadata_json(&sample_metadata(), &manifest).unwrap());

        assert_eq!(ws.packages().len(), 3);
        let root = ws.queried_package();
        assert!(!root.is_package);
        assert_eq!(root.manifest_path, manifest);
    }

    #[test]
    fn test_manifest_lookup_ignores_case_and_separators() {
        let manifest = NormalizedPath::new(r"\WS\adder\cargo.toml");
        let ws = Arc::new(Workspace::from_metadata_json(&sample_metadata(), &manifest).unwrap());

        assert_eq!(ws.packages().len(), 2);
        assert_eq!(ws.queried_package().name, "adder");
    }

    #[test]
    fn test_malformed_metadata_is_an_error() {
        let manifest = NormalizedPath::new("/ws/Cargo.toml");
        let err = Workspace::from_metadata_json("{\"packages\": [", &manifest).unwrap_err();
        assert!(matches!(err, Error::MetadataDecode { .. }));

        let err = Workspace::from_metadata_json("{\"packages\": []}", &manifest).unwrap_err();
        assert!(matches!(err, Error::MetadataDecode { .. }));
    }
}
