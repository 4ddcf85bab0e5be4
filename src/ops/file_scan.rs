//! What a file produces: the build outputs a manifest or an entry point
//! leads to, per profile.

use std::path::PathBuf;
use std::time::SystemTime;

use tokio_util::sync::CancellationToken;

use crate::core::manifest::{is_manifest, is_source_file};
use crate::core::package::PackageRef;
use crate::core::path::NormalizedPath;
use crate::core::profile::profiles;
use crate::core::target::Target;
use crate::metadata::{FileTargetInfo, MetadataService};

/// A build output of a file under one profile.
///
/// An entry without a target stands for the profile itself, so hosts can
/// offer it as a build configuration even when nothing is launchable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputReference {
    pub profile: String,
    /// Name of the target producing the output
    pub target: Option<String>,
    pub artifact: Option<NormalizedPath>,
    /// `artifact` relative to the package directory
    pub relative_artifact: Option<PathBuf>,
}

impl OutputReference {
    fn profile_only(profile: &str) -> Self {
        OutputReference {
            profile: profile.to_string(),
            target: None,
            artifact: None,
            relative_artifact: None,
        }
    }

    fn for_target(package: &PackageRef, target: &Target, profile: &str) -> Self {
        let artifact = package.artifact_path(target, profile);
        let relative = pathdiff::diff_paths(artifact.as_path(), package.full_path().as_path());
        OutputReference {
            profile: profile.to_string(),
            target: Some(target.name.clone()),
            artifact: Some(artifact),
            relative_artifact: relative,
        }
    }
}

/// Output references of `file`.
///
/// A package manifest lists the artifact of each runnable target for every
/// profile, followed by one profile entry per profile; a virtual manifest
/// only has the profile entries. The root source file of an example lists
/// that example's artifacts and the profile entries. Everything else has
/// none, as do files whose metadata cannot be loaded.
pub fn output_references(
    service: &MetadataService,
    file: &NormalizedPath,
    cancel: &CancellationToken,
) -> Vec<OutputReference> {
    let package = match service.containing_package(file, cancel) {
        Ok(Some(package)) => package,
        Ok(None) => return Vec::new(),
        Err(e) => {
            tracing::warn!("cannot scan {}: {}", file, e);
            return Vec::new();
        }
    };

    let mut refs = Vec::new();

    if package.manifest_path == *file {
        if package.is_package {
            for target in package.targets().iter().filter(|t| t.is_runnable()) {
                refs.extend(profiles().map(|p| OutputReference::for_target(&package, target, p)));
            }
        }
        refs.extend(profiles().map(OutputReference::profile_only));
    }

    for target in package
        .targets()
        .iter()
        .filter(|t| t.is_example() && t.src_path == *file)
    {
        refs.extend(profiles().map(|p| OutputReference::for_target(&package, target, p)));
        refs.extend(profiles().map(OutputReference::profile_only));
    }

    refs
}

/// Whether `file` has targets and whether one of them is runnable.
/// Metadata failures count as "no targets".
pub fn target_info(service: &MetadataService, file: &NormalizedPath, cancel: &CancellationToken) -> FileTargetInfo {
    service.target_info(file, cancel).unwrap_or_else(|e| {
        tracing::warn!("cannot scan {}: {}", file, e);
        FileTargetInfo::default()
    })
}

/// Whether a scan taken at `last_scan` is still valid for `file`.
///
/// Only manifests and source files are ever up to date; a file that cannot
/// be inspected is not.
pub fn is_up_to_date(last_scan: Option<SystemTime>, file: &NormalizedPath) -> bool {
    if !is_manifest(file) && !is_source_file(file) {
        return false;
    }
    let Some(last_scan) = last_scan else {
        return false;
    };

    match std::fs::metadata(file.as_path()).and_then(|m| m.modified()) {
        Ok(modified) => modified < last_scan,
        Err(e) => {
            tracing::debug!("cannot stat {}: {}", file, e);
            false
        }
    }
}
