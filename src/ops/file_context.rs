//! Build and clean actions offered for a file.
//!
//! A manifest gets a build and a clean action per profile; the root source
//! file of a runnable target gets a build action per profile that selects
//! that target. Anything else gets nothing.

use std::fmt;

use tokio_util::sync::CancellationToken;

use crate::core::manifest::{is_manifest, is_source_file};
use crate::core::path::NormalizedPath;
use crate::core::profile::profiles;
use crate::metadata::MetadataService;
use crate::toolchain::{BuildOutputSink, BuildTargetInfo, Toolchain};
use crate::util::config::SettingsProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextKind {
    Build,
    Clean,
}

impl fmt::Display for ContextKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            ContextKind::Build => "build",
            ContextKind::Clean => "clean",
        })
    }
}

/// One action the host can run for a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContext {
    pub kind: ContextKind,

    /// Shown to the user; the profile name
    pub display_name: String,

    /// Files the action applies to
    pub input_files: Vec<NormalizedPath>,

    pub info: BuildTargetInfo,
}

impl FileContext {
    /// Run the action.
    pub fn run(
        &self,
        toolchain: &dyn Toolchain,
        sink: &mut dyn BuildOutputSink,
        cancel: &CancellationToken,
    ) -> bool {
        match self.kind {
            ContextKind::Build => toolchain.build(&self.info, sink, cancel),
            ContextKind::Clean => toolchain.clean(&self.info, sink, cancel),
        }
    }
}

/// The actions offered for `file`. Metadata failures yield no actions.
pub fn file_contexts(
    service: &MetadataService,
    settings: &dyn SettingsProvider,
    file: &NormalizedPath,
    cancel: &CancellationToken,
) -> Vec<FileContext> {
    let package = match service.containing_package(file, cancel) {
        Ok(Some(package)) => package,
        Ok(None) => return Vec::new(),
        Err(e) => {
            tracing::warn!("no build actions for {}: {}", file, e);
            return Vec::new();
        }
    };

    let root = package.workspace_root().clone();

    if is_manifest(file) {
        return profiles()
            .flat_map(|profile| {
                let build = BuildTargetInfo::new(root.clone(), file.clone(), profile)
                    .with_settings(settings, file);
                let clean = BuildTargetInfo::new(root.clone(), file.clone(), profile);
                [
                    FileContext {
                        kind: ContextKind::Build,
                        display_name: profile.to_string(),
                        input_files: vec![file.clone()],
                        info: build,
                    },
                    FileContext {
                        kind: ContextKind::Clean,
                        display_name: profile.to_string(),
                        input_files: vec![file.clone()],
                        info: clean,
                    },
                ]
            })
            .collect();
    }

    if is_source_file(file) {
        if let Some(target) = package.runnable_target_for(file) {
            return profiles()
                .map(|profile| FileContext {
                    kind: ContextKind::Build,
                    display_name: profile.to_string(),
                    input_files: vec![target.src_path.clone()],
                    info: BuildTargetInfo::new(root.clone(), package.manifest_path.clone(), profile)
                        .with_settings(settings, file)
                        .for_target(target),
                })
                .collect();
        }
    }

    Vec::new()
}
