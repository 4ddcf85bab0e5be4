//! Building test harnesses and publishing their containers.

use tokio_util::sync::CancellationToken;

use crate::core::path::NormalizedPath;
use crate::error::Result;
use crate::metadata::MetadataService;
use crate::testing::container::write_containers;
use crate::toolchain::target_info::configured_profile;
use crate::toolchain::{BuildOutputSink, BuildTargetInfo};
use crate::util::config::SettingsProvider;

/// Result of [`build_tests`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestBuildOutcome {
    pub success: bool,
    /// Container files written, one per container path of each package
    /// with test harnesses
    pub containers: Vec<NormalizedPath>,
}

/// Build the test harnesses of `manifest` and write the containers of every
/// package that produced some.
///
/// The profile and arguments come from the settings for `manifest`, the
/// same profile the container index derives paths with. Each container
/// written is announced through the metadata service. A failed build writes
/// nothing.
pub fn build_tests(
    service: &MetadataService,
    settings: &dyn SettingsProvider,
    manifest: &NormalizedPath,
    sink: &mut dyn BuildOutputSink,
    cancel: &CancellationToken,
) -> Result<TestBuildOutcome> {
    let workspace = service.workspace(manifest, cancel)?;
    let profile = configured_profile(settings, manifest);
    let info = BuildTargetInfo::new(workspace.workspace_root().clone(), manifest.clone(), profile)
        .with_settings(settings, manifest);

    let build = service.toolchain().build_tests(&info, sink, cancel);
    if !build.success {
        tracing::info!("test build of {} failed", manifest);
        return Ok(TestBuildOutcome::default());
    }

    let containers = write_containers(&workspace, &info, &build.artifacts)?;
    for container in &containers {
        service.notify_test_container_updated(container);
    }
    tracing::info!("{} test containers written for {}", containers.len(), manifest);

    Ok(TestBuildOutcome {
        success: true,
        containers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::target::{CrateType, Target, TargetKind};
    use crate::metadata::WorkspaceEvent;
    use crate::test_support::{sample_metadata_at, write_sample_workspace, CountingToolchain, RecordingSink};
    use crate::toolchain::{Artifact, TestBuild, Toolchain};
    use crate::util::config::{NoSettings, SettingKind};
    use std::sync::Arc;
    use tempfile::TempDir;

    struct ReleaseProfile;

    impl SettingsProvider for ReleaseProfile {
        fn get(&self, kind: SettingKind, _file: &NormalizedPath) -> String {
            match kind {
                SettingKind::Profile => "release".to_string(),
                SettingKind::AdditionalTestExecutionArguments => "--nocapture".to_string(),
                _ => String::new(),
            }
        }
    }

    fn harness(root: &NormalizedPath) -> Artifact {
        Artifact {
            package_id: "adder 0.1.0".to_string(),
            manifest_path: Some(root.join("adder/Cargo.toml")),
            target: Target::new("tests", TargetKind::Test, CrateType::Bin, root.join("adder/tests/tests.rs")),
            test: true,
            executable: Some(root.join("target/release/deps/tests-1")),
            fresh: false,
        }
    }

    fn setup(
        test_build: impl FnOnce(&NormalizedPath) -> TestBuild,
    ) -> (TempDir, NormalizedPath, Arc<CountingToolchain>, MetadataService) {
        let tmp = TempDir::new().unwrap();
        write_sample_workspace(tmp.path());
        let root = NormalizedPath::from_path(tmp.path());
        let toolchain = Arc::new(
            CountingToolchain::new()
                .with_metadata(sample_metadata_at(&root))
                .with_test_build(test_build(&root)),
        );
        let dyn_toolchain: Arc<dyn Toolchain> = toolchain.clone();
        let service = MetadataService::new(dyn_toolchain, root.clone());
        (tmp, root, toolchain, service)
    }

    #[test]
    fn test_containers_written_and_announced() {
        let (_tmp, root, toolchain, service) = setup(|root| TestBuild {
            success: true,
            artifacts: vec![harness(root)],
        });
        let sub = service.subscribe();
        let manifest = root.join("Cargo.toml");
        let mut sink = RecordingSink::default();

        let outcome =
            build_tests(&service, &ReleaseProfile, &manifest, &mut sink, &CancellationToken::new()).unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.containers, [root.join("target/release/adder.rusttests")]);
        assert!(outcome.containers[0].is_file());

        let calls = toolchain.build_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].profile, "release");
        assert_eq!(calls[0].additional_test_execution_args, ["--nocapture"]);

        let events: Vec<_> = sub.events.try_iter().collect();
        assert_eq!(
            events.last(),
            Some(&WorkspaceEvent::TestContainerUpdated(outcome.containers[0].clone()))
        );
    }

    #[test]
    fn test_failed_build_writes_nothing() {
        let (_tmp, root, _toolchain, service) = setup(|_| TestBuild {
            success: false,
            artifacts: Vec::new(),
        });
        let mut sink = RecordingSink::default();

        let outcome = build_tests(
            &service,
            &NoSettings,
            &root.join("adder/Cargo.toml"),
            &mut sink,
            &CancellationToken::new(),
        )
        .unwrap();

        assert_eq!(outcome, TestBuildOutcome::default());
        assert!(!root.join("target").exists());
    }
}
