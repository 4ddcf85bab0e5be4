//! Everything one toolchain invocation needs to know about its target.

use crate::core::path::NormalizedPath;
use crate::core::profile::DEFAULT_PROFILE;
use crate::core::target::Target;
use crate::util::config::{SettingKind, SettingsProvider};

/// Arguments for a build, clean or test run. Built per request from the
/// settings lookup and never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTargetInfo {
    pub workspace_root: NormalizedPath,
    pub manifest_path: NormalizedPath,
    pub profile: String,
    pub additional_build_args: Vec<String>,
    pub additional_test_discovery_args: Vec<String>,
    pub additional_test_execution_args: Vec<String>,
    pub test_execution_environment: Vec<(String, String)>,
}

impl BuildTargetInfo {
    /// Bare info: no additional arguments, no environment.
    pub fn new(
        workspace_root: NormalizedPath,
        manifest_path: NormalizedPath,
        profile: impl Into<String>,
    ) -> Self {
        BuildTargetInfo {
            workspace_root,
            manifest_path,
            profile: profile.into(),
            additional_build_args: Vec::new(),
            additional_test_discovery_args: Vec::new(),
            additional_test_execution_args: Vec::new(),
            test_execution_environment: Vec::new(),
        }
    }

    /// Fill in the additional arguments and environment configured for
    /// `file`.
    pub fn with_settings(mut self, settings: &dyn SettingsProvider, file: &NormalizedPath) -> Self {
        self.additional_build_args = split_args(&settings.get(SettingKind::AdditionalBuildArguments, file));
        self.additional_test_discovery_args =
            split_args(&settings.get(SettingKind::AdditionalTestDiscoveryArguments, file));
        self.additional_test_execution_args =
            split_args(&settings.get(SettingKind::AdditionalTestExecutionArguments, file));
        self.test_execution_environment =
            parse_environment(&settings.get(SettingKind::TestExecutionEnvironment, file));
        self
    }

    /// Put the arguments that select `target` in front of the configured
    /// build arguments.
    pub fn for_target(mut self, target: &Target) -> Self {
        let mut args = target.additional_build_args();
        args.append(&mut self.additional_build_args);
        self.additional_build_args = args;
        self
    }

    /// Directory the toolchain runs in.
    pub fn working_dir(&self) -> NormalizedPath {
        self.manifest_path
            .parent()
            .unwrap_or_else(|| self.workspace_root.clone())
    }
}

/// The profile configured for `file`, or the default profile.
pub fn configured_profile(settings: &dyn SettingsProvider, file: &NormalizedPath) -> String {
    let profile = settings.get(SettingKind::Profile, file);
    let profile = profile.trim();
    if profile.is_empty() {
        DEFAULT_PROFILE.to_string()
    } else {
        profile.to_string()
    }
}

/// Split a settings argument string. NUL-separated when it contains a NUL,
/// whitespace-separated otherwise.
pub fn split_args(s: &str) -> Vec<String> {
    if s.contains('\0') {
        s.split('\0')
            .filter(|a| !a.is_empty())
            .map(str::to_string)
            .collect()
    } else {
        s.split_whitespace().map(str::to_string).collect()
    }
}

/// Parse a `K=V\0K2=V2\0\0` environment string. Entries without `=` are
/// dropped.
pub fn parse_environment(s: &str) -> Vec<(String, String)> {
    s.split('\0')
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| {
            let (key, value) = entry.split_once('=')?;
            (!key.is_empty()).then(|| (key.to_string(), value.to_string()))
        })
        .collect()
}
