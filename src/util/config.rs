//! Configuration file support for berth.
//!
//! berth reads two configuration file locations:
//! - Global: `~/.berth/config.toml` - User-wide defaults
//! - Project: `.berth/config.toml` under the workspace root - Project-specific overrides
//!
//! Project config takes precedence over global config. Within a file,
//! `[packages."<name>"]` tables override the `[build]` and `[test]` values
//! for one package.
//!
//! The rest of the crate reads settings through [`SettingsProvider`], which
//! answers with the flat strings a host settings store would hand back;
//! [`ConfigSettings`] is the implementation backed by these files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::manifest::{is_manifest, resolve_governing_manifest};
use crate::core::path::NormalizedPath;

/// Name of the configuration directory, both global and per project.
pub const CONFIG_DIR_NAME: &str = ".berth";

/// berth configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Toolchain location
    pub toolchain: ToolchainSettings,

    /// Build settings
    pub build: BuildConfig,

    /// Test discovery and execution settings
    pub test: TestConfig,

    /// Per-package overrides, keyed by package name
    pub packages: BTreeMap<String, PackageConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainSettings {
    /// Path to cargo (e.g., ~/.cargo/bin/cargo)
    pub cargo: Option<PathBuf>,
}

/// Build-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Profile used when none is requested
    pub profile: Option<String>,

    /// Extra arguments passed to `cargo build` and `cargo test --no-run`
    pub args: Vec<String>,
}

/// Test-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestConfig {
    /// Extra arguments passed to test executables when listing tests
    pub discovery_args: Vec<String>,

    /// Extra arguments passed to test executables when running tests
    pub execution_args: Vec<String>,

    /// Environment for test executables
    pub environment: BTreeMap<String, String>,
}

/// Overrides for a single package. Unset values fall through to the
/// workspace-wide sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageConfig {
    pub profile: Option<String>,
    pub args: Option<Vec<String>>,
    pub discovery_args: Option<Vec<String>>,
    pub execution_args: Option<Vec<String>>,
    pub environment: Option<BTreeMap<String, String>>,
}

impl PackageConfig {
    fn merge(&mut self, other: PackageConfig) {
        if other.profile.is_some() {
            self.profile = other.profile;
        }
        if other.args.is_some() {
            self.args = other.args;
        }
        if other.discovery_args.is_some() {
            self.discovery_args = other.discovery_args;
        }
        if other.execution_args.is_some() {
            self.execution_args = other.execution_args;
        }
        if other.environment.is_some() {
            self.environment = other.environment;
        }
    }
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.toolchain.cargo.is_some() {
            self.toolchain.cargo = other.toolchain.cargo;
        }

        if other.build.profile.is_some() {
            self.build.profile = other.build.profile;
        }
        if !other.build.args.is_empty() {
            self.build.args = other.build.args;
        }

        if !other.test.discovery_args.is_empty() {
            self.test.discovery_args = other.test.discovery_args;
        }
        if !other.test.execution_args.is_empty() {
            self.test.execution_args = other.test.execution_args;
        }
        // Environments are merged key by key.
        self.test.environment.extend(other.test.environment);

        for (name, package) in other.packages {
            self.packages.entry(name).or_default().merge(package);
        }
    }

    fn package(&self, name: Option<&str>) -> Option<&PackageConfig> {
        name.and_then(|name| self.packages.get(name))
    }

    /// Profile for a package, if one is configured.
    pub fn profile_for(&self, package: Option<&str>) -> Option<&str> {
        self.package(package)
            .and_then(|p| p.profile.as_deref())
            .or(self.build.profile.as_deref())
    }

    pub fn build_args_for(&self, package: Option<&str>) -> &[String] {
        self.package(package)
            .and_then(|p| p.args.as_deref())
            .unwrap_or(&self.build.args)
    }

    pub fn discovery_args_for(&self, package: Option<&str>) -> &[String] {
        self.package(package)
            .and_then(|p| p.discovery_args.as_deref())
            .unwrap_or(&self.test.discovery_args)
    }

    pub fn execution_args_for(&self, package: Option<&str>) -> &[String] {
        self.package(package)
            .and_then(|p| p.execution_args.as_deref())
            .unwrap_or(&self.test.execution_args)
    }

    pub fn environment_for(&self, package: Option<&str>) -> &BTreeMap<String, String> {
        self.package(package)
            .and_then(|p| p.environment.as_ref())
            .unwrap_or(&self.test.environment)
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.berth/config.toml)
/// 2. Global config (~/.berth/config.toml)
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Config {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        config.merge(Config::load_or_default(global_path));
    }

    config.merge(Config::load_or_default(project_path));

    config
}

/// Get the global berth config directory (~/.berth).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(CONFIG_DIR_NAME))
}

/// Get the global config path (~/.berth/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (.berth/config.toml).
pub fn project_config_path(workspace_root: &Path) -> PathBuf {
    workspace_root.join(CONFIG_DIR_NAME).join("config.toml")
}

/// The settings a host can supply per file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKind {
    Profile,
    AdditionalBuildArguments,
    AdditionalTestDiscoveryArguments,
    AdditionalTestExecutionArguments,
    TestExecutionEnvironment,
}

/// Per-file settings lookup.
///
/// Values are flat strings. Argument lists are NUL-separated (or, when
/// they contain no NUL, whitespace-separated); environments are
/// `K=V\0K2=V2\0\0`. An empty string means "not set".
pub trait SettingsProvider: Send + Sync {
    fn get(&self, kind: SettingKind, file: &NormalizedPath) -> String;
}

/// Settings that are never set.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSettings;

impl SettingsProvider for NoSettings {
    fn get(&self, _kind: SettingKind, _file: &NormalizedPath) -> String {
        String::new()
    }
}

/// [`SettingsProvider`] over a loaded [`Config`].
///
/// Per-package tables are matched against the `[package] name` of the
/// manifest governing the file.
#[derive(Debug, Clone)]
pub struct ConfigSettings {
    config: Config,
    workspace_root: NormalizedPath,
}

impl ConfigSettings {
    pub fn new(config: Config, workspace_root: NormalizedPath) -> Self {
        ConfigSettings {
            config,
            workspace_root,
        }
    }

    /// Load the global and project files for a workspace.
    pub fn load(workspace_root: NormalizedPath) -> Self {
        let global = global_config_path();
        let project = project_config_path(workspace_root.as_path());
        let config = load_config(global.as_deref(), &project);
        ConfigSettings::new(config, workspace_root)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn package_name(&self, file: &NormalizedPath) -> Option<String> {
        if self.config.packages.is_empty() {
            return None;
        }
        let manifest = if is_manifest(file) {
            file.clone()
        } else {
            resolve_governing_manifest(file, &self.workspace_root)?
        };
        read_package_name(&manifest)
    }
}

impl SettingsProvider for ConfigSettings {
    fn get(&self, kind: SettingKind, file: &NormalizedPath) -> String {
        let package = self.package_name(file);
        let package = package.as_deref();
        match kind {
            SettingKind::Profile => self.config.profile_for(package).unwrap_or_default().to_string(),
            SettingKind::AdditionalBuildArguments => join_args(self.config.build_args_for(package)),
            SettingKind::AdditionalTestDiscoveryArguments => {
                join_args(self.config.discovery_args_for(package))
            }
            SettingKind::AdditionalTestExecutionArguments => {
                join_args(self.config.execution_args_for(package))
            }
            SettingKind::TestExecutionEnvironment => {
                format_environment(self.config.environment_for(package))
            }
        }
    }
}

fn read_package_name(manifest: &NormalizedPath) -> Option<String> {
    let contents = std::fs::read_to_string(manifest.as_path()).ok()?;
    let value: toml::Value = toml::from_str(&contents)
        .map_err(|e| tracing::debug!("cannot read package name from {}: {}", manifest, e))
        .ok()?;
    value
        .get("package")?
        .get("name")?
        .as_str()
        .map(str::to_string)
}

/// Flatten an argument list into the NUL-separated settings form.
pub fn join_args(args: &[String]) -> String {
    args.join("\0")
}

/// Flatten an environment into the `K=V\0...\0\0` settings form.
pub fn format_environment(env: &BTreeMap<String, String>) -> String {
    if env.is_empty() {
        return String::new();
    }
    let mut s = String::new();
    for (key, value) in env {
        s.push_str(key);
        s.push('=');
        s.push_str(value);
        s.push('\0');
    }
    s.push('\0');
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::write_file;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.toolchain.cargo.is_none());
        assert!(config.build.profile.is_none());
        assert!(config.build.args.is_empty());
        assert!(config.test.environment.is_empty());
    }

    #[test]
    fn test_config_load() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");

        write_file(
            &config_path,
            r#"
[toolchain]
cargo = "/opt/cargo/bin/cargo"

[build]
profile = "release"
args = ["--features", "extra"]

[test]
execution_args = ["--test-threads", "1"]
environment = { RUST_BACKTRACE = "1" }

[packages.adder]
profile = "test"
"#,
        );

        let config = Config::load(&config_path).unwrap();
        assert_eq!(config.toolchain.cargo, Some(PathBuf::from("/opt/cargo/bin/cargo")));
        assert_eq!(config.build.profile.as_deref(), Some("release"));
        assert_eq!(config.build.args, ["--features", "extra"]);
        assert_eq!(config.test.execution_args, ["--test-threads", "1"]);
        assert_eq!(config.test.environment["RUST_BACKTRACE"], "1");
        assert_eq!(config.profile_for(Some("adder")), Some("test"));
        assert_eq!(config.profile_for(Some("add_one")), Some("release"));
        assert_eq!(config.build_args_for(Some("adder")), ["--features", "extra"]);
    }

    #[test]
    fn test_config_merge() {
        let mut base = Config::default();
        base.build.profile = Some("dev".to_string());
        base.test.environment.insert("A".to_string(), "1".to_string());

        let mut override_cfg = Config::default();
        override_cfg.build.args = vec!["-v".to_string()];
        override_cfg.test.environment.insert("B".to_string(), "2".to_string());

        base.merge(override_cfg);

        assert_eq!(base.build.profile.as_deref(), Some("dev"));
        assert_eq!(base.build.args, ["-v"]);
        assert_eq!(base.test.environment.len(), 2);
    }

    #[test]
    fn test_load_config_precedence() {
        let tmp = TempDir::new().unwrap();
        let global_path = tmp.path().join("global.toml");
        let project_path = tmp.path().join("project.toml");

        write_file(&global_path, "[build]\nprofile = \"release\"\nargs = [\"-q\"]\n");
        write_file(&project_path, "[build]\nprofile = \"bench\"\n");

        let config = load_config(Some(&global_path), &project_path);
        assert_eq!(config.build.profile.as_deref(), Some("bench"));
        assert_eq!(config.build.args, ["-q"]);
    }

    #[test]
    fn test_malformed_config_falls_back_to_default() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        write_file(&path, "[build\nprofile =");
        assert_eq!(Config::load_or_default(&path), Config::default());
    }

    #[test]
    fn test_settings_flatten_values() {
        let tmp = TempDir::new().unwrap();
        let root = NormalizedPath::from_path(tmp.path());
        write_file(&tmp.path().join("adder/Cargo.toml"), "[package]\nname = \"adder\"\n");
        write_file(&tmp.path().join("adder/src/lib.rs"), "");
        write_file(
            &project_config_path(tmp.path()),
            r#"
[test]
discovery_args = ["--include-ignored"]

[packages.adder]
execution_args = ["--test-threads", "1"]
environment = { A = "1", B = "two" }
"#,
        );

        let settings = ConfigSettings::new(
            Config::load(&project_config_path(tmp.path())).unwrap(),
            root.clone(),
        );
        let file = root.join("adder/src/lib.rs");

        assert_eq!(settings.get(SettingKind::Profile, &file), "");
        assert_eq!(
            settings.get(SettingKind::AdditionalTestDiscoveryArguments, &file),
            "--include-ignored"
        );
        assert_eq!(
            settings.get(SettingKind::AdditionalTestExecutionArguments, &file),
            "--test-threads\u{0}1"
        );
        assert_eq!(
            settings.get(SettingKind::TestExecutionEnvironment, &file),
            "A=1\u{0}B=two\u{0}\u{0}"
        );

        // Outside any package only the workspace-wide values apply.
        let outside = root.join("notes.txt");
        assert_eq!(settings.get(SettingKind::AdditionalTestExecutionArguments, &outside), "");
    }
}
