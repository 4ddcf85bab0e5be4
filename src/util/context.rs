//! Global context for berth operations.
//!
//! Provides centralized access to the working directory, the workspace root,
//! the loaded configuration and the cargo executable.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::manifest::MANIFEST_NAME;
use crate::core::path::NormalizedPath;
use crate::error::Error;
use crate::util::config::{global_config_path, load_config, project_config_path, Config, ConfigSettings};
use crate::util::process::find_executable;

/// Global context containing configuration and paths.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Current working directory
    cwd: PathBuf,

    /// Root of the workspace being served
    workspace_root: NormalizedPath,

    /// Merged global and project configuration
    config: Config,

    /// Whether to use verbose output
    verbose: bool,
}

impl GlobalContext {
    /// Create a context for the current directory.
    ///
    /// Without an explicit root, the outermost directory above the current
    /// one that holds a `Cargo.toml` is the workspace root.
    pub fn new(workspace_root: Option<&Path>) -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        Self::with_cwd(cwd, workspace_root)
    }

    /// Create a GlobalContext with a specific working directory.
    pub fn with_cwd(cwd: PathBuf, workspace_root: Option<&Path>) -> Result<Self> {
        let root = match workspace_root {
            Some(root) => absolutize(&cwd, root),
            None => find_workspace_root(&cwd).unwrap_or_else(|| cwd.clone()),
        };

        let global = global_config_path();
        let config = load_config(global.as_deref(), &project_config_path(&root));

        Ok(GlobalContext {
            cwd,
            workspace_root: NormalizedPath::from_path(&root),
            config,
            verbose: false,
        })
    }

    /// Set verbose mode.
    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    /// Check if verbose mode is enabled.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Get the current working directory.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn workspace_root(&self) -> &NormalizedPath {
        &self.workspace_root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Settings lookup over the loaded configuration.
    pub fn settings(&self) -> ConfigSettings {
        ConfigSettings::new(self.config.clone(), self.workspace_root.clone())
    }

    /// Resolve a user-supplied path against the working directory.
    pub fn resolve_path(&self, path: &Path) -> NormalizedPath {
        NormalizedPath::from_path(&absolutize(&self.cwd, path))
    }

    /// Locate cargo.
    pub fn cargo(&self) -> Result<PathBuf, Error> {
        locate_cargo(self.config.toolchain.cargo.as_deref())
    }
}

fn absolutize(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

/// Find cargo: the configured path, then `$CARGO`, then `PATH`.
pub fn locate_cargo(configured: Option<&Path>) -> Result<PathBuf, Error> {
    let from_env = std::env::var_os("CARGO").map(PathBuf::from);

    for candidate in configured.map(Path::to_path_buf).into_iter().chain(from_env) {
        if candidate.is_file() {
            return Ok(candidate);
        }
        if let Some(found) = candidate.to_str().and_then(find_executable) {
            return Ok(found);
        }
        tracing::warn!("ignoring cargo at {}: not found", candidate.display());
    }

    let found = find_executable("cargo").ok_or_else(|| Error::ToolchainNotFound {
        program: "cargo".to_string(),
    })?;
    tracing::debug!("using cargo from {}", found.display());
    Ok(found)
}

/// The outermost ancestor of `start` (inclusive) that holds a manifest.
pub fn find_workspace_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .filter(|dir| dir.join(MANIFEST_NAME).is_file())
        .last()
        .map(Path::to_path_buf)
}
