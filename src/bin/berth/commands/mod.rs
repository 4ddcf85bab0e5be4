//! Command implementations

pub mod build;
pub mod clean;
pub mod containers;
pub mod contexts;
pub mod discover;
pub mod metadata;
pub mod resolve;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use berth::core::manifest::MANIFEST_NAME;
use berth::core::path::NormalizedPath;
use berth::metadata::MetadataService;
use berth::toolchain::{CargoToolchain, Toolchain};
use berth::util::config::ConfigSettings;
use berth::util::fs::find_test_containers;
use berth::util::telemetry::TracingTelemetry;
use berth::util::GlobalContext;

/// Everything a command needs to talk to cargo.
pub struct Session {
    pub ctx: GlobalContext,
    pub settings: Arc<ConfigSettings>,
    pub service: Arc<MetadataService>,
    pub cancel: CancellationToken,
}

impl Session {
    pub fn new(ctx: GlobalContext) -> Result<Self> {
        let cargo = ctx.cargo()?;
        tracing::debug!("using {}", cargo.display());

        let toolchain: Arc<dyn Toolchain> =
            Arc::new(CargoToolchain::new(Arc::new(TracingTelemetry)).with_cargo(Some(cargo)));
        let service = Arc::new(MetadataService::new(toolchain, ctx.workspace_root().clone()));

        Ok(Session {
            settings: Arc::new(ctx.settings()),
            service,
            cancel: CancellationToken::new(),
            ctx,
        })
    }

    /// The manifest a command operates on: the given one, or the workspace
    /// manifest.
    pub fn manifest(&self, path: Option<&Path>) -> NormalizedPath {
        match path {
            Some(path) => self.ctx.resolve_path(path),
            None => self.ctx.workspace_root().join(MANIFEST_NAME),
        }
    }

    /// Container files named on the command line, or all of those in the
    /// workspace's target directory.
    pub fn containers(&self, given: &[PathBuf]) -> Result<Vec<NormalizedPath>> {
        if !given.is_empty() {
            return Ok(given.iter().map(|p| self.ctx.resolve_path(p)).collect());
        }

        let manifest = self.manifest(None);
        let workspace = self
            .service
            .workspace(&manifest, &self.cancel)
            .with_context(|| format!("failed to load {}", manifest))?;
        find_test_containers(workspace.target_directory().as_path())
    }
}
