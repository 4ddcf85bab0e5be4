//! `berth containers` command

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::cli::ContainersArgs;
use crate::commands::Session;
use berth::testing::TestContainerIndex;
use berth::util::GlobalContext;

pub fn execute(args: ContainersArgs, ctx: GlobalContext) -> Result<()> {
    let session = Session::new(ctx)?;
    let manifest = session.manifest(args.manifest.as_deref());

    let index = TestContainerIndex::new(session.settings.clone());
    index.load(Arc::clone(&session.service));

    let workspace = session
        .service
        .workspace(&manifest, &session.cancel)
        .with_context(|| format!("failed to load metadata for {}", manifest))?;

    // Each member is cached under its own manifest; loading them publishes
    // their packages to the index.
    for package in workspace.packages().iter().filter(|p| p.is_package) {
        if let Err(e) = session.service.package(&package.manifest_path, &session.cancel) {
            tracing::warn!("skipping {}: {}", package.manifest_path, e);
        }
    }
    index.process_pending();

    let containers = index.containers();
    if containers.is_empty() {
        eprintln!("no test containers for {}", manifest);
    }
    for container in containers {
        let state = if container.is_file() { "built" } else { "missing" };
        println!("{} ({})", container, state);
    }

    Ok(())
}
