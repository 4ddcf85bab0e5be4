//! `berth resolve` command

use anyhow::Result;

use crate::cli::ResolveArgs;
use crate::commands::Session;
use berth::core::manifest::resolve_governing_manifest;
use berth::ops::target_info;
use berth::util::GlobalContext;

pub fn execute(args: ResolveArgs, ctx: GlobalContext) -> Result<()> {
    let session = Session::new(ctx)?;
    let path = session.ctx.resolve_path(&args.path);
    let root = session.ctx.workspace_root();

    let Some(manifest) = resolve_governing_manifest(&path, root) else {
        println!("{} is not governed by a manifest under {}", path, root);
        return Ok(());
    };
    println!("manifest: {}", manifest);

    match session.service.containing_package(&path, &session.cancel) {
        Ok(Some(package)) => println!("package: {}", package.name),
        Ok(None) => {}
        Err(e) => tracing::warn!("cannot load {}: {}", manifest, e),
    }

    let info = target_info(&session.service, &path, &session.cancel);
    println!("has targets: {}", info.has_targets);
    println!("runnable: {}", info.is_exe);

    Ok(())
}
