//! `berth metadata` command

use anyhow::{Context, Result};

use crate::cli::MetadataArgs;
use crate::commands::Session;
use berth::util::GlobalContext;

pub fn execute(args: MetadataArgs, ctx: GlobalContext) -> Result<()> {
    let session = Session::new(ctx)?;
    let manifest = session.manifest(args.manifest.as_deref());

    let workspace = session
        .service
        .workspace(&manifest, &session.cancel)
        .with_context(|| format!("failed to load metadata for {}", manifest))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(workspace.packages())?);
        return Ok(());
    }

    println!("workspace root: {}", workspace.workspace_root());
    println!("target directory: {}", workspace.target_directory());
    for package in workspace.packages() {
        println!();
        match &package.version {
            Some(version) => println!("{} v{}", package.name, version),
            None => println!("{}", package.name),
        }
        println!("  manifest: {}", package.manifest_path);
        for target in package.targets() {
            let mut flags = Vec::new();
            if target.is_runnable() {
                flags.push("runnable");
            }
            if target.can_have_tests() {
                flags.push("tests");
            }
            println!(
                "  {} {} ({}){}",
                target.kind().as_str(),
                target.name,
                target.src_path,
                if flags.is_empty() {
                    String::new()
                } else {
                    format!(" [{}]", flags.join(", "))
                }
            );
        }
    }

    Ok(())
}
