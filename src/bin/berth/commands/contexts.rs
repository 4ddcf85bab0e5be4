//! `berth contexts` command

use anyhow::Result;

use crate::cli::ContextsArgs;
use crate::commands::Session;
use berth::ops::{file_contexts, output_references};
use berth::util::GlobalContext;

pub fn execute(args: ContextsArgs, ctx: GlobalContext) -> Result<()> {
    let session = Session::new(ctx)?;
    let file = session.ctx.resolve_path(&args.file);

    let contexts = file_contexts(&session.service, session.settings.as_ref(), &file, &session.cancel);
    if contexts.is_empty() {
        println!("no build actions for {}", file);
    }
    for context in &contexts {
        let mut line = format!("{:<6} {:<8} {}", context.kind, context.display_name, context.info.manifest_path);
        if !context.info.additional_build_args.is_empty() {
            line.push(' ');
            line.push_str(&context.info.additional_build_args.join(" "));
        }
        println!("{}", line);
    }

    for reference in output_references(&session.service, &file, &session.cancel) {
        match (&reference.target, &reference.relative_artifact) {
            (Some(target), Some(relative)) => {
                println!("output {:<8} {} -> {}", reference.profile, target, relative.display())
            }
            (Some(target), None) => println!("output {:<8} {}", reference.profile, target),
            _ => println!("output {:<8}", reference.profile),
        }
    }

    Ok(())
}
