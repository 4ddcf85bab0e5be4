//! `berth build` command

use anyhow::{bail, Result};

use crate::cli::BuildArgs;
use crate::commands::Session;
use berth::ops::build_tests;
use berth::toolchain::target_info::configured_profile;
use berth::toolchain::{BuildTargetInfo, ConsoleSink};
use berth::util::GlobalContext;

pub fn execute(args: BuildArgs, ctx: GlobalContext) -> Result<()> {
    let session = Session::new(ctx)?;
    let manifest = session.manifest(args.manifest.as_deref());
    let mut sink = ConsoleSink {
        show_artifacts: args.artifacts,
    };

    if args.tests {
        let outcome = build_tests(&session.service, session.settings.as_ref(), &manifest, &mut sink, &session.cancel)?;
        if !outcome.success {
            bail!("test build of {} failed", manifest);
        }
        for container in &outcome.containers {
            eprintln!("     Written {}", container);
        }
        return Ok(());
    }

    let profile = args
        .profile
        .unwrap_or_else(|| configured_profile(session.settings.as_ref(), &manifest));
    let info = BuildTargetInfo::new(session.ctx.workspace_root().clone(), manifest.clone(), profile)
        .with_settings(session.settings.as_ref(), &manifest);

    if !session.service.toolchain().build(&info, &mut sink, &session.cancel) {
        bail!("build of {} failed", manifest);
    }
    eprintln!("    Finished {} ({})", manifest, info.profile);

    Ok(())
}
