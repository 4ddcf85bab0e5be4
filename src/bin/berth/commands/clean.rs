//! `berth clean` command

use anyhow::{bail, Result};

use crate::cli::CleanArgs;
use crate::commands::Session;
use berth::toolchain::target_info::configured_profile;
use berth::toolchain::{BuildTargetInfo, ConsoleSink};
use berth::util::GlobalContext;

pub fn execute(args: CleanArgs, ctx: GlobalContext) -> Result<()> {
    let session = Session::new(ctx)?;
    let manifest = session.manifest(args.manifest.as_deref());
    let profile = args
        .profile
        .unwrap_or_else(|| configured_profile(session.settings.as_ref(), &manifest));
    let info = BuildTargetInfo::new(session.ctx.workspace_root().clone(), manifest.clone(), profile);

    let mut sink = ConsoleSink::default();
    if !session.service.toolchain().clean(&info, &mut sink, &session.cancel) {
        bail!("clean of {} failed", manifest);
    }
    eprintln!("     Removed {} outputs of {}", info.profile, manifest);

    Ok(())
}
