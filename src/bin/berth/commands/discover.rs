//! `berth discover` command

use anyhow::{Context, Result};

use crate::cli::DiscoverArgs;
use crate::commands::Session;
use berth::testing::{discover_tests, TestContainer};
use berth::util::GlobalContext;

pub fn execute(args: DiscoverArgs, ctx: GlobalContext) -> Result<()> {
    let session = Session::new(ctx)?;

    let mut total = 0;
    for path in session.containers(&args.containers)? {
        let container = TestContainer::read(&path).with_context(|| format!("failed to read {}", path))?;
        let cases = discover_tests(&path, &container, &session.cancel)?;
        total += cases.len();
        for case in cases {
            println!("{}", case.fully_qualified_name);
        }
    }
    eprintln!("{} tests found", total);

    Ok(())
}
