//! berth CLI - cargo workspaces, builds and test containers from the command line

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use berth::util::GlobalContext;
use cli::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // Parse CLI
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("berth=debug")
    } else {
        EnvFilter::new("berth=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let mut ctx = GlobalContext::new(cli.root.as_deref())?;
    ctx.set_verbose(cli.verbose);

    // Execute command
    match cli.command {
        Commands::Metadata(args) => commands::metadata::execute(args, ctx),
        Commands::Resolve(args) => commands::resolve::execute(args, ctx),
        Commands::Contexts(args) => commands::contexts::execute(args, ctx),
        Commands::Build(args) => commands::build::execute(args, ctx),
        Commands::Clean(args) => commands::clean::execute(args, ctx),
        Commands::Containers(args) => commands::containers::execute(args, ctx),
        Commands::Discover(args) => commands::discover::execute(args, ctx),
        Commands::Test(args) => commands::test::execute(args, ctx),
    }
}
