//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// berth - drive cargo the way an IDE does
#[derive(Parser)]
#[command(name = "berth")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Workspace root (defaults to the outermost directory holding a Cargo.toml)
    #[arg(long, global = true, value_name = "DIR")]
    pub root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the packages and targets of a manifest
    Metadata(MetadataArgs),

    /// Show which manifest governs a file
    Resolve(ResolveArgs),

    /// List the build actions and outputs of a file
    Contexts(ContextsArgs),

    /// Build a manifest
    Build(BuildArgs),

    /// Remove the build outputs of a manifest
    Clean(CleanArgs),

    /// List the test containers of the loaded packages
    Containers(ContainersArgs),

    /// List the tests in test containers
    Discover(DiscoverArgs),

    /// Run tests from test containers
    Test(TestArgs),
}

#[derive(Args)]
pub struct MetadataArgs {
    /// Manifest to query (defaults to the workspace manifest)
    pub manifest: Option<PathBuf>,

    /// Print the raw package list as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct ResolveArgs {
    /// File or directory
    pub path: PathBuf,
}

#[derive(Args)]
pub struct ContextsArgs {
    /// Manifest or source file
    pub file: PathBuf,
}

#[derive(Args)]
pub struct BuildArgs {
    /// Manifest to build (defaults to the workspace manifest)
    pub manifest: Option<PathBuf>,

    /// Profile to build with (defaults to the configured profile)
    #[arg(long)]
    pub profile: Option<String>,

    /// Build test harnesses and write test containers instead
    #[arg(long)]
    pub tests: bool,

    /// Also print artifact messages
    #[arg(long)]
    pub artifacts: bool,
}

#[derive(Args)]
pub struct CleanArgs {
    /// Manifest to clean (defaults to the workspace manifest)
    pub manifest: Option<PathBuf>,

    /// Profile to clean (defaults to the configured profile)
    #[arg(long)]
    pub profile: Option<String>,
}

#[derive(Args)]
pub struct ContainersArgs {
    /// Manifest whose packages to load (defaults to the workspace manifest)
    pub manifest: Option<PathBuf>,
}

#[derive(Args)]
pub struct DiscoverArgs {
    /// Container files (defaults to every container in the target directory)
    pub containers: Vec<PathBuf>,
}

#[derive(Args)]
pub struct TestArgs {
    /// Only run tests whose fully qualified name contains one of these
    pub filters: Vec<String>,

    /// Container files (defaults to every container in the target directory)
    #[arg(long = "container", value_name = "FILE")]
    pub containers: Vec<PathBuf>,
}
