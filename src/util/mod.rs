//! Shared utilities

pub mod config;
pub mod context;
pub mod fs;
pub mod process;
pub mod telemetry;

pub use config::Config;
pub use context::GlobalContext;
