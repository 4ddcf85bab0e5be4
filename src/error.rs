//! Library error type.

use std::io;

use thiserror::Error;

use crate::core::path::NormalizedPath;

/// Errors raised by the metadata, toolchain and container layers.
#[derive(Debug, Error)]
pub enum Error {
    #[error("could not locate `{program}`; set `[toolchain] cargo` or the CARGO environment variable")]
    ToolchainNotFound { program: String },

    #[error("failed to start `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{}", exit_message(*.code, .stderr_lines))]
    ToolchainExit {
        code: Option<i32>,
        stderr_lines: Vec<String>,
    },

    #[error("operation canceled")]
    Canceled,

    #[error("invalid metadata for {manifest}")]
    MetadataDecode {
        manifest: NormalizedPath,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("no package owns {manifest}")]
    PackageNotFound { manifest: NormalizedPath },

    #[error("listing the tests of {executable} failed with exit code {code:?}")]
    TestListing {
        executable: NormalizedPath,
        code: Option<i32>,
    },

    #[error("invalid test container {path}: {message}")]
    Container {
        path: NormalizedPath,
        message: String,
    },
}

fn exit_message(code: Option<i32>, stderr_lines: &[String]) -> String {
    let status = match code {
        Some(code) => format!("cargo exited with code {}", code),
        None => "cargo was terminated by a signal".to_string(),
    };
    // The last non-empty stderr line is usually the `error: ...` summary.
    match stderr_lines.iter().rev().find(|l| !l.trim().is_empty()) {
        Some(line) => format!("{}: {}", status, line.trim()),
        None => status,
    }
}

impl Error {
    /// Exit code of a failed toolchain run, if that is what this is.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Error::ToolchainExit { code, .. } => *code,
            _ => None,
        }
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, Error::Canceled)
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
