//! Build messages decoded from `cargo --message-format json` output.
//!
//! Cargo prints one JSON object per line, tagged by `reason`. Diagnostics and
//! artifacts are turned into typed messages; anything that is not JSON (a
//! stderr line, a banner) travels as raw text.

use std::fmt;

use serde::Deserialize;

use crate::core::path::NormalizedPath;
use crate::core::target::Target;

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Severity {
    Error,
    Warning,
    Note,
    Help,
    FailureNote,
    /// Levels newer than this crate knows about, including ICEs.
    #[serde(other)]
    Other,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error | Severity::Other => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Note => write!(f, "note"),
            Severity::Help => write!(f, "help"),
            Severity::FailureNote => write!(f, "failure-note"),
        }
    }
}

/// A compiler diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    /// Error code, e.g. `E0425`
    pub code: Option<String>,
    /// The diagnostic as rustc would print it
    pub rendered: Option<String>,
    pub file: Option<NormalizedPath>,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

/// A compiled artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Package identifier as cargo prints it
    pub package_id: String,
    /// Manifest of the package the artifact belongs to
    pub manifest_path: Option<NormalizedPath>,
    /// Target the artifact was compiled from
    pub target: Target,
    /// Whether this is a test harness build
    pub test: bool,
    /// Path of the executable, for targets that produce one
    pub executable: Option<NormalizedPath>,
    /// Whether cargo reused a previous build
    pub fresh: bool,
}

/// One message of build output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildMessage {
    Diagnostic(Diagnostic),
    Artifact(Artifact),
    Text(String),
}

impl BuildMessage {
    pub fn text(line: impl Into<String>) -> Self {
        BuildMessage::Text(line.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            BuildMessage::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_artifact(&self) -> Option<&Artifact> {
        match self {
            BuildMessage::Artifact(a) => Some(a),
            _ => None,
        }
    }
}

impl fmt::Display for BuildMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildMessage::Diagnostic(d) => {
                if let Some(rendered) = &d.rendered {
                    return f.write_str(rendered.trim_end());
                }
                if let Some(file) = &d.file {
                    write!(
                        f,
                        "{}({},{}): ",
                        file,
                        d.line.unwrap_or(0),
                        d.column.unwrap_or(0)
                    )?;
                }
                write!(f, "{}: {}", d.severity, d.message)
            }
            BuildMessage::Artifact(a) => match &a.executable {
                Some(exe) => write!(f, "{} -> {}", a.target.name, exe),
                None => write!(f, "{}", a.target.name),
            },
            BuildMessage::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "reason")]
enum RawMessage {
    #[serde(rename = "compiler-message")]
    CompilerMessage { message: RawDiagnostic },

    #[serde(rename = "compiler-artifact")]
    CompilerArtifact {
        package_id: String,
        #[serde(default)]
        manifest_path: Option<NormalizedPath>,
        target: Target,
        #[serde(default)]
        profile: RawProfile,
        #[serde(default)]
        executable: Option<NormalizedPath>,
        #[serde(default)]
        fresh: bool,
    },

    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct RawDiagnostic {
    message: String,
    level: Severity,
    #[serde(default)]
    code: Option<RawCode>,
    #[serde(default)]
    rendered: Option<String>,
    #[serde(default)]
    spans: Vec<RawSpan>,
}

#[derive(Debug, Deserialize)]
struct RawCode {
    code: String,
}

#[derive(Debug, Deserialize)]
struct RawSpan {
    file_name: String,
    line_start: u32,
    column_start: u32,
    #[serde(default)]
    is_primary: bool,
}

#[derive(Debug, Default, Deserialize)]
struct RawProfile {
    #[serde(default)]
    test: bool,
}

/// Decode one line of `--message-format json` output.
///
/// Relative span paths are resolved against `workspace_root`. Lines that
/// are not cargo JSON come back as text; JSON messages this crate has no use
/// for (build scripts, `build-finished`) produce nothing.
pub fn decode_line(workspace_root: &NormalizedPath, line: &str) -> Vec<BuildMessage> {
    if !line.trim_start().starts_with('{') {
        return vec![BuildMessage::text(line)];
    }

    let raw: RawMessage = match serde_json::from_str(line) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::trace!("not a cargo message ({}): {}", e, line);
            return vec![BuildMessage::text(line)];
        }
    };

    match raw {
        RawMessage::CompilerMessage { message } => {
            vec![BuildMessage::Diagnostic(diagnostic(workspace_root, message))]
        }
        RawMessage::CompilerArtifact {
            package_id,
            manifest_path,
            target,
            profile,
            executable,
            fresh,
        } => vec![BuildMessage::Artifact(Artifact {
            package_id,
            manifest_path,
            target,
            test: profile.test,
            executable,
            fresh,
        })],
        RawMessage::Other => Vec::new(),
    }
}

fn diagnostic(workspace_root: &NormalizedPath, raw: RawDiagnostic) -> Diagnostic {
    let span = raw
        .spans
        .iter()
        .find(|s| s.is_primary)
        .or_else(|| raw.spans.first());

    Diagnostic {
        severity: raw.level,
        message: raw.message,
        code: raw.code.map(|c| c.code),
        rendered: raw.rendered,
        file: span.map(|s| workspace_root.join(&s.file_name)),
        line: span.map(|s| s.line_start),
        column: span.map(|s| s.column_start),
    }
}
