//! Toolchain service - cargo invoked as a managed subprocess.
//!
//! Every operation blocks the calling thread until cargo exits or the
//! cancellation token fires. Build-like operations stream their output to a
//! [`BuildOutputSink`] as it is produced and report success as a plain
//! `bool`; the sink carries the details.

pub mod message;
pub mod sink;
pub mod target_info;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::core::path::NormalizedPath;
use crate::core::workspace::Workspace;
use crate::error::{Error, Result};
use crate::util::context::locate_cargo;
use crate::util::process::{OutputLine, ProcessBuilder, ProcessOutcome};
use crate::util::telemetry::Telemetry;

pub use message::{Artifact, BuildMessage, Diagnostic, Severity};
pub use sink::{BuildOutputSink, ChannelSink, ConsoleSink, SinkEvent};
pub use target_info::BuildTargetInfo;

/// Exit code cargo uses for ordinary failures (bad manifest, compile error).
pub const CARGO_FAILURE_EXIT_CODE: i32 = 101;

pub const CANCELED_MARKER: &str = "==== Cargo canceled ====";
pub const COMPLETED_MARKER: &str = "==== Cargo completed ====";

/// Result of a test build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestBuild {
    pub success: bool,
    /// Test harness artifacts that produced an executable, in build order
    pub artifacts: Vec<Artifact>,
}

/// The operations the rest of the crate needs from a toolchain.
pub trait Toolchain: Send + Sync {
    /// Query the workspace graph for a manifest. Never retries.
    fn fetch_metadata(&self, manifest: &NormalizedPath, cancel: &CancellationToken) -> Result<Workspace>;

    fn build(&self, info: &BuildTargetInfo, sink: &mut dyn BuildOutputSink, cancel: &CancellationToken) -> bool;

    fn clean(&self, info: &BuildTargetInfo, sink: &mut dyn BuildOutputSink, cancel: &CancellationToken) -> bool;

    /// Compile test harnesses without running them.
    fn build_tests(
        &self,
        info: &BuildTargetInfo,
        sink: &mut dyn BuildOutputSink,
        cancel: &CancellationToken,
    ) -> TestBuild;
}

/// [`Toolchain`] backed by the cargo executable.
pub struct CargoToolchain {
    configured_cargo: Option<PathBuf>,
    telemetry: Arc<dyn Telemetry>,
}

impl CargoToolchain {
    pub fn new(telemetry: Arc<dyn Telemetry>) -> Self {
        CargoToolchain {
            configured_cargo: None,
            telemetry,
        }
    }

    /// Prefer this cargo over `$CARGO` and `PATH`.
    pub fn with_cargo(mut self, cargo: Option<PathBuf>) -> Self {
        self.configured_cargo = cargo;
        self
    }

    /// The cargo executable operations will run.
    pub fn cargo(&self) -> Result<PathBuf> {
        locate_cargo(self.configured_cargo.as_deref())
    }

    fn run_metadata(&self, manifest: &NormalizedPath, cancel: &CancellationToken) -> Result<Workspace> {
        let cargo = self.cargo()?;
        let process = ProcessBuilder::new(&cargo)
            .args(metadata_args(manifest))
            .cwd(working_dir(manifest));

        let running = process.spawn().map_err(|source| Error::Spawn {
            program: cargo.display().to_string(),
            source,
        })?;
        let pid = running.id();
        let output = running.capture(cancel)?;

        match output.outcome {
            ProcessOutcome::Canceled => Err(Error::Canceled),
            ProcessOutcome::Exited(status) if !status.success() => {
                tracing::debug!("pid {} exited with {}", pid, status);
                Err(Error::ToolchainExit {
                    code: status.code(),
                    stderr_lines: output.stderr_lines,
                })
            }
            ProcessOutcome::Exited(_) => Workspace::from_metadata_json(&output.stdout, manifest),
        }
    }

    /// Shared lifecycle of build, clean and test builds.
    #[allow(clippy::too_many_arguments)]
    fn execute(
        &self,
        op: &str,
        info: &BuildTargetInfo,
        args: Vec<String>,
        sink: &mut dyn BuildOutputSink,
        cancel: &CancellationToken,
        decode: impl Fn(&str) -> Vec<BuildMessage>,
        mut observe: impl FnMut(&BuildMessage),
    ) -> bool {
        sink.clear();

        let cargo = match self.cargo() {
            Ok(cargo) => cargo,
            Err(e) => {
                tracing::error!("{}: {}", op, e);
                sink.write_line(BuildMessage::text("Error - Failed to start 'cargo'"));
                self.telemetry.track_exception(op, &e);
                return false;
            }
        };

        let arguments = args.join(" ");
        let cwd = info.working_dir();
        let cargo_path = cargo.display().to_string();
        self.telemetry.track_event(
            op,
            &[
                ("FilePath", info.manifest_path.as_str()),
                ("Profile", info.profile.as_str()),
                ("CargoPath", cargo_path.as_str()),
                ("Arguments", arguments.as_str()),
            ],
        );

        for line in banner(&cargo, &arguments, &cwd) {
            sink.write_line(BuildMessage::Text(line));
        }

        let process = ProcessBuilder::new(&cargo).args(&args).cwd(cwd.as_path());
        let running = match process.spawn() {
            Ok(running) => running,
            Err(source) => {
                let err = Error::Spawn {
                    program: cargo.display().to_string(),
                    source,
                };
                tracing::error!("{}: {}", op, err);
                sink.write_line(BuildMessage::text(format!(
                    "Error - Failed to start '{}'",
                    cargo.display()
                )));
                self.telemetry.track_exception(op, &err);
                return false;
            }
        };

        let outcome = running.stream(cancel, |line| match line {
            OutputLine::Stdout(line) => {
                for message in decode(&line) {
                    observe(&message);
                    sink.write_line(message);
                }
            }
            OutputLine::Stderr(line) => sink.write_line(BuildMessage::Text(line)),
        });

        match outcome {
            Ok(ProcessOutcome::Canceled) => {
                tracing::info!("{} canceled", op);
                sink.write_line(BuildMessage::text(CANCELED_MARKER));
                false
            }
            Ok(ProcessOutcome::Exited(status)) => {
                sink.write_line(BuildMessage::text(COMPLETED_MARKER));
                if !status.success() {
                    let code = status
                        .code()
                        .map_or_else(|| "signal".to_string(), |c| c.to_string());
                    self.telemetry
                        .track_event(&format!("{}_failed", op), &[("ExitCode", code.as_str())]);
                }
                status.success()
            }
            Err(e) => {
                tracing::error!("{}: lost track of cargo: {}", op, e);
                let err = Error::Io(e);
                self.telemetry.track_exception(op, &err);
                false
            }
        }
    }
}

impl Toolchain for CargoToolchain {
    fn fetch_metadata(&self, manifest: &NormalizedPath, cancel: &CancellationToken) -> Result<Workspace> {
        let result = self.run_metadata(manifest, cancel);
        if let Err(e) = &result {
            tracing::warn!("unable to obtain metadata for {}: {}", manifest, e);
            if !e.is_canceled() && e.exit_code() != Some(CARGO_FAILURE_EXIT_CODE) {
                self.telemetry.track_exception("fetch_metadata", e);
            }
        }
        result
    }

    fn build(&self, info: &BuildTargetInfo, sink: &mut dyn BuildOutputSink, cancel: &CancellationToken) -> bool {
        self.execute(
            "build",
            info,
            build_args(info),
            sink,
            cancel,
            |line| message::decode_line(&info.workspace_root, line),
            |_| {},
        )
    }

    fn clean(&self, info: &BuildTargetInfo, sink: &mut dyn BuildOutputSink, cancel: &CancellationToken) -> bool {
        self.execute(
            "clean",
            info,
            clean_args(info),
            sink,
            cancel,
            |line| vec![BuildMessage::text(line)],
            |_| {},
        )
    }

    fn build_tests(
        &self,
        info: &BuildTargetInfo,
        sink: &mut dyn BuildOutputSink,
        cancel: &CancellationToken,
    ) -> TestBuild {
        let mut artifacts = Vec::new();
        let success = self.execute(
            "build_tests",
            info,
            test_build_args(info),
            sink,
            cancel,
            |line| message::decode_line(&info.workspace_root, line),
            |message| {
                if let BuildMessage::Artifact(a) = message {
                    if a.test && a.executable.is_some() {
                        artifacts.push(a.clone());
                    }
                }
            },
        );
        TestBuild { success, artifacts }
    }
}

fn working_dir(manifest: &NormalizedPath) -> PathBuf {
    manifest
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

fn banner(cargo: &Path, arguments: &str, cwd: &NormalizedPath) -> Vec<String> {
    vec![
        String::new(),
        format!("=== Cargo started: cargo {} ===", arguments),
        format!("         Path: {}", cargo.display()),
        format!("    Arguments: {}", arguments),
        format!("   WorkingDir: {}", cwd),
        String::new(),
    ]
}

/// `cargo metadata` arguments for a manifest.
pub fn metadata_args(manifest: &NormalizedPath) -> Vec<String> {
    let mut args: Vec<String> = ["metadata", "--no-deps", "--format-version", "1", "--manifest-path"]
        .into_iter()
        .map(String::from)
        .collect();
    args.push(manifest.to_string());
    args.push("--offline".to_string());
    args
}

/// `cargo build` arguments.
pub fn build_args(info: &BuildTargetInfo) -> Vec<String> {
    let mut args = vec![
        "build".to_string(),
        "--manifest-path".to_string(),
        info.manifest_path.to_string(),
    ];
    args.extend(info.additional_build_args.iter().cloned());
    args.extend(profile_and_format(info));
    args
}

/// `cargo clean` arguments.
pub fn clean_args(info: &BuildTargetInfo) -> Vec<String> {
    vec![
        "clean".to_string(),
        "--manifest-path".to_string(),
        info.manifest_path.to_string(),
        "--profile".to_string(),
        info.profile.clone(),
    ]
}

/// `cargo test --no-run` arguments.
pub fn test_build_args(info: &BuildTargetInfo) -> Vec<String> {
    let mut args = vec![
        "test".to_string(),
        "--no-run".to_string(),
        "--manifest-path".to_string(),
        info.manifest_path.to_string(),
    ];
    args.extend(info.additional_build_args.iter().cloned());
    args.extend(profile_and_format(info));
    args
}

fn profile_and_format(info: &BuildTargetInfo) -> [String; 4] {
    [
        "--profile".to_string(),
        info.profile.clone(),
        "--message-format".to_string(),
        "json".to_string(),
    ]
}
