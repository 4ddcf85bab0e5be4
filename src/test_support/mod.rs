//! Test utilities and mocks for berth unit tests.
//!
//! Stand-ins for the pieces that normally talk to cargo or to a host: a
//! toolchain that counts its calls, sinks and telemetry that record what
//! they receive, and a shell script that impersonates cargo.
//!
//! # Example
//!
//! ```rust,ignore
//! use berth::test_support::{CountingToolchain, RecordingSink};
//!
//! #[test]
//! fn test_example() {
//!     let toolchain = Arc::new(CountingToolchain::new());
//!     let service = MetadataService::new(toolchain.clone(), NormalizedPath::new("/ws"));
//!     // Use the service...
//!     assert_eq!(toolchain.metadata_calls(), 1);
//! }
//! ```

pub mod fixtures;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::core::path::NormalizedPath;
use crate::core::workspace::Workspace;
use crate::error::{Error, Result};
use crate::toolchain::{BuildMessage, BuildOutputSink, BuildTargetInfo, TestBuild, Toolchain};
use crate::util::telemetry::Telemetry;

// Re-export fixtures for convenience
pub use fixtures::*;

/// Write `contents` to `path`, creating parent directories.
pub fn write_file(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}

/// Write an executable shell script named `cargo` into `dir`.
#[cfg(unix)]
pub fn fake_cargo(dir: &Path, script_body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("cargo");
    write_file(&path, &format!("#!/bin/sh\n{}\n", script_body));
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Sink that keeps everything it is given.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub clears: usize,
    pub messages: Vec<BuildMessage>,
}

impl RecordingSink {
    /// Messages as they would be displayed.
    pub fn lines(&self) -> Vec<String> {
        self.messages.iter().map(ToString::to_string).collect()
    }
}

impl BuildOutputSink for RecordingSink {
    fn clear(&mut self) {
        self.clears += 1;
        self.messages.clear();
    }

    fn write_line(&mut self, message: BuildMessage) {
        self.messages.push(message);
    }
}

/// Sink that cancels a token once a given line shows up.
#[derive(Debug)]
pub struct CancelOnLine {
    cancel: CancellationToken,
    trigger: String,
    pub inner: RecordingSink,
}

impl CancelOnLine {
    pub fn new(cancel: CancellationToken, trigger: &str) -> Self {
        CancelOnLine {
            cancel,
            trigger: trigger.to_string(),
            inner: RecordingSink::default(),
        }
    }
}

impl BuildOutputSink for CancelOnLine {
    fn clear(&mut self) {
        self.inner.clear();
    }

    fn write_line(&mut self, message: BuildMessage) {
        if message.as_text() == Some(self.trigger.as_str()) {
            self.cancel.cancel();
        }
        self.inner.write_line(message);
    }
}

/// Telemetry that remembers event names and exception sites.
#[derive(Debug, Default)]
pub struct RecordingTelemetry {
    events: Mutex<Vec<String>>,
    exceptions: Mutex<Vec<String>>,
}

impl RecordingTelemetry {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn exceptions(&self) -> Vec<String> {
        self.exceptions.lock().unwrap().clone()
    }
}

impl Telemetry for RecordingTelemetry {
    fn track_event(&self, name: &str, _properties: &[(&str, &str)]) {
        self.events.lock().unwrap().push(name.to_string());
    }

    fn track_exception(&self, site: &str, _error: &dyn std::error::Error) {
        self.exceptions.lock().unwrap().push(site.to_string());
    }
}

/// Toolchain that answers from memory and counts how often it is asked.
///
/// Metadata comes from [`sample_metadata`] unless replaced. Builds report
/// the configured result without producing output beyond one text line.
#[derive(Debug)]
pub struct CountingToolchain {
    metadata: String,
    delay: Duration,
    failures_left: AtomicUsize,
    metadata_calls: AtomicUsize,
    build_calls: Mutex<Vec<BuildTargetInfo>>,
    build_result: bool,
    test_build: TestBuild,
}

impl CountingToolchain {
    pub fn new() -> Self {
        CountingToolchain {
            metadata: sample_metadata(),
            delay: Duration::ZERO,
            failures_left: AtomicUsize::new(0),
            metadata_calls: AtomicUsize::new(0),
            build_calls: Mutex::new(Vec::new()),
            build_result: true,
            test_build: TestBuild {
                success: true,
                artifacts: Vec::new(),
            },
        }
    }

    /// Answer metadata queries with this document instead.
    pub fn with_metadata(mut self, metadata: String) -> Self {
        self.metadata = metadata;
        self
    }

    /// Sleep this long inside every metadata query.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fail the first `n` metadata queries the way cargo does for a broken
    /// manifest.
    pub fn failing_first(self, n: usize) -> Self {
        self.failures_left.store(n, Ordering::SeqCst);
        self
    }

    pub fn with_build_result(mut self, ok: bool) -> Self {
        self.build_result = ok;
        self
    }

    pub fn with_test_build(mut self, test_build: TestBuild) -> Self {
        self.test_build = test_build;
        self
    }

    pub fn metadata_calls(&self) -> usize {
        self.metadata_calls.load(Ordering::SeqCst)
    }

    /// Every build, clean and test build request, in call order.
    pub fn build_calls(&self) -> Vec<BuildTargetInfo> {
        self.build_calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, info: &BuildTargetInfo, sink: &mut dyn BuildOutputSink, op: &str) {
        self.build_calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(info.clone());
        sink.clear();
        sink.write_line(BuildMessage::text(format!("{} {}", op, info.manifest_path)));
    }
}

impl Default for CountingToolchain {
    fn default() -> Self {
        Self::new()
    }
}

impl Toolchain for CountingToolchain {
    fn fetch_metadata(&self, manifest: &NormalizedPath, _cancel: &CancellationToken) -> Result<Workspace> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }

        let failed = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(Error::ToolchainExit {
                code: Some(101),
                stderr_lines: vec!["error: failed to parse manifest".to_string()],
            });
        }

        Workspace::from_metadata_json(&self.metadata, manifest)
    }

    fn build(&self, info: &BuildTargetInfo, sink: &mut dyn BuildOutputSink, _cancel: &CancellationToken) -> bool {
        self.record(info, sink, "build");
        self.build_result
    }

    fn clean(&self, info: &BuildTargetInfo, sink: &mut dyn BuildOutputSink, _cancel: &CancellationToken) -> bool {
        self.record(info, sink, "clean");
        self.build_result
    }

    fn build_tests(
        &self,
        info: &BuildTargetInfo,
        sink: &mut dyn BuildOutputSink,
        _cancel: &CancellationToken,
    ) -> TestBuild {
        self.record(info, sink, "test");
        self.test_build.clone()
    }
}
