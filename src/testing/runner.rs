//! Test discovery and execution over the executables of a container.
//!
//! Both talk to libtest harnesses directly: discovery runs
//! `<exe> --list --format terse`, execution runs `<exe> --exact <names>`
//! and reads the `test <name> ... <result>` lines back.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use tokio_util::sync::CancellationToken;

use crate::core::path::NormalizedPath;
use crate::error::{Error, Result};
use crate::testing::container::{TestContainer, TestExecutable};
use crate::util::process::{OutputLine, ProcessBuilder, ProcessOutcome};

static RESULT_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^test (\S+) \.\.\. (ok|FAILED|ignored)").expect("valid regex"));

static FAILURE_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^---- (\S+) stdout ----$").expect("valid regex"));

/// A test found in a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    /// `<executable>.<test path with :: replaced by .>`
    pub fully_qualified_name: String,
    /// The name as the harness knows it, e.g. `tests::it_works`
    pub test_path: String,
    pub container: NormalizedPath,
    pub executable: NormalizedPath,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestOutcome {
    Passed,
    Failed,
    Skipped,
    /// The name does not address a test of the container
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestResult {
    pub container: NormalizedPath,
    pub fully_qualified_name: String,
    pub outcome: TestOutcome,
    /// Captured output of a failed test
    pub output: Option<String>,
}

/// Fully qualified name of a test of `executable`.
pub fn fully_qualified_name(executable: &TestExecutable, test_path: &str) -> String {
    format!("{}.{}", executable.name, test_path.replace("::", "."))
}

fn test_path(rest: &str) -> String {
    rest.replace('.', "::")
}

/// Test names from `--list --format terse` output. Benchmarks are skipped.
pub fn parse_test_list(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| line.trim_end().strip_suffix(": test"))
        .map(str::to_string)
        .collect()
}

/// List the tests of every executable in a container.
pub fn discover_tests(
    container_path: &NormalizedPath,
    container: &TestContainer,
    cancel: &CancellationToken,
) -> Result<Vec<TestCase>> {
    let mut cases = Vec::new();

    for exe in &container.executables {
        let process = ProcessBuilder::new(exe.path.as_path())
            .args(["--list", "--format", "terse"])
            .args(&container.discovery_args)
            .envs(&container.environment)
            .cwd(container.working_dir().as_path());

        let running = process.spawn().map_err(|source| Error::Spawn {
            program: exe.path.to_string(),
            source,
        })?;
        let output = running.capture(cancel)?;

        match output.outcome {
            ProcessOutcome::Canceled => return Err(Error::Canceled),
            outcome if !outcome.success() => {
                for line in &output.stderr_lines {
                    tracing::debug!("{}: {}", exe.name, line);
                }
                return Err(Error::TestListing {
                    executable: exe.path.clone(),
                    code: outcome.code(),
                });
            }
            _ => {}
        }

        let names = parse_test_list(&output.stdout);
        tracing::debug!("{} tests in {}", names.len(), exe.path);
        cases.extend(names.into_iter().map(|name| TestCase {
            fully_qualified_name: fully_qualified_name(exe, &name),
            test_path: name,
            container: container_path.clone(),
            executable: exe.path.clone(),
        }));
    }

    Ok(cases)
}

/// Run the named tests of a container. Results come back in the order the
/// names were given.
///
/// Tests are grouped by executable and each executable runs once. A name
/// that no executable reports comes back as [`TestOutcome::NotFound`].
pub fn run_tests(
    container_path: &NormalizedPath,
    container: &TestContainer,
    names: &[String],
    cancel: &CancellationToken,
) -> Result<Vec<TestResult>> {
    let mut groups: Vec<(&TestExecutable, Vec<String>)> = Vec::new();
    for name in names {
        let Some((exe, rest)) = container.split_name(name) else {
            tracing::warn!("{} does not name a test of {}", name, container_path);
            continue;
        };
        let path = test_path(rest);
        match groups.iter_mut().find(|(e, _)| e.name == exe.name) {
            Some((_, paths)) if paths.contains(&path) => {}
            Some((_, paths)) => paths.push(path),
            None => groups.push((exe, vec![path])),
        }
    }

    let mut reported: HashMap<String, (TestOutcome, Option<String>)> = HashMap::new();
    for (exe, paths) in groups {
        for (path, outcome, output) in run_executable(container, exe, &paths, cancel)? {
            reported.insert(fully_qualified_name(exe, &path), (outcome, output));
        }
    }

    Ok(names
        .iter()
        .map(|name| {
            let (outcome, output) = reported
                .get(name)
                .cloned()
                .unwrap_or((TestOutcome::NotFound, None));
            TestResult {
                container: container_path.clone(),
                fully_qualified_name: name.clone(),
                outcome,
                output,
            }
        })
        .collect())
}

type Reported = (String, TestOutcome, Option<String>);

fn run_executable(
    container: &TestContainer,
    exe: &TestExecutable,
    paths: &[String],
    cancel: &CancellationToken,
) -> Result<Vec<Reported>> {
    let process = ProcessBuilder::new(exe.path.as_path())
        .arg("--exact")
        .args(paths)
        .args(&container.execution_args)
        .envs(&container.environment)
        .cwd(container.working_dir().as_path());
    tracing::info!("running {}", process.display_command());

    let running = process.spawn().map_err(|source| Error::Spawn {
        program: exe.path.to_string(),
        source,
    })?;

    let mut stdout = Vec::new();
    let outcome = running.stream(cancel, |line| match line {
        OutputLine::Stdout(line) => stdout.push(line),
        OutputLine::Stderr(line) => tracing::debug!("{}: {}", exe.name, line),
    })?;

    match outcome {
        ProcessOutcome::Canceled => Err(Error::Canceled),
        // libtest exits with 101 when a test failed; the result lines say which.
        ProcessOutcome::Exited(_) => Ok(parse_results(&stdout)),
    }
}

/// Outcomes and failure output from the stdout of a harness run.
fn parse_results(lines: &[String]) -> Vec<Reported> {
    let mut results: Vec<Reported> = lines
        .iter()
        .filter_map(|line| RESULT_LINE.captures(line))
        .map(|caps| {
            let outcome = match &caps[2] {
                "ok" => TestOutcome::Passed,
                "FAILED" => TestOutcome::Failed,
                _ => TestOutcome::Skipped,
            };
            (caps[1].to_string(), outcome, None)
        })
        .collect();

    let mut failures = failure_output(lines);
    for (path, outcome, output) in &mut results {
        if *outcome == TestOutcome::Failed {
            *output = failures.remove(path.as_str());
        }
    }
    results
}

fn failure_output(lines: &[String]) -> HashMap<String, String> {
    let mut sections = HashMap::new();
    let mut current: Option<(String, Vec<&str>)> = None;

    for line in lines {
        let header = FAILURE_HEADER.captures(line);
        let ends_section = header.is_some() || line == "failures:";

        if ends_section {
            if let Some((name, body)) = current.take() {
                sections.insert(name, body.join("\n").trim_end().to_string());
            }
        }
        if let Some(caps) = header {
            current = Some((caps[1].to_string(), Vec::new()));
        } else if let Some((_, body)) = &mut current {
            body.push(line);
        }
    }

    if let Some((name, body)) = current {
        sections.insert(name, body.join("\n").trim_end().to_string());
    }
    sections
}
