//! Target definitions - the buildable units inside a package.
//!
//! A Target is one of the library, binaries, examples, test harnesses or
//! benchmarks cargo reports for a package. Targets are decoded straight from
//! `cargo metadata` and never change afterwards.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::manifest::TEST_CONTAINER_EXTENSION;
use crate::core::path::NormalizedPath;

/// The kind of a target as reported by cargo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetKind {
    #[serde(rename = "lib")]
    Lib,
    #[serde(rename = "rlib")]
    RLib,
    #[serde(rename = "dylib")]
    DyLib,
    #[serde(rename = "cdylib")]
    CdyLib,
    #[serde(rename = "staticlib")]
    StaticLib,
    #[serde(rename = "proc-macro")]
    ProcMacro,
    #[serde(rename = "bin")]
    Bin,
    #[serde(rename = "example")]
    Example,
    #[serde(rename = "test")]
    Test,
    #[serde(rename = "bench")]
    Bench,
    #[serde(rename = "custom-build")]
    CustomBuild,
    /// Anything newer than this crate knows about.
    #[serde(other)]
    Other,
}

impl TargetKind {
    /// The name cargo uses for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Lib => "lib",
            TargetKind::RLib => "rlib",
            TargetKind::DyLib => "dylib",
            TargetKind::CdyLib => "cdylib",
            TargetKind::StaticLib => "staticlib",
            TargetKind::ProcMacro => "proc-macro",
            TargetKind::Bin => "bin",
            TargetKind::Example => "example",
            TargetKind::Test => "test",
            TargetKind::Bench => "bench",
            TargetKind::CustomBuild => "custom-build",
            TargetKind::Other => "other",
        }
    }

    /// Whether a target of this kind can be launched.
    pub fn is_runnable(&self) -> bool {
        matches!(self, TargetKind::Bin | TargetKind::Example)
    }

    /// Whether a target of this kind gets its own test container.
    pub fn can_have_tests(&self) -> bool {
        matches!(
            self,
            TargetKind::Lib | TargetKind::RLib | TargetKind::Bin | TargetKind::ProcMacro
        )
    }
}

/// The kind of artifact a target's compilation produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrateType {
    #[serde(rename = "lib")]
    Lib,
    #[serde(rename = "rlib")]
    RLib,
    #[serde(rename = "dylib")]
    DyLib,
    #[serde(rename = "cdylib")]
    CdyLib,
    #[serde(rename = "staticlib")]
    StaticLib,
    #[serde(rename = "proc-macro")]
    ProcMacro,
    #[serde(rename = "bin")]
    Bin,
    /// A crate type this crate does not know; its artifact is the bare name.
    #[serde(other)]
    Unknown,
}

impl CrateType {
    /// File name prefix of the artifact.
    pub fn prefix(&self) -> &'static str {
        match self {
            CrateType::Lib | CrateType::RLib => "lib",
            CrateType::DyLib
            | CrateType::CdyLib
            | CrateType::StaticLib
            | CrateType::ProcMacro
            | CrateType::Bin
            | CrateType::Unknown => "",
        }
    }

    /// File name extension of the artifact, including the dot.
    ///
    /// These are the names build outputs are cross-checked against, so they
    /// must not be "corrected" to platform conventions.
    pub fn extension(&self) -> &'static str {
        match self {
            CrateType::Lib | CrateType::RLib => ".rlib",
            CrateType::DyLib => ".dylib",
            CrateType::CdyLib => ".cydlib",
            CrateType::StaticLib => ".staticlib",
            CrateType::ProcMacro => ".procmacro",
            CrateType::Bin => ".exe",
            CrateType::Unknown => "",
        }
    }

    /// The artifact file name for a target with this crate type.
    pub fn artifact_file_name(&self, name: &str) -> String {
        format!("{}{}{}", self.prefix(), name, self.extension())
    }
}

/// A build target of a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Target name (the crate name for libraries, the file stem for tests)
    pub name: String,

    /// Target kinds; the first one decides how the target is treated
    #[serde(rename = "kind")]
    pub kinds: Vec<TargetKind>,

    /// Crate types; the first one decides the artifact name
    #[serde(default)]
    pub crate_types: Vec<CrateType>,

    /// Root source file of the target
    pub src_path: NormalizedPath,
}

impl Target {
    /// Create a target with one kind and one crate type.
    pub fn new(
        name: impl Into<String>,
        kind: TargetKind,
        crate_type: CrateType,
        src_path: NormalizedPath,
    ) -> Self {
        Target {
            name: name.into(),
            kinds: vec![kind],
            crate_types: vec![crate_type],
            src_path,
        }
    }

    /// The primary kind.
    pub fn kind(&self) -> TargetKind {
        self.kinds.first().copied().unwrap_or(TargetKind::Other)
    }

    /// The primary crate type.
    pub fn crate_type(&self) -> Option<CrateType> {
        self.crate_types.first().copied()
    }

    pub fn is_runnable(&self) -> bool {
        self.kind().is_runnable()
    }

    pub fn can_have_tests(&self) -> bool {
        self.kind().can_have_tests()
    }

    pub fn is_example(&self) -> bool {
        self.kind() == TargetKind::Example
    }

    /// Arguments that select this target on a cargo command line.
    pub fn additional_build_args(&self) -> Vec<String> {
        if self.is_example() {
            vec!["--example".to_string(), self.name.clone()]
        } else {
            Vec::new()
        }
    }

    /// File name of the artifact this target produces.
    pub fn artifact_file_name(&self) -> String {
        match self.crate_type() {
            Some(crate_type) => crate_type.artifact_file_name(&self.name),
            None => self.name.clone(),
        }
    }

    /// Path of the artifact under a profile output directory.
    ///
    /// Examples build into the `examples` subdirectory.
    pub fn artifact_path(&self, profile_dir: &NormalizedPath) -> NormalizedPath {
        let dir = if self.is_example() {
            profile_dir.join("examples")
        } else {
            profile_dir.clone()
        };
        dir.join(self.artifact_file_name())
    }

    /// File name of the test harness executable built for this target.
    pub fn test_harness_file_name(&self) -> String {
        CrateType::Bin.artifact_file_name(&self.name)
    }

    /// File name of this target's test container.
    pub fn test_container_file_name(&self) -> String {
        let harness = NormalizedPath::new(self.test_harness_file_name());
        let stem = harness.file_stem().unwrap_or(&self.name);
        format!("{}.{}", stem, TEST_CONTAINER_EXTENSION)
    }

    /// Path of this target's test container under a profile output directory.
    pub fn test_container_path(&self, profile_dir: &NormalizedPath) -> NormalizedPath {
        profile_dir.join(self.test_container_file_name())
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?})", self.name, self.kind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(name: &str, kind: TargetKind, crate_type: CrateType) -> Target {
        Target::new(name, kind, crate_type, NormalizedPath::new("/ws/src/lib.rs"))
    }

    #[test]
    fn test_artifact_naming_table() {
        let cases = [
            (CrateType::Lib, "libhello_lib.rlib"),
            (CrateType::RLib, "libhello_lib.rlib"),
            (CrateType::DyLib, "hello_lib.dylib"),
            (CrateType::CdyLib, "hello_lib.cydlib"),
            (CrateType::StaticLib, "hello_lib.staticlib"),
            (CrateType::ProcMacro, "hello_lib.procmacro"),
            (CrateType::Bin, "hello_lib.exe"),
        ];
        for (crate_type, expected) in cases {
            assert_eq!(crate_type.artifact_file_name("hello_lib"), expected);
        }
    }

    #[test]
    fn test_target_artifact_file_name() {
        assert_eq!(
            target("hello_lib", TargetKind::Lib, CrateType::Lib).artifact_file_name(),
            "libhello_lib.rlib"
        );
        assert_eq!(
            target("hello_world", TargetKind::Bin, CrateType::Bin).artifact_file_name(),
            "hello_world.exe"
        );
    }

    #[test]
    fn test_examples_build_into_examples_dir() {
        let profile_dir = NormalizedPath::new("/ws/target/debug");
        let eg = target("eg1", TargetKind::Example, CrateType::Bin);
        assert_eq!(eg.artifact_path(&profile_dir).as_str(), "/ws/target/debug/examples/eg1.exe");
        assert_eq!(eg.additional_build_args(), ["--example", "eg1"]);

        let bin = target("hello_world", TargetKind::Bin, CrateType::Bin);
        assert_eq!(bin.artifact_path(&profile_dir).as_str(), "/ws/target/debug/hello_world.exe");
        assert!(bin.additional_build_args().is_empty());
    }

    #[test]
    fn test_kind_flags() {
        assert!(target("a", TargetKind::Bin, CrateType::Bin).is_runnable());
        assert!(target("a", TargetKind::Example, CrateType::Bin).is_runnable());
        assert!(!target("a", TargetKind::Lib, CrateType::Lib).is_runnable());

        assert!(target("a", TargetKind::Lib, CrateType::Lib).can_have_tests());
        assert!(target("a", TargetKind::Bin, CrateType::Bin).can_have_tests());
        assert!(!target("a", TargetKind::Test, CrateType::Bin).can_have_tests());
        assert!(!target("a", TargetKind::Example, CrateType::Bin).can_have_tests());
        assert!(!target("a", TargetKind::CustomBuild, CrateType::Bin).can_have_tests());
    }

    #[test]
    fn test_container_name() {
        let lib = target("adder", TargetKind::Lib, CrateType::Lib);
        assert_eq!(lib.test_container_file_name(), "adder.rusttests");
        assert_eq!(
            lib.test_container_path(&NormalizedPath::new("/t/debug")).as_str(),
            "/t/debug/adder.rusttests"
        );
    }

    #[test]
    fn test_decode_from_metadata() {
        let json = r#"{
            "name": "hello_lib",
            "kind": ["lib"],
            "crate_types": ["lib"],
            "src_path": "c:\\ws\\src\\lib.rs",
            "edition": "2021",
            "doctest": true
        }"#;
        let t: Target = serde_json::from_str(json).unwrap();
        assert_eq!(t.kind(), TargetKind::Lib);
        assert_eq!(t.crate_type(), Some(CrateType::Lib));
        assert_eq!(t.src_path.as_str(), "c:/ws/src/lib.rs");

        let unknown: Target = serde_json::from_str(
            r#"{"name":"x","kind":["something-new"],"crate_types":["bin"],"src_path":"/x.rs"}"#,
        )
        .unwrap();
        assert_eq!(unknown.kind(), TargetKind::Other);
    }

    #[test]
    fn test_unknown_crate_type_decodes() {
        let t: Target = serde_json::from_str(
            r#"{"name":"gadget","kind":["lib"],"crate_types":["sdylib"],"src_path":"/ws/src/lib.rs"}"#,
        )
        .unwrap();
        assert_eq!(t.kind(), TargetKind::Lib);
        assert_eq!(t.crate_type(), Some(CrateType::Unknown));
        assert_eq!(t.artifact_file_name(), "gadget");
        assert_eq!(t.test_container_file_name(), "gadget.rusttests");
    }
}
