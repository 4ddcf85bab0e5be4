//! Test fixtures for common test scenarios.
//!
//! Metadata documents shaped like `cargo metadata --no-deps` output, and
//! on-disk workspace layouts to resolve manifests against.

use std::path::Path;

use crate::core::path::NormalizedPath;

use super::write_file;

/// Metadata for a two-package workspace rooted at `/ws`.
///
/// - `add_one`: a library, a binary and a `tests` integration test
/// - `adder`: a library and the `tests` and `tests1` integration tests
pub fn sample_metadata() -> String {
    sample_metadata_at(&NormalizedPath::new("/ws"))
}

/// [`sample_metadata`] rooted somewhere else.
pub fn sample_metadata_at(root: &NormalizedPath) -> String {
    let p = |rel: &str| root.join(rel).to_string();
    serde_json::json!({
        "packages": [
            {
                "name": "add_one",
                "version": "0.1.0",
                "id": "path+file:///ws/add_one#0.1.0",
                "manifest_path": p("add_one/Cargo.toml"),
                "dependencies": [],
                "targets": [
                    {
                        "kind": ["lib"],
                        "crate_types": ["lib"],
                        "name": "add_one",
                        "src_path": p("add_one/src/lib.rs"),
                        "edition": "2021",
                        "doc": true,
                        "doctest": true,
                        "test": true
                    },
                    {
                        "kind": ["bin"],
                        "crate_types": ["bin"],
                        "name": "add_one",
                        "src_path": p("add_one/src/main.rs"),
                        "edition": "2021",
                        "doc": true,
                        "doctest": false,
                        "test": true
                    },
                    {
                        "kind": ["test"],
                        "crate_types": ["bin"],
                        "name": "tests",
                        "src_path": p("add_one/tests/tests.rs"),
                        "edition": "2021",
                        "doc": false,
                        "doctest": false,
                        "test": true
                    }
                ]
            },
            {
                "name": "adder",
                "version": "0.1.0",
                "id": "path+file:///ws/adder#0.1.0",
                "manifest_path": p("adder/Cargo.toml"),
                "dependencies": [],
                "targets": [
                    {
                        "kind": ["lib"],
                        "crate_types": ["lib"],
                        "name": "adder",
                        "src_path": p("adder/src/lib.rs"),
                        "edition": "2021",
                        "doc": true,
                        "doctest": true,
                        "test": true
                    },
                    {
                        "kind": ["test"],
                        "crate_types": ["bin"],
                        "name": "tests",
                        "src_path": p("adder/tests/tests.rs"),
                        "edition": "2021",
                        "doc": false,
                        "doctest": false,
                        "test": true
                    },
                    {
                        "kind": ["test"],
                        "crate_types": ["bin"],
                        "name": "tests1",
                        "src_path": p("adder/tests/tests1.rs"),
                        "edition": "2021",
                        "doc": false,
                        "doctest": false,
                        "test": true
                    }
                ]
            }
        ],
        "workspace_members": [
            "path+file:///ws/add_one#0.1.0",
            "path+file:///ws/adder#0.1.0"
        ],
        "resolve": null,
        "target_directory": p("target"),
        "version": 1,
        "workspace_root": root.to_string(),
        "metadata": null
    })
    .to_string()
}

/// Write the manifests and sources [`sample_metadata_at`] describes.
pub fn write_sample_workspace(root: &Path) {
    write_file(
        &root.join("Cargo.toml"),
        "[workspace]\nmembers = [\"add_one\", \"adder\"]\nresolver = \"2\"\n",
    );
    write_file(
        &root.join("add_one/Cargo.toml"),
        "[package]\nname = \"add_one\"\nversion = \"0.1.0\"\nedition = \"2021\"\n",
    );
    write_file(&root.join("add_one/src/lib.rs"), "pub fn add_one(x: i32) -> i32 { x + 1 }\n");
    write_file(&root.join("add_one/src/main.rs"), "fn main() {}\n");
    write_file(&root.join("add_one/tests/tests.rs"), "");
    write_file(
        &root.join("adder/Cargo.toml"),
        "[package]\nname = \"adder\"\nversion = \"0.1.0\"\nedition = \"2021\"\n",
    );
    write_file(&root.join("adder/src/lib.rs"), "");
    write_file(&root.join("adder/tests/tests.rs"), "");
    write_file(&root.join("adder/tests/tests1.rs"), "");
}
