//! Path classification and governing-manifest resolution.

use crate::core::path::NormalizedPath;

/// File name of a package or workspace manifest.
pub const MANIFEST_NAME: &str = "Cargo.toml";

/// Extension of source files.
pub const SOURCE_FILE_EXTENSION: &str = "rs";

/// Extension of test container files.
pub const TEST_CONTAINER_EXTENSION: &str = "rusttests";

/// True iff the file name is the manifest file name.
pub fn is_manifest(path: &NormalizedPath) -> bool {
    path.file_name()
        .is_some_and(|name| name.eq_ignore_ascii_case(MANIFEST_NAME))
}

/// True iff the extension is the source file extension.
pub fn is_source_file(path: &NormalizedPath) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(SOURCE_FILE_EXTENSION))
}

/// True iff the extension is the test container extension.
pub fn is_test_container(path: &NormalizedPath) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(TEST_CONTAINER_EXTENSION))
}

/// Find the manifest that governs `file_or_folder`.
///
/// A manifest resolves to itself. Anything outside `workspace_root` resolves
/// to nothing. Otherwise the ancestors of the input are searched from the
/// nearest outward, stopping at `workspace_root`, and the first one holding a
/// manifest wins. The root is a candidate exactly once.
pub fn resolve_governing_manifest(
    file_or_folder: &NormalizedPath,
    workspace_root: &NormalizedPath,
) -> Option<NormalizedPath> {
    if is_manifest(file_or_folder) {
        return Some(file_or_folder.clone());
    }

    if !file_or_folder.is_contained_in(workspace_root) {
        tracing::trace!("{} is outside {}", file_or_folder, workspace_root);
        return None;
    }

    let mut current = file_or_folder.clone();
    let mut root_checked = false;
    while current != *workspace_root {
        current = current.parent()?;
        root_checked = current == *workspace_root;
        if let Some(manifest) = manifest_in(&current) {
            return Some(manifest);
        }
    }

    if !root_checked {
        // The input was the root itself; the loop never ran.
        return manifest_in(&current);
    }

    None
}

fn manifest_in(dir: &NormalizedPath) -> Option<NormalizedPath> {
    let candidate = dir.join(MANIFEST_NAME);
    candidate.is_file().then_some(candidate)
}
