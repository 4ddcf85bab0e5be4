//! Filesystem utilities.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use walkdir::WalkDir;

use crate::core::manifest::is_test_container;
use crate::core::path::NormalizedPath;

/// Recursively copy a directory.
pub fn copy_dir_all(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst)
        .with_context(|| format!("failed to create directory: {}", dst.display()))?;

    for entry in fs::read_dir(src)
        .with_context(|| format!("failed to read directory: {}", src.display()))?
    {
        let entry = entry?;
        let ty = entry.file_type()?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if ty.is_dir() {
            copy_dir_all(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path).with_context(|| {
                format!(
                    "failed to copy {} to {}",
                    src_path.display(),
                    dst_path.display()
                )
            })?;
        }
    }
    Ok(())
}

/// Test container files directly inside the profile directories of a
/// target directory, sorted by path.
///
/// Containers sit next to the artifacts of their profile, so only the first
/// two levels are searched; `deps/` and `build/` are never looked into.
pub fn find_test_containers(target_dir: &Path) -> Result<Vec<NormalizedPath>> {
    if !target_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut found = Vec::new();
    for entry in WalkDir::new(target_dir).min_depth(2).max_depth(2) {
        let entry = entry
            .with_context(|| format!("failed to read directory: {}", target_dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = NormalizedPath::from_path(entry.path());
        if is_test_container(&path) {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::write_file;
    use tempfile::TempDir;

    #[test]
    fn test_find_test_containers() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("target");
        write_file(&target.join("debug/adder.rusttests"), "{}");
        write_file(&target.join("release/add_one.rusttests"), "{}");
        write_file(&target.join("debug/deps/stale.rusttests"), "{}");
        write_file(&target.join("debug/adder.exe"), "");

        let found = find_test_containers(&target).unwrap();
        let names: Vec<_> = found.iter().filter_map(|p| p.file_name()).collect();
        assert_eq!(names, ["adder.rusttests", "add_one.rusttests"]);

        assert!(find_test_containers(&tmp.path().join("missing")).unwrap().is_empty());
    }

    #[test]
    fn test_copy_dir_all() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");

        write_file(&src.join("nested/file.txt"), "content");

        copy_dir_all(&src, &dst).unwrap();

        assert_eq!(fs::read_to_string(dst.join("nested/file.txt")).unwrap(), "content");
    }
}
