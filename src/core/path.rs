//! Normalized, case-insensitive filesystem paths.
//!
//! Paths reported by the toolchain, typed by the host, and computed from
//! target directories all spell the same file differently (separators,
//! drive letter case). `NormalizedPath` unifies the separators once at
//! construction and then compares and hashes ignoring ASCII case, so a
//! manifest path can be used as a cache key no matter where it came from.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

const SEPARATOR: char = '/';

/// An immutable, separator-normalized path compared case-insensitively.
///
/// There is deliberately no `From<&str>`: not every string is a path, so
/// conversions go through [`NormalizedPath::new`] or
/// [`NormalizedPath::from_path`].
#[derive(Clone)]
pub struct NormalizedPath {
    inner: String,
}

impl NormalizedPath {
    /// Normalize a path string.
    ///
    /// Every `\` becomes `/`, runs of separators collapse to one, and a
    /// trailing separator is dropped unless it terminates a root (`/`, `c:/`).
    pub fn new(path: impl AsRef<str>) -> Self {
        let path = path.as_ref();
        let mut inner = String::with_capacity(path.len());
        let mut last_was_sep = false;

        for ch in path.chars() {
            let ch = if ch == '\\' { SEPARATOR } else { ch };
            if ch == SEPARATOR {
                if last_was_sep {
                    continue;
                }
                last_was_sep = true;
            } else {
                last_was_sep = false;
            }
            inner.push(ch);
        }

        while inner.ends_with(SEPARATOR) && !is_root(&inner) {
            inner.pop();
        }

        NormalizedPath { inner }
    }

    /// Normalize a `std::path::Path`.
    pub fn from_path(path: &Path) -> Self {
        Self::new(path.to_string_lossy())
    }

    /// The normalized string.
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// View as a `std::path::Path` for filesystem calls.
    pub fn as_path(&self) -> &Path {
        Path::new(&self.inner)
    }

    pub fn to_path_buf(&self) -> PathBuf {
        PathBuf::from(&self.inner)
    }

    /// Whether this path starts at a filesystem root.
    pub fn is_absolute(&self) -> bool {
        self.inner.starts_with(SEPARATOR) || drive_prefix_len(&self.inner).is_some()
    }

    /// The containing directory, or `None` for a root or a bare file name.
    pub fn parent(&self) -> Option<NormalizedPath> {
        if is_root(&self.inner) {
            return None;
        }

        let idx = self.inner.rfind(SEPARATOR)?;
        let parent = if idx == 0 {
            "/"
        } else if drive_prefix_len(&self.inner) == Some(idx) {
            // `c:/foo` -> `c:/`
            &self.inner[..=idx]
        } else {
            &self.inner[..idx]
        };

        Some(NormalizedPath {
            inner: parent.to_string(),
        })
    }

    /// Append a relative component. An absolute component replaces the path,
    /// matching `std::path::Path::join`.
    pub fn join(&self, component: impl AsRef<str>) -> NormalizedPath {
        let component = NormalizedPath::new(component);
        if component.is_absolute() || self.inner.is_empty() {
            return component;
        }
        if component.inner.is_empty() {
            return self.clone();
        }

        let mut joined = self.inner.clone();
        if !joined.ends_with(SEPARATOR) {
            joined.push(SEPARATOR);
        }
        joined.push_str(&component.inner);
        NormalizedPath { inner: joined }
    }

    /// The last component.
    pub fn file_name(&self) -> Option<&str> {
        if is_root(&self.inner) {
            return None;
        }
        let name = match self.inner.rfind(SEPARATOR) {
            Some(idx) => &self.inner[idx + 1..],
            None => &self.inner,
        };
        (!name.is_empty()).then_some(name)
    }

    /// The extension of the last component, without the dot.
    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name()?;
        match name.rfind('.') {
            Some(0) | None => None,
            Some(idx) => Some(&name[idx + 1..]),
        }
    }

    /// The last component without its extension.
    pub fn file_stem(&self) -> Option<&str> {
        let name = self.file_name()?;
        match name.rfind('.') {
            Some(0) | None => Some(name),
            Some(idx) => Some(&name[..idx]),
        }
    }

    /// True when `self` is `root` or lies underneath it.
    pub fn is_contained_in(&self, root: &NormalizedPath) -> bool {
        if self == root {
            return true;
        }

        let root = root.inner.as_bytes();
        let this = self.inner.as_bytes();
        if root.is_empty() || this.len() <= root.len() {
            return false;
        }

        let prefix_matches = this[..root.len()].eq_ignore_ascii_case(root);
        let boundary = root.ends_with(b"/") || this[root.len()] == b'/';
        prefix_matches && boundary
    }

    pub fn exists(&self) -> bool {
        self.as_path().exists()
    }

    pub fn is_file(&self) -> bool {
        self.as_path().is_file()
    }

    fn folded_bytes(&self) -> impl Iterator<Item = u8> + '_ {
        self.inner.bytes().map(|b| b.to_ascii_lowercase())
    }
}

fn drive_prefix_len(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    (bytes.len() >= 3 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' && bytes[2] == b'/')
        .then_some(2)
}

fn is_root(s: &str) -> bool {
    s == "/" || (s.len() == 3 && drive_prefix_len(s).is_some())
}

impl PartialEq for NormalizedPath {
    fn eq(&self, other: &Self) -> bool {
        self.inner.eq_ignore_ascii_case(&other.inner)
    }
}

impl Eq for NormalizedPath {}

impl Hash for NormalizedPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for b in self.folded_bytes() {
            state.write_u8(b);
        }
        state.write_u8(0xff);
    }
}

impl PartialOrd for NormalizedPath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NormalizedPath {
    fn cmp(&self, other: &Self) -> Ordering {
        self.folded_bytes().cmp(other.folded_bytes())
    }
}

impl fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner)
    }
}

impl fmt::Debug for NormalizedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.inner)
    }
}

impl AsRef<Path> for NormalizedPath {
    fn as_ref(&self) -> &Path {
        self.as_path()
    }
}

impl From<&Path> for NormalizedPath {
    fn from(path: &Path) -> Self {
        NormalizedPath::from_path(path)
    }
}

impl From<PathBuf> for NormalizedPath {
    fn from(path: PathBuf) -> Self {
        NormalizedPath::from_path(&path)
    }
}

impl Serialize for NormalizedPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.inner)
    }
}

impl<'de> Deserialize<'de> for NormalizedPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(NormalizedPath::new(s))
    }
}
