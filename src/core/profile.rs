//! Build profiles and the output directories they map to.

/// Profile used when nothing else is configured.
pub const DEFAULT_PROFILE: &str = "dev";

/// Known profiles, in presentation order, with their output directory.
const PROFILES: [(&str, &str); 4] = [
    ("dev", "debug"),
    ("release", "release"),
    ("test", "debug"),
    ("bench", "release"),
];

/// All known profile names.
pub fn profiles() -> impl Iterator<Item = &'static str> {
    PROFILES.iter().map(|(name, _)| *name)
}

/// Name of the directory under the target directory a profile builds into.
///
/// Custom profiles build into a directory named after themselves.
pub fn profile_dir_name(profile: &str) -> &str {
    PROFILES
        .iter()
        .find(|(name, _)| *name == profile)
        .map(|(_, dir)| *dir)
        .unwrap_or(profile)
}
