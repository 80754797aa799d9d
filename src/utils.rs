//! Utility functions for path matching and program lookup

use std::path::{Path, PathBuf};

/// Resolve a configured program to an executable path
///
/// Paths with more than one component must exist as given; a bare name is
/// searched on PATH with `which`.
///
/// # Examples
///
/// ```
/// use bulk_import::utils::resolve_program;
/// use std::path::Path;
///
/// assert!(resolve_program(Path::new("/nonexistent/bin/tool")).is_none());
/// ```
pub fn resolve_program(program: &Path) -> Option<PathBuf> {
    if program.components().count() > 1 || program.is_absolute() {
        return program.exists().then(|| program.to_path_buf());
    }
    which::which(program).ok()
}

/// Whether a path (or container member name) has the given extension, ignoring ASCII case
pub fn has_extension(path: impl AsRef<Path>, extension: &str) -> bool {
    path.as_ref()
        .extension()
        .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case(extension))
}

/// File name part of a container member name, which may use either separator
pub fn member_file_name(member: &str) -> &str {
    member.rsplit(['/', '\\']).next().unwrap_or(member)
}

/// Unique file name for an extracted member: `<random hex>_<file name>`
pub fn unique_temp_name(member: &str) -> String {
    format!("{:016x}_{}", rand::random::<u64>(), member_file_name(member))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_extension_ignores_case() {
        assert!(has_extension("a/B.UnityPackage", "unitypackage"));
        assert!(has_extension("pack.ZIP", "zip"));
        assert!(!has_extension("pack.zip.part", "zip"));
        assert!(!has_extension("unitypackage", "unitypackage"));
    }

    #[test]
    fn member_file_name_handles_both_separators() {
        assert_eq!(member_file_name("dir/sub/A.unitypackage"), "A.unitypackage");
        assert_eq!(member_file_name(r"dir\A.unitypackage"), "A.unitypackage");
        assert_eq!(member_file_name("A.unitypackage"), "A.unitypackage");
    }

    #[test]
    fn unique_temp_names_differ_and_keep_file_name() {
        let a = unique_temp_name("inner/A.unitypackage");
        let b = unique_temp_name("inner/A.unitypackage");

        assert_ne!(a, b);
        assert!(a.ends_with("_A.unitypackage"), "got {a}");
        assert!(!a.contains('/'));
    }

    #[cfg(unix)]
    #[test]
    fn resolve_program_accepts_existing_absolute_path() {
        assert_eq!(
            resolve_program(Path::new("/bin/sh")),
            Some(PathBuf::from("/bin/sh"))
        );
    }

    #[test]
    fn resolve_program_searches_path_for_bare_names() {
        assert!(resolve_program(Path::new("definitely-not-a-real-binary-4821")).is_none());
    }
}
