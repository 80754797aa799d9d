use crate::utils::has_extension;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Recursively collect bundle and container files under `folder`
///
/// All bundles come first, then all containers, each group sorted by path.
/// Unreadable directory entries are skipped.
pub fn collect_bundle_paths(
    folder: &Path,
    bundle_extension: &str,
    archive_extension: &str,
) -> Vec<PathBuf> {
    let files: Vec<PathBuf> = WalkDir::new(folder)
        .follow_links(true)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .collect();

    let mut bundles: Vec<PathBuf> = files
        .iter()
        .filter(|p| has_extension(p, bundle_extension))
        .cloned()
        .collect();
    let mut archives: Vec<PathBuf> = files
        .into_iter()
        .filter(|p| has_extension(p, archive_extension))
        .collect();

    bundles.sort();
    archives.sort();
    bundles.extend(archives);
    bundles
}
