//! Install-state lookup for declared dependencies
//!
//! Dependency rows are display-only; their status only says whether the
//! declared package is already present in the host project.

use std::path::{Component, Path, PathBuf};

/// Trait answering whether a package is already installed
pub trait PackageProbe: Send + Sync {
    /// Whether `package_id` is installed
    fn is_installed(&self, package_id: &str) -> bool;
}

/// Probe that treats `<packages_dir>/<package_id>` being a directory as installed
#[derive(Debug, Clone)]
pub struct DirectoryPackageProbe {
    packages_dir: PathBuf,
}

impl DirectoryPackageProbe {
    /// Create a probe for a packages directory
    pub fn new(packages_dir: impl Into<PathBuf>) -> Self {
        Self {
            packages_dir: packages_dir.into(),
        }
    }
}

impl PackageProbe for DirectoryPackageProbe {
    fn is_installed(&self, package_id: &str) -> bool {
        if !is_plain_name(package_id) {
            return false;
        }
        self.packages_dir.join(package_id).is_dir()
    }
}

/// Probe used when no packages directory is configured: nothing is installed
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPackageProbe;

impl PackageProbe for NoPackageProbe {
    fn is_installed(&self, _package_id: &str) -> bool {
        false
    }
}

/// A single normal path component, so an id cannot escape the packages directory
fn is_plain_name(package_id: &str) -> bool {
    if package_id.contains(['/', '\\']) {
        return false;
    }
    let mut components = Path::new(package_id).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
