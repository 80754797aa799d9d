//! Outer containers holding bundles
//!
//! Bundles are often distributed inside an archive. The queue lists such an
//! archive's members through a [`ContainerReader`] and extracts each bundle to
//! a private temp file before queueing it. The entry's key remembers where the
//! bundle came from (`<container>::<member>`), so a temp file that disappeared
//! before its import can be extracted again.

mod zip;

pub use self::zip::ZipContainerReader;

use crate::error::Result;
use crate::types::{KEY_SEPARATOR, normalize_path};
use crate::utils::unique_temp_name;
use std::path::{Path, PathBuf};

/// File stored in a container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerMember {
    /// Member name as stored in the container
    pub name: String,
    /// Uncompressed size in bytes
    pub size: u64,
}

/// Trait for reading outer containers
///
/// Methods are blocking; callers run them on a blocking thread.
pub trait ContainerReader: Send + Sync {
    /// List the file members of a container (directories excluded)
    fn members(&self, container: &Path) -> Result<Vec<ContainerMember>>;

    /// Extract one member to `dest`
    ///
    /// On error no partial file is left at `dest`.
    fn extract_member(&self, container: &Path, member: &str, dest: &Path) -> Result<()>;

    /// Get the name of this reader implementation
    fn name(&self) -> &'static str;
}

/// Key of a bundle extracted from a container: `<normalized container>::<member>`
pub fn composite_key(container: &Path, member: &str) -> String {
    format!("{}{KEY_SEPARATOR}{member}", normalize_path(container))
}

/// Split a composite key at its first separator into `(container, member)`
pub fn split_composite_key(key: &str) -> Option<(&str, &str)> {
    let (container, member) = key.split_once(KEY_SEPARATOR)?;
    if container.is_empty() || member.is_empty() {
        return None;
    }
    Some((container, member))
}

/// Extract a member to a fresh uniquely-named file under `temp_dir`
///
/// Returns the path of the new file, which the caller owns.
pub fn extract_to_temp(
    reader: &dyn ContainerReader,
    container: &Path,
    member: &str,
    temp_dir: &Path,
) -> Result<PathBuf> {
    std::fs::create_dir_all(temp_dir)?;
    let dest = temp_dir.join(unique_temp_name(member));
    reader.extract_member(container, member, &dest)?;
    tracing::debug!(
        container = %container.display(),
        member,
        dest = %dest.display(),
        reader = reader.name(),
        "extracted container member"
    );
    Ok(dest)
}
