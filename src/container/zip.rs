use super::{ContainerMember, ContainerReader};
use crate::error::{Error, Result};
use std::fs::File;
use std::path::Path;
use zip::ZipArchive;
use zip::result::ZipError;

/// Container reader for ZIP archives
#[derive(Debug, Default, Clone, Copy)]
pub struct ZipContainerReader;

impl ZipContainerReader {
    fn open(container: &Path) -> Result<ZipArchive<File>> {
        let file = File::open(container)?;
        Ok(ZipArchive::new(file)?)
    }
}

impl ContainerReader for ZipContainerReader {
    fn members(&self, container: &Path) -> Result<Vec<ContainerMember>> {
        let mut archive = Self::open(container)?;
        let mut members = Vec::with_capacity(archive.len());

        for index in 0..archive.len() {
            let file = archive.by_index(index)?;
            if file.is_dir() {
                continue;
            }
            members.push(ContainerMember {
                name: file.name().to_string(),
                size: file.size(),
            });
        }

        Ok(members)
    }

    fn extract_member(&self, container: &Path, member: &str, dest: &Path) -> Result<()> {
        let mut archive = Self::open(container)?;
        let mut file = match archive.by_name(member) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => {
                return Err(Error::NotFound(format!(
                    "{} in {}",
                    member,
                    container.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let mut out = File::create(dest)?;
        if let Err(e) = std::io::copy(&mut file, &mut out) {
            drop(out);
            std::fs::remove_file(dest).ok();
            return Err(e.into());
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "zip"
    }
}
