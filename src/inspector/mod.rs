//! Bundle inspection
//!
//! A bundle is a gzip-compressed tar stream in which every asset lives under a
//! directory named after its guid:
//!
//! ```text
//! <guid>/pathname   project-relative path of the asset (text)
//! <guid>/asset      asset contents
//! ```
//!
//! [`inspect`] streams the bundle once, keeps the pathname of every guid and
//! the contents of small assets, then looks for the asset whose pathname ends
//! with `/config.json` and parses its `vpmDependencies` object. Nothing is
//! written to disk and every failure reads as "no dependencies".

mod descriptor;
mod tar;

pub use descriptor::{DependencyDescriptor, parse_descriptor};

use crate::config::InspectorConfig;
use flate2::read::GzDecoder;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

/// Inspect a bundle file with the default limits
pub fn inspect(path: impl AsRef<Path>) -> Option<DependencyDescriptor> {
    inspect_with(path, &InspectorConfig::default())
}

/// Inspect a bundle file
pub fn inspect_with(path: impl AsRef<Path>, config: &InspectorConfig) -> Option<DependencyDescriptor> {
    let path = path.as_ref();
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "cannot open bundle for inspection");
            return None;
        }
    };
    let descriptor = inspect_reader(BufReader::new(file), config);
    tracing::debug!(
        path = %path.display(),
        dependencies = descriptor.as_ref().map_or(0, DependencyDescriptor::len),
        "inspected bundle"
    );
    descriptor
}

/// Inspect a gzip-compressed bundle stream
pub fn inspect_reader<R: Read>(reader: R, config: &InspectorConfig) -> Option<DependencyDescriptor> {
    let table = match FileTable::scan(GzDecoder::new(reader), config.max_asset_bytes) {
        Ok(table) => table,
        Err(e) => {
            tracing::debug!(error = %e, "bundle scan failed");
            return None;
        }
    };
    let text = table.descriptor_text(&config.descriptor_suffix)?;
    parse_descriptor(&text)
}

/// Pathnames and small assets keyed by guid
#[derive(Debug, Default)]
struct FileTable {
    pathnames: BTreeMap<String, String>,
    assets: BTreeMap<String, Vec<u8>>,
}

impl FileTable {
    fn scan<R: Read>(mut reader: R, max_asset_bytes: u64) -> io::Result<Self> {
        let mut table = Self::default();

        while let Some(header) = tar::read_header(&mut reader)? {
            let pad = tar::padding(header.size);

            if header.is_dir || header.size > max_asset_bytes {
                tar::skip(&mut reader, header.size.saturating_add(pad))?;
                continue;
            }

            let payload = tar::read_payload(&mut reader, header.size)?;
            tar::skip(&mut reader, pad)?;

            let Some((guid, file_type)) = split_entry_name(&header.name) else {
                continue;
            };
            match file_type.as_str() {
                "pathname" => {
                    let text = String::from_utf8_lossy(&payload).trim().to_string();
                    table.pathnames.insert(guid, text);
                }
                "asset" => {
                    table.assets.insert(guid, payload);
                }
                _ => {}
            }
        }

        Ok(table)
    }

    /// Text of the first asset, in guid order, whose pathname ends with `suffix`
    fn descriptor_text(&self, suffix: &str) -> Option<String> {
        self.pathnames
            .iter()
            .filter(|(_, pathname)| ends_with_ignore_ascii_case(pathname, suffix))
            .find_map(|(guid, _)| self.assets.get(guid))
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }
}

/// Split `./<guid>/<file type>` into its parts
fn split_entry_name(name: &str) -> Option<(String, String)> {
    let normalized = name.replace('\\', "/");
    let trimmed = normalized.trim_start_matches('.').trim_start_matches('/');
    let (guid, file_type) = trimmed.split_once('/')?;
    if guid.is_empty() {
        return None;
    }
    Some((guid.to_string(), file_type.to_string()))
}

fn ends_with_ignore_ascii_case(value: &str, suffix: &str) -> bool {
    value.len() >= suffix.len()
        && value.as_bytes()[value.len() - suffix.len()..].eq_ignore_ascii_case(suffix.as_bytes())
}
