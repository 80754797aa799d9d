//! Bundle and container fixtures

use flate2::Compression;
use flate2::write::GzEncoder;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Tar header for a regular file
fn tar_header(name: &str, size: usize) -> [u8; 512] {
    let mut header = [0u8; 512];
    header[..name.len()].copy_from_slice(name.as_bytes());
    header[100..108].copy_from_slice(b"0000644\0");
    header[124..136].copy_from_slice(format!("{size:011o}\0").as_bytes());
    header[148..156].copy_from_slice(b"        ");
    header[156] = b'0';
    header[257..263].copy_from_slice(b"ustar\0");
    let checksum: u32 = header.iter().map(|&b| u32::from(b)).sum();
    header[148..156].copy_from_slice(format!("{checksum:06o}\0 ").as_bytes());
    header
}

/// Gzip-compressed bundle holding the given `(pathname, asset)` pairs, one guid each
pub fn bundle_bytes(assets: &[(&str, &[u8])]) -> Vec<u8> {
    let mut tar = Vec::new();
    for (i, (pathname, asset)) in assets.iter().enumerate() {
        let guid = format!("{:032x}", i + 1);
        for (name, contents) in [
            (format!("{guid}/pathname"), pathname.as_bytes()),
            (format!("{guid}/asset"), *asset),
        ] {
            tar.extend_from_slice(&tar_header(&name, contents.len()));
            tar.extend_from_slice(contents);
            tar.resize(tar.len().div_ceil(512) * 512, 0);
        }
    }
    tar.extend_from_slice(&[0u8; 1024]);

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&tar).unwrap();
    encoder.finish().unwrap()
}

/// Bundle declaring `dependencies` in `Assets/<name>/config.json`
pub fn bundle_declaring(name: &str, dependencies: &[(&str, &str)]) -> Vec<u8> {
    let members: Vec<String> = dependencies
        .iter()
        .map(|(id, version)| format!("\"{id}\": \"{version}\""))
        .collect();
    let config = format!("{{ \"vpmDependencies\": {{ {} }} }}", members.join(", "));
    bundle_bytes(&[
        (format!("Assets/{name}/Readme.md").as_str(), b"# readme".as_slice()),
        (format!("Assets/{name}/config.json").as_str(), config.as_bytes()),
    ])
}

/// Write bytes to `dir/name` and return the path
pub fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, bytes).unwrap();
    path
}

/// Write a zip container holding the given members
pub fn write_zip(dir: &Path, name: &str, members: &[(&str, &[u8])]) -> PathBuf {
    let path = dir.join(name);
    let mut writer = zip::ZipWriter::new(std::fs::File::create(&path).unwrap());
    for (member, contents) in members {
        writer
            .start_file(*member, zip::write::FileOptions::default())
            .unwrap();
        writer.write_all(contents).unwrap();
    }
    writer.finish().unwrap();
    path
}
