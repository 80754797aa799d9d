//! Dependency descriptor parsing
//!
//! The descriptor is a JSON document whose `vpmDependencies` member is a flat
//! object of package id to version requirement. Anything else in the document
//! is ignored. A document that does not have that shape yields no descriptor.

use serde::Deserialize;
use std::collections::BTreeMap;

/// Declared dependencies of a bundle: package id to version requirement
///
/// Keys are unique and iterate in sorted order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DependencyDescriptor {
    dependencies: BTreeMap<String, String>,
}

impl DependencyDescriptor {
    /// Build from package id / version pairs; later duplicates win
    pub fn new<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            dependencies: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Version requirement declared for a package
    pub fn get(&self, package_id: &str) -> Option<&str> {
        self.dependencies.get(package_id).map(String::as_str)
    }

    /// Iterate `(package_id, version)` pairs in package id order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.dependencies
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Package ids in order
    pub fn package_ids(&self) -> impl Iterator<Item = &str> {
        self.dependencies.keys().map(String::as_str)
    }

    /// Number of declared dependencies
    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    /// Whether nothing is declared
    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }
}

#[derive(Deserialize)]
struct InstallerConfig {
    #[serde(rename = "vpmDependencies", default)]
    vpm_dependencies: Option<serde_json::Value>,
}

/// Parse a descriptor document
///
/// Returns `None` when the text is not JSON, has no `vpmDependencies` object,
/// or that object has no string-valued members. Members with non-string
/// values or empty keys are skipped.
pub fn parse_descriptor(text: &str) -> Option<DependencyDescriptor> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let config: InstallerConfig = match serde_json::from_str(text) {
        Ok(config) => config,
        Err(e) => {
            tracing::debug!(error = %e, "descriptor is not valid JSON");
            return None;
        }
    };

    let serde_json::Value::Object(members) = config.vpm_dependencies? else {
        return None;
    };

    let descriptor = DependencyDescriptor::new(members.into_iter().filter_map(|(id, version)| {
        match version {
            serde_json::Value::String(version) if !id.is_empty() => Some((id, version)),
            _ => None,
        }
    }));

    if descriptor.is_empty() {
        None
    } else {
        Some(descriptor)
    }
}
