//! Configuration types for bulk-import

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

/// Queue behavior configuration (file matching, temp storage, interactive default)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Initial value of the queue's interactive flag for a fresh queue (default: false)
    ///
    /// A persisted queue keeps the flag it was saved with.
    #[serde(default)]
    pub interactive: bool,

    /// Bundle file extension, matched case-insensitively (default: "unitypackage")
    #[serde(default = "default_bundle_extension")]
    pub bundle_extension: String,

    /// Outer container extension, matched case-insensitively (default: "zip")
    #[serde(default = "default_archive_extension")]
    pub archive_extension: String,

    /// Directory that receives bundles extracted from containers
    /// (default: `<system temp>/BulkImporter`)
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            interactive: false,
            bundle_extension: default_bundle_extension(),
            archive_extension: default_archive_extension(),
            temp_dir: default_temp_dir(),
        }
    }
}

/// Bundle inspection limits
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InspectorConfig {
    /// Largest asset payload that is buffered during a scan (default: 8192 bytes)
    ///
    /// Larger payloads are skipped without being read into memory, so a
    /// descriptor bigger than this is never found.
    #[serde(default = "default_max_asset_bytes")]
    pub max_asset_bytes: u64,

    /// Suffix of the pathname that identifies the dependency descriptor,
    /// compared case-insensitively (default: "/config.json")
    #[serde(default = "default_descriptor_suffix")]
    pub descriptor_suffix: String,
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self {
            max_asset_bytes: default_max_asset_bytes(),
            descriptor_suffix: default_descriptor_suffix(),
        }
    }
}

/// Host import command used by [`CommandImporter`](crate::importer::CommandImporter)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImporterConfig {
    /// Import program, either a path or a name looked up on PATH (None = no command importer)
    #[serde(default)]
    pub program: Option<PathBuf>,

    /// Arguments placed before the bundle path
    #[serde(default)]
    pub args: Vec<String>,

    /// Extra argument appended when the queue's interactive flag is set
    /// (default: "--interactive")
    #[serde(default = "default_interactive_arg")]
    pub interactive_arg: Option<String>,
}

impl Default for ImporterConfig {
    fn default() -> Self {
        Self {
            program: None,
            args: vec![],
            interactive_arg: default_interactive_arg(),
        }
    }
}

/// Drain notification configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Notify when the queue drains (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Command to run on drain, e.g. a sound player (None = log only)
    #[serde(default)]
    pub command: Option<PathBuf>,

    /// Arguments passed to the command
    #[serde(default)]
    pub args: Vec<String>,

    /// Command timeout in seconds (default: 30)
    #[serde(default = "default_notify_timeout", with = "duration_serde")]
    pub timeout: Duration,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: None,
            args: vec![],
            timeout: default_notify_timeout(),
        }
    }
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Database path (default: "bulk-import.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// Main configuration for [`ImportOrchestrator`](crate::ImportOrchestrator)
///
/// Every field has a default, so an empty JSON object is a valid configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Queue behavior (extensions, temp directory, interactive default)
    #[serde(default)]
    pub import: ImportConfig,

    /// Bundle inspection limits
    #[serde(default)]
    pub inspector: InspectorConfig,

    /// Host import command
    #[serde(default)]
    pub importer: ImporterConfig,

    /// Drain notification
    #[serde(default)]
    pub notifications: NotificationConfig,

    /// Data storage
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Directory holding installed packages, used to show whether a declared
    /// dependency is already present (None = dependencies always show as pending)
    #[serde(default)]
    pub packages_dir: Option<PathBuf>,
}

impl Config {
    /// Load a configuration from a JSON file and validate it
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Config = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check settings that would make the queue unusable
    pub fn validate(&self) -> Result<()> {
        if self.import.bundle_extension.trim().is_empty() {
            return Err(config_error(
                "bundle extension must not be empty",
                "import.bundle_extension",
            ));
        }
        if self.import.archive_extension.trim().is_empty() {
            return Err(config_error(
                "archive extension must not be empty",
                "import.archive_extension",
            ));
        }
        if self
            .import
            .bundle_extension
            .eq_ignore_ascii_case(&self.import.archive_extension)
        {
            return Err(config_error(
                "bundle and archive extensions must differ",
                "import.archive_extension",
            ));
        }
        if self.inspector.max_asset_bytes == 0 {
            return Err(config_error(
                "max_asset_bytes must be greater than zero",
                "inspector.max_asset_bytes",
            ));
        }
        if self.inspector.descriptor_suffix.is_empty() {
            return Err(config_error(
                "descriptor suffix must not be empty",
                "inspector.descriptor_suffix",
            ));
        }
        Ok(())
    }

    /// Temporary directory for extracted bundles
    pub fn temp_dir(&self) -> &PathBuf {
        &self.import.temp_dir
    }
}

fn config_error(message: &str, key: &str) -> Error {
    Error::Config {
        message: message.to_string(),
        key: Some(key.to_string()),
    }
}

fn default_bundle_extension() -> String {
    "unitypackage".to_string()
}

fn default_archive_extension() -> String {
    "zip".to_string()
}

fn default_temp_dir() -> PathBuf {
    std::env::temp_dir().join("BulkImporter")
}

fn default_max_asset_bytes() -> u64 {
    8 * 1024
}

fn default_descriptor_suffix() -> String {
    "/config.json".to_string()
}

fn default_interactive_arg() -> Option<String> {
    Some("--interactive".to_string())
}

fn default_notify_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_database_path() -> PathBuf {
    PathBuf::from("bulk-import.db")
}

fn default_true() -> bool {
    true
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_deserializes_to_defaults() {
        let config: Config = serde_json::from_str("{}").expect("deserialize failed");

        assert!(!config.import.interactive);
        assert_eq!(config.import.bundle_extension, "unitypackage");
        assert_eq!(config.import.archive_extension, "zip");
        assert_eq!(config.inspector.max_asset_bytes, 8192);
        assert_eq!(config.inspector.descriptor_suffix, "/config.json");
        assert_eq!(
            config.importer.interactive_arg.as_deref(),
            Some("--interactive")
        );
        assert!(config.notifications.enabled, "notifications default on");
        assert_eq!(config.notifications.timeout, Duration::from_secs(30));
        assert_eq!(
            config.persistence.database_path,
            PathBuf::from("bulk-import.db")
        );
        assert!(config.packages_dir.is_none());
        config.validate().expect("defaults must validate");
    }

    #[test]
    fn serde_defaults_match_default_impl() {
        let from_json: Config = serde_json::from_str("{}").unwrap();
        let from_default = Config::default();

        assert_eq!(
            serde_json::to_value(&from_json).unwrap(),
            serde_json::to_value(&from_default).unwrap(),
            "missing fields must fall back to the same values as Default"
        );
    }

    #[test]
    fn notification_timeout_serializes_as_seconds() {
        let config = NotificationConfig {
            timeout: Duration::from_secs(7),
            ..Default::default()
        };
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["timeout"], 7);

        let back: NotificationConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back.timeout, Duration::from_secs(7));
    }

    #[test]
    fn validate_rejects_zero_asset_cap() {
        let mut config = Config::default();
        config.inspector.max_asset_bytes = 0;

        match config.validate() {
            Err(Error::Config { key, .. }) => {
                assert_eq!(key.as_deref(), Some("inspector.max_asset_bytes"))
            }
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_matching_extensions() {
        let mut config = Config::default();
        config.import.archive_extension = "UnityPackage".into();

        assert!(
            matches!(config.validate(), Err(Error::Config { .. })),
            "extensions differing only by case must be rejected"
        );
    }

    #[test]
    fn validate_rejects_blank_bundle_extension() {
        let mut config = Config::default();
        config.import.bundle_extension = "  ".into();

        assert!(matches!(config.validate(), Err(Error::Config { .. })));
    }

    #[test]
    fn from_json_file_reads_nested_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                "import": { "interactive": true },
                "importer": { "program": "unity-import", "args": ["-batch"] },
                "notifications": { "command": "afplay", "args": ["done.wav"], "timeout": 5 },
                "packages_dir": "/project/Packages"
            }"#,
        )
        .unwrap();

        let config = Config::from_json_file(&path).unwrap();
        assert!(config.import.interactive);
        assert_eq!(config.import.bundle_extension, "unitypackage");
        assert_eq!(
            config.importer.program,
            Some(PathBuf::from("unity-import"))
        );
        assert_eq!(config.importer.args, vec!["-batch".to_string()]);
        assert_eq!(config.notifications.args, vec!["done.wav".to_string()]);
        assert_eq!(config.notifications.timeout, Duration::from_secs(5));
        assert_eq!(
            config.packages_dir,
            Some(PathBuf::from("/project/Packages"))
        );
    }

    #[test]
    fn from_json_file_reports_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            Config::from_json_file(&path),
            Err(Error::Serialization(_))
        ));
    }

    #[test]
    fn from_json_file_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();

        assert!(matches!(
            Config::from_json_file(dir.path().join("absent.json")),
            Err(Error::Io(_))
        ));
    }
}
