//! Portal configuration and its storage.
//!
//! Settings are a small JSON document. Every field is optional; accessors
//! fill in the defaults so a missing or partial file still yields a usable
//! configuration. Storage is abstracted so the same settings can come
//! from a file on Linux or from flash on a device.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_DOCUMENTS_DIR: &str = "./data";
pub const DEFAULT_PAGE_URI: &str = "/hello";
pub const DEFAULT_PAGE_TITLE: &str = "Hello";
pub const DEFAULT_HEARTBEAT_MS: u64 = 1000;
/// Modbus general address, answered by any single PZEM on the bus.
pub const DEFAULT_PZEM_ADDRESS: u8 = 0xF8;

/// Errors that can occur during configuration operations.
#[derive(Debug)]
pub enum ConfigError {
    /// The requested configuration was not found.
    NotFound(String),
    /// Failed to read configuration.
    ReadError(String),
    /// Failed to write configuration.
    WriteError(String),
    /// Configuration data is invalid.
    InvalidData(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NotFound(key) => write!(f, "Configuration not found: {}", key),
            ConfigError::ReadError(msg) => write!(f, "Read error: {}", msg),
            ConfigError::WriteError(msg) => write!(f, "Write error: {}", msg),
            ConfigError::InvalidData(msg) => write!(f, "Invalid data: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Abstract settings storage.
///
/// All methods are synchronous to support embedded platforms.
pub trait ConfigStorage: Send + Sync {
    /// Load portal settings.
    fn load_settings(&self) -> Result<PortalSettings, ConfigError>;

    /// Save portal settings.
    fn save_settings(&self, settings: &PortalSettings) -> Result<(), ConfigError>;

    /// Load portal settings, falling back to defaults when none are stored.
    fn load_settings_or_default(&self) -> Result<PortalSettings, ConfigError> {
        match self.load_settings() {
            Err(ConfigError::NotFound(_)) => Ok(PortalSettings::default()),
            other => other,
        }
    }
}

/// Which meter device to drive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MeterSettings {
    /// Deterministic simulated meter. Metrics listed in `unavailable`
    /// (by document key) never deliver a reading.
    Simulated {
        #[serde(default)]
        unavailable: Vec<String>,
    },
    /// PZEM-004T v3.0 on a serial port.
    Pzem {
        port: String,
        #[serde(default = "default_pzem_address")]
        address: u8,
    },
}

fn default_pzem_address() -> u8 {
    DEFAULT_PZEM_ADDRESS
}

impl Default for MeterSettings {
    fn default() -> Self {
        MeterSettings::Simulated {
            unavailable: Vec::new(),
        }
    }
}

/// Portal settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalSettings {
    /// Address the HTTP server binds to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind_addr: Option<String>,

    /// Directory holding the style documents.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documents_dir: Option<String>,

    /// Path of the configuration page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_uri: Option<String>,

    /// Title of the configuration page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_title: Option<String>,

    /// Heartbeat toggle period in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heartbeat_ms: Option<u64>,

    /// sysfs LED toggled by the heartbeat (e.g. "led0"). Logged only when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heartbeat_led: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub meter: Option<MeterSettings>,
}

impl PortalSettings {
    pub fn bind_addr(&self) -> &str {
        self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR)
    }

    pub fn documents_dir(&self) -> &str {
        self.documents_dir.as_deref().unwrap_or(DEFAULT_DOCUMENTS_DIR)
    }

    pub fn page_uri(&self) -> &str {
        self.page_uri.as_deref().unwrap_or(DEFAULT_PAGE_URI)
    }

    pub fn page_title(&self) -> &str {
        self.page_title.as_deref().unwrap_or(DEFAULT_PAGE_TITLE)
    }

    pub fn heartbeat_ms(&self) -> u64 {
        self.heartbeat_ms.unwrap_or(DEFAULT_HEARTBEAT_MS)
    }

    pub fn meter(&self) -> MeterSettings {
        self.meter.clone().unwrap_or_default()
    }

    /// Check values the accessors cannot default their way out of.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.page_uri().starts_with('/') || self.page_uri() == "/" {
            return Err(ConfigError::InvalidData(format!(
                "pageUri must be an absolute path other than \"/\", got {:?}",
                self.page_uri()
            )));
        }
        if self.heartbeat_ms() == 0 {
            return Err(ConfigError::InvalidData(
                "heartbeatMs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Settings stored as a JSON file.
#[derive(Debug, Clone)]
pub struct FileConfigStorage {
    path: PathBuf,
}

impl FileConfigStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStorage for FileConfigStorage {
    fn load_settings(&self) -> Result<PortalSettings, ConfigError> {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ConfigError::NotFound(self.path.display().to_string()))
            }
            Err(e) => return Err(ConfigError::ReadError(e.to_string())),
        };
        let settings: PortalSettings =
            serde_json::from_str(&json).map_err(|e| ConfigError::InvalidData(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    fn save_settings(&self, settings: &PortalSettings) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(settings)
            .map_err(|e| ConfigError::WriteError(e.to_string()))?;
        fs::write(&self.path, json).map_err(|e| ConfigError::WriteError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = PortalSettings::default();
        assert_eq!(settings.bind_addr(), "0.0.0.0:8080");
        assert_eq!(settings.page_uri(), "/hello");
        assert_eq!(settings.heartbeat_ms(), 1000);
        assert_eq!(settings.meter(), MeterSettings::default());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_parse_pzem_settings() {
        let settings: PortalSettings = serde_json::from_str(
            r#"{"documentsDir":"/srv/styles","meter":{"kind":"pzem","port":"/dev/ttyUSB0"}}"#,
        )
        .unwrap();

        assert_eq!(settings.documents_dir(), "/srv/styles");
        assert_eq!(
            settings.meter(),
            MeterSettings::Pzem {
                port: "/dev/ttyUSB0".to_string(),
                address: 0xF8,
            }
        );
    }

    #[test]
    fn test_parse_simulated_settings() {
        let settings: PortalSettings = serde_json::from_str(
            r#"{"meter":{"kind":"simulated","unavailable":["current","energy"]}}"#,
        )
        .unwrap();
        match settings.meter() {
            MeterSettings::Simulated { unavailable } => {
                assert_eq!(unavailable, vec!["current", "energy"])
            }
            other => panic!("Expected simulated meter, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_root_page() {
        let settings = PortalSettings {
            page_uri: Some("/".to_string()),
            ..Default::default()
        };
        assert!(matches!(settings.validate(), Err(ConfigError::InvalidData(_))));
    }

    #[test]
    fn test_file_storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileConfigStorage::new(dir.path().join("meterstyle.json"));

        let settings = PortalSettings {
            heartbeat_ms: Some(500),
            heartbeat_led: Some("led0".to_string()),
            ..Default::default()
        };
        storage.save_settings(&settings).unwrap();

        assert_eq!(storage.load_settings().unwrap(), settings);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileConfigStorage::new(dir.path().join("absent.json"));

        assert!(matches!(storage.load_settings(), Err(ConfigError::NotFound(_))));
        assert_eq!(
            storage.load_settings_or_default().unwrap(),
            PortalSettings::default()
        );
    }

    #[test]
    fn test_invalid_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{\"heartbeatMs\": \"fast\"}").unwrap();

        let storage = FileConfigStorage::new(path);
        assert!(matches!(
            storage.load_settings_or_default(),
            Err(ConfigError::InvalidData(_))
        ));
    }
}
