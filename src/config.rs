//! Configuration management module.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::geo::{GeoPoint, GeofenceChecker};
use crate::shift::{DEFAULT_GRACE_SECONDS, ShiftWindowEvaluator};

/// Configuration load result.
#[derive(Debug)]
pub enum ConfigLoadResult {
    /// Config loaded successfully.
    Loaded(AppConfig),
    /// Config file missing (first run).
    Missing,
    /// Config file exists but invalid.
    Invalid(ConfigError),
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Validation failed: {0}")]
    Validation(String),
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub office: OfficeConfig,
    #[serde(default)]
    pub shift: ShiftConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// Attendance backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    /// Request timeout in seconds (default: 30).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

/// Office location used as the geofence reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfficeConfig {
    pub latitude: f64,
    pub longitude: f64,
    /// Allowed distance from the office in meters (default: 100 km).
    #[serde(default = "default_max_radius_meters")]
    pub max_radius_meters: f64,
}

fn default_max_radius_meters() -> f64 {
    100_000.0
}

/// Shift evaluation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftConfig {
    #[serde(default = "default_grace_seconds")]
    pub grace_seconds: u32,
    /// How often the attendance state is recomputed.
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,
}

fn default_grace_seconds() -> u32 {
    DEFAULT_GRACE_SECONDS
}

fn default_tick_interval_secs() -> u64 {
    1
}

/// Session storage settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Override for the session file location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl AppConfig {
    /// Get config file path (platform config directory).
    pub fn default_path() -> PathBuf {
        project_dirs()
            .map(|dirs| dirs.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
            .join("config.toml")
    }

    /// Attempt to load config with detailed result.
    pub fn try_load(path: &Path) -> ConfigLoadResult {
        if !path.exists() {
            return ConfigLoadResult::Missing;
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str::<AppConfig>(&content) {
                Ok(config) => match config.validate() {
                    Ok(()) => ConfigLoadResult::Loaded(config),
                    Err(e) => ConfigLoadResult::Invalid(e),
                },
                Err(e) => ConfigLoadResult::Invalid(ConfigError::Parse(e)),
            },
            Err(e) => ConfigLoadResult::Invalid(ConfigError::Read(e)),
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.api.base_url.starts_with("http") {
            return Err(ConfigError::Validation(
                "API URL must start with http:// or https://".to_string(),
            ));
        }
        if self.api.timeout_secs < 5 {
            return Err(ConfigError::Validation(
                "API timeout must be at least 5 seconds".to_string(),
            ));
        }
        self.office
            .geofence()
            .map_err(|e| ConfigError::Validation(format!("Office location: {e}")))?;
        if !(1..=60).contains(&self.shift.tick_interval_secs) {
            return Err(ConfigError::Validation(
                "Tick interval must be between 1 and 60 seconds".to_string(),
            ));
        }
        Ok(())
    }

    /// Save configuration to file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Resolved session file path.
    pub fn session_path(&self) -> PathBuf {
        self.session.path.clone().unwrap_or_else(|| {
            project_dirs()
                .map(|dirs| dirs.data_dir().to_path_buf())
                .unwrap_or_else(|| PathBuf::from("."))
                .join("session.json")
        })
    }
}

impl OfficeConfig {
    pub fn location(&self) -> GeoPoint {
        GeoPoint {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }

    /// Build the validated geofence for this office.
    pub fn geofence(&self) -> Result<GeofenceChecker, crate::geo::InvalidCoordinateError> {
        GeofenceChecker::new(self.location(), self.max_radius_meters)
    }
}

impl ShiftConfig {
    pub fn evaluator(&self) -> ShiftWindowEvaluator {
        ShiftWindowEvaluator::new(self.grace_seconds)
    }
}

/// Platform directories for config, data and logs.
pub fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("id", "presensi", "presensi")
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for OfficeConfig {
    fn default() -> Self {
        Self {
            latitude: -6.2,
            longitude: 106.816_666,
            max_radius_meters: default_max_radius_meters(),
        }
    }
}

impl Default for ShiftConfig {
    fn default() -> Self {
        Self {
            grace_seconds: default_grace_seconds(),
            tick_interval_secs: default_tick_interval_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.office.max_radius_meters, 100_000.0);
        assert_eq!(config.shift.grace_seconds, 3600);
    }

    #[test]
    fn test_validation_invalid_api_url() {
        let mut config = AppConfig::default();
        config.api.base_url = "ftp://invalid".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_timeout() {
        let mut config = AppConfig::default();
        config.api.timeout_secs = 2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_office_location() {
        let mut config = AppConfig::default();
        config.office.latitude = 95.0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.office.max_radius_meters = -5.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_tick_bounds() {
        let mut config = AppConfig::default();

        config.shift.tick_interval_secs = 0;
        assert!(config.validate().is_err());

        config.shift.tick_interval_secs = 61;
        assert!(config.validate().is_err());

        config.shift.tick_interval_secs = 60;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_minimal_toml() {
        let content = r#"
            [api]
            base_url = "https://absen.example.com/api"

            [office]
            latitude = -6.3
            longitude = 106.9
        "#;
        let config: AppConfig = toml::from_str(content).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.office.max_radius_meters, 100_000.0);
        assert_eq!(config.shift.tick_interval_secs, 1);
        assert!(config.session.path.is_none());
    }

    #[test]
    fn test_save_and_load() {
        let dir = std::env::temp_dir().join(format!("presensi-config-{}", std::process::id()));
        let path = dir.join("config.toml");

        let mut config = AppConfig::default();
        config.office.max_radius_meters = 250.0;
        config.save(&path).unwrap();

        match AppConfig::try_load(&path) {
            ConfigLoadResult::Loaded(loaded) => assert_eq!(loaded.office.max_radius_meters, 250.0),
            other => panic!("unexpected load result: {other:?}"),
        }

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_config() {
        let path = std::env::temp_dir().join("presensi-does-not-exist/config.toml");
        assert!(matches!(AppConfig::try_load(&path), ConfigLoadResult::Missing));
    }
}
