//! # Configuration Management
//!
//! This module loads the clock's settings from `tide-config.toml` and its
//! credentials from `secrets.toml`. Settings have defaults for every field so
//! a partial (or missing) config file still yields a working clock for
//! Auckland; credentials have no defaults and are required.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::panel::Ink;
use crate::planner::Layout;

pub const CONFIG_FILE: &str = "tide-config.toml";
pub const SECRETS_FILE: &str = "secrets.toml";

/// Errors raised while reading configuration or credentials.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("cannot serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// What the entry point does when a cycle fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Propagate the error and exit non-zero
    #[default]
    Halt,
    /// Log the error and go to sleep until the next cycle anyway
    Sleep,
}

/// Application configuration loaded from tide-config.toml
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Text of the header line
    pub title: String,
    pub on_error: ErrorPolicy,
    pub location: LocationConfig,
    pub tide_api: TideApiConfig,
    pub timezone_api: TimezoneApiConfig,
    pub display: DisplayConfig,
    pub http: HttpConfig,
    pub sleep: SleepConfig,
    pub network: NetworkConfig,
}

/// Where the tides are predicted for
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct LocationConfig {
    pub latitude: f64,
    pub longitude: f64,
    /// `numberOfDays` sent to the tide API
    pub days: u32,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct TideApiConfig {
    pub endpoint: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct TimezoneApiConfig {
    pub endpoint: String,
    /// IANA zone name; independent of the tide location
    pub zone: String,
}

/// Panel geometry and text layout, in panel pixels
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub width: u32,
    pub height: u32,
    pub ink: Ink,
    pub title_x: i32,
    pub title_y: i32,
    pub title_scale: u32,
    /// Horizontal offset of the date, on the title row
    pub date_x: i32,
    pub date_scale: u32,
    /// chrono format string for the date line
    pub date_format: String,
    pub event_x: i32,
    /// y of the first tide line
    pub first_event_y: i32,
    /// Vertical step between tide lines
    pub line_increment: i32,
    pub event_scale: u32,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout; 0 disables it
    pub timeout_secs: u64,
    /// Extra attempts after a transport error or 5xx response
    pub retries: u32,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct SleepConfig {
    pub seconds: u64,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Address used to discover the outbound interface; nothing is sent to it
    pub probe_addr: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            title: "Tide Clock".to_string(),
            on_error: ErrorPolicy::Halt,
            location: LocationConfig::default(),
            tide_api: TideApiConfig::default(),
            timezone_api: TimezoneApiConfig::default(),
            display: DisplayConfig::default(),
            http: HttpConfig::default(),
            sleep: SleepConfig::default(),
            network: NetworkConfig::default(),
        }
    }
}

impl Default for LocationConfig {
    fn default() -> Self {
        // Auckland, Waitematā Harbour
        LocationConfig {
            latitude: -36.84,
            longitude: 174.77,
            days: 1,
        }
    }
}

impl Default for TideApiConfig {
    fn default() -> Self {
        TideApiConfig {
            endpoint: "https://api.niwa.co.nz/tides/data".to_string(),
        }
    }
}

impl Default for TimezoneApiConfig {
    fn default() -> Self {
        TimezoneApiConfig {
            endpoint: "https://api.timezonedb.com/v2.1/get-time-zone".to_string(),
            zone: "Pacific/Auckland".to_string(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        // 2.9" tri-colour panel in landscape
        DisplayConfig {
            width: 296,
            height: 128,
            ink: Ink::Red,
            title_x: 5,
            title_y: 5,
            title_scale: 2,
            date_x: 180,
            date_scale: 1,
            date_format: "%a %d %b".to_string(),
            event_x: 5,
            first_event_y: 35,
            line_increment: 18,
            event_scale: 1,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        HttpConfig {
            timeout_secs: 30,
            retries: 0,
        }
    }
}

impl Default for SleepConfig {
    fn default() -> Self {
        SleepConfig { seconds: 86_400 }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            probe_addr: "1.1.1.1:53".to_string(),
        }
    }
}

impl DisplayConfig {
    /// Text layout for the render planner
    pub fn layout(&self) -> Layout {
        Layout {
            title_x: self.title_x,
            title_y: self.title_y,
            title_scale: self.title_scale,
            date_x: self.date_x,
            date_scale: self.date_scale,
            event_x: self.event_x,
            first_event_y: self.first_event_y,
            line_increment: self.line_increment,
            event_scale: self.event_scale,
        }
    }
}

impl Config {
    /// Load configuration from tide-config.toml
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load() -> Self {
        Self::load_from_path(CONFIG_FILE)
    }

    /// Load configuration from specified path
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str::<Config>(&contents) {
                Ok(config) => {
                    info!(
                        zone = %config.timezone_api.zone,
                        lat = config.location.latitude,
                        long = config.location.longitude,
                        "loaded configuration"
                    );
                    config
                }
                Err(e) => {
                    warn!("invalid config file format: {}", e);
                    warn!("using default configuration (Auckland)");
                    Self::default()
                }
            },
            Err(_) => {
                info!("no config file found, using default configuration (Auckland)");
                Self::default()
            }
        }
    }

    /// Save current configuration to tide-config.toml
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to_path(CONFIG_FILE)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        info!("configuration saved to {}", path.display());
        Ok(())
    }
}

/// Network and API credentials, read once at startup.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub ssid: String,
    pub password: String,
    pub tide_api_key: String,
    pub timezone_api_key: String,
}

// Keys and passwords stay out of logs
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("ssid", &self.ssid)
            .finish_non_exhaustive()
    }
}

impl Credentials {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path(SECRETS_FILE)
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.timezone_api.zone, "Pacific/Auckland");
        assert_eq!(config.location.days, 1);
        assert_eq!(config.display.width, 296);
        assert_eq!(config.display.height, 128);
        assert_eq!(config.sleep.seconds, 86_400);
        assert_eq!(config.on_error, ErrorPolicy::Halt);
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.tide_api.endpoint, parsed.tide_api.endpoint);
        assert_eq!(config.display.date_format, parsed.display.date_format);
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let parsed: Config = toml::from_str(
            r#"
on_error = "sleep"

[location]
latitude = -41.28
longitude = 174.78

[display]
line_increment = 24
"#,
        )
        .unwrap();
        assert_eq!(parsed.on_error, ErrorPolicy::Sleep);
        assert_eq!(parsed.location.latitude, -41.28);
        assert_eq!(parsed.location.days, 1);
        assert_eq!(parsed.display.line_increment, 24);
        assert_eq!(parsed.display.width, 296);
        assert_eq!(parsed.timezone_api.zone, "Pacific/Auckland");
    }

    #[test]
    fn test_example_config_matches_defaults() {
        let example: Config = toml::from_str(include_str!("../tide-config.example.toml")).unwrap();
        let defaults = Config::default();
        assert_eq!(example.title, defaults.title);
        assert_eq!(example.tide_api.endpoint, defaults.tide_api.endpoint);
        assert_eq!(example.display.layout(), defaults.display.layout());
        assert_eq!(example.display.ink, defaults.display.ink);
        assert_eq!(example.sleep.seconds, defaults.sleep.seconds);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let config = Config::load_from_path("/nonexistent/path");
        assert_eq!(config.timezone_api.zone, "Pacific/Auckland");
    }

    #[test]
    fn test_load_invalid_file_falls_back() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "this is = = not toml").unwrap();
        let config = Config::load_from_path(file.path());
        assert_eq!(config.display.height, 128);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tide-config.toml");
        let mut config = Config::default();
        config.timezone_api.zone = "Pacific/Chatham".to_string();
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_from_path(&path);
        assert_eq!(loaded.timezone_api.zone, "Pacific/Chatham");
    }

    #[test]
    fn test_credentials_load() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
ssid = "harbour"
password = "hunter2"
tide_api_key = "tide-key"
timezone_api_key = "tz-key"
"#
        )
        .unwrap();
        let creds = Credentials::load_from_path(file.path()).unwrap();
        assert_eq!(creds.ssid, "harbour");
        assert_eq!(creds.timezone_api_key, "tz-key");
        assert!(!format!("{:?}", creds).contains("hunter2"));
    }

    #[test]
    fn test_credentials_missing_is_error() {
        let err = Credentials::load_from_path("/nonexistent/secrets.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_credentials_missing_field_is_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"ssid = "harbour""#).unwrap();
        let err = Credentials::load_from_path(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
