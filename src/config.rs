use crate::geocode::{DEFAULT_REVERSE_GEOCODE_URL, DEFAULT_USER_AGENT};
use crate::location::DEFAULT_IP_LOOKUP_URL;
use crate::position::DEFAULT_GPSD_ADDRESS;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

pub const CONFIG_PATH: &str = "config.toml";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    pub endpoints: EndpointConfig,
    pub position: PositionConfig,
    pub map: MapConfig,
    pub logging: LoggingConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SiteConfig {
    pub name: String, // Shown in the footer
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct EndpointConfig {
    pub ip_lookup: String,
    pub reverse_geocode: String,
    pub user_agent: String, // Identifies us to the reverse geocoder
    pub request_timeout_seconds: Option<u64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Gpsd,
    Fixed,
    Off,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PositionConfig {
    pub source: SourceKind,
    pub allow: bool, // false behaves like a declined permission prompt
    pub gpsd_address: String,
    pub fixed_lat: Option<f64>,
    pub fixed_lon: Option<f64>,
    pub high_accuracy: bool,
    pub timeout_ms: u64,
    pub maximum_age_ms: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct MapConfig {
    pub ip_zoom: u8,
    pub precise_zoom: u8,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub directory: String,
    pub file_name: String, // Daily suffix is appended
    pub level: String,     // Used when RUST_LOG is unset
}

/// Problems met while loading the config. Loading never fails outright;
/// these are kept until logging is up and then reported.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse {}: {}. Using defaults.", .path.display(), .source)]
    Parse { path: PathBuf, source: toml::de::Error },
    #[error("Could not read {}: {}. Using defaults.", .path.display(), .source)]
    Read { path: PathBuf, source: io::Error },
    #[error("Could not write default {} to disk: {}", .path.display(), .source)]
    WriteDefault { path: PathBuf, source: io::Error },
    #[error("Could not serialize default config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// A config plus whatever happened while getting it.
#[derive(Debug)]
pub struct Loaded {
    pub config: Config,
    pub problems: Vec<ConfigError>,
    pub wrote_default: bool,
}

impl Loaded {
    fn clean(config: Config) -> Self {
        Self {
            config,
            problems: Vec::new(),
            wrote_default: false,
        }
    }

    fn fallback(problem: ConfigError) -> Self {
        Self {
            config: Config::default(),
            problems: vec![problem],
            wrote_default: false,
        }
    }

    /// Emits the load diagnostics; call once the subscriber is installed.
    pub fn report(&self) {
        for problem in &self.problems {
            warn!("{}", problem);
        }
        if self.wrote_default {
            info!("Loaded default configuration.");
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: "YOURSITE.COM".to_string(),
        }
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            ip_lookup: DEFAULT_IP_LOOKUP_URL.to_string(),
            reverse_geocode: DEFAULT_REVERSE_GEOCODE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout_seconds: None,
        }
    }
}

impl EndpointConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_seconds.map(Duration::from_secs)
    }
}

impl Default for PositionConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::Gpsd,
            allow: true,
            gpsd_address: DEFAULT_GPSD_ADDRESS.to_string(),
            fixed_lat: None,
            fixed_lon: None,
            high_accuracy: true,
            timeout_ms: 10_000,
            maximum_age_ms: 0,
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            ip_zoom: 10,
            precise_zoom: 15,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: "logs".to_string(),
            file_name: "ipgrabber.log".to_string(),
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Loads config.toml from the working directory.
    /// If it doesn't exist, creates a default one.
    pub fn load() -> Loaded {
        Self::load_from(Path::new(CONFIG_PATH))
    }

    pub fn load_from(path: &Path) -> Loaded {
        match fs::read_to_string(path) {
            Ok(content) => {
                return match toml::from_str(&content) {
                    Ok(config) => Loaded::clean(config),
                    Err(source) => Loaded::fallback(ConfigError::Parse {
                        path: path.to_path_buf(),
                        source,
                    }),
                };
            }
            Err(source) if source.kind() != io::ErrorKind::NotFound => {
                return Loaded::fallback(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
            Err(_) => {}
        }

        let mut loaded = Loaded::clean(Config::default());
        loaded.wrote_default = true;

        // Save default config to disk for the user to edit later
        match toml::to_string_pretty(&loaded.config) {
            Ok(toml_string) => {
                if let Err(source) = fs::write(path, toml_string) {
                    loaded.problems.push(ConfigError::WriteDefault {
                        path: path.to_path_buf(),
                        source,
                    });
                }
            }
            Err(e) => loaded.problems.push(e.into()),
        }

        loaded
    }
}
