//! Device position sources.
//!
//! A terminal has no browser geolocation prompt, so the precise fix comes
//! from one of a few sources picked in `config.toml`: a local gpsd daemon,
//! fixed coordinates, or nothing at all. Every source answers a single
//! request and never subscribes to updates.

use crate::config::{PositionConfig, SourceKind};
use crate::models::GeoPoint;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, info};

pub const DEFAULT_GPSD_ADDRESS: &str = "127.0.0.1:2947";

const WATCH_COMMAND: &[u8] = b"?WATCH={\"enable\":true,\"json\":true};\n";
const POLL_COMMAND: &[u8] = b"?POLL;\n";

/// Options for a single position request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionOptions {
    pub high_accuracy: bool,
    pub timeout: Duration,
    /// Oldest cached fix that may be returned. Zero demands a live reading.
    pub maximum_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: Duration::from_millis(10_000),
            maximum_age: Duration::ZERO,
        }
    }
}

impl From<&PositionConfig> for PositionOptions {
    fn from(config: &PositionConfig) -> Self {
        Self {
            high_accuracy: config.high_accuracy,
            timeout: Duration::from_millis(config.timeout_ms),
            maximum_age: Duration::from_millis(config.maximum_age_ms),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PositionError {
    #[error("User denied geolocation permission")]
    PermissionDenied,
    #[error("Geolocation is not supported on this device")]
    Unsupported,
    #[error("Position unavailable: {0}")]
    Unavailable(String),
    #[error("Timeout expired")]
    Timeout,
}

/// Answers "where is this device right now?" once.
pub trait PositionSource: Send + Sync {
    fn current_position(
        &self,
        options: &PositionOptions,
    ) -> impl Future<Output = Result<GeoPoint, PositionError>> + Send;
}

/// The position source selected by configuration.
#[derive(Debug, Clone)]
pub enum DeviceLocator {
    Gpsd(GpsdSource),
    Fixed(Option<GeoPoint>),
    Denied,
    Unsupported,
}

impl DeviceLocator {
    pub fn from_config(config: &PositionConfig) -> Self {
        if !config.allow {
            return Self::Denied;
        }
        match config.source {
            SourceKind::Gpsd => Self::Gpsd(GpsdSource::new(&config.gpsd_address)),
            SourceKind::Fixed => Self::Fixed(
                config
                    .fixed_lat
                    .zip(config.fixed_lon)
                    .map(|(lat, lon)| GeoPoint::new(lat, lon)),
            ),
            SourceKind::Off => Self::Unsupported,
        }
    }
}

impl PositionSource for DeviceLocator {
    async fn current_position(&self, options: &PositionOptions) -> Result<GeoPoint, PositionError> {
        match self {
            Self::Gpsd(gpsd) => gpsd.current_position(options).await,
            Self::Fixed(Some(at)) => Ok(*at),
            Self::Fixed(None) => Err(PositionError::Unavailable(
                "no fixed coordinates configured".to_string(),
            )),
            Self::Denied => Err(PositionError::PermissionDenied),
            Self::Unsupported => Err(PositionError::Unsupported),
        }
    }
}

/// Reads a fix from a gpsd daemon over its JSON socket protocol.
#[derive(Debug, Clone)]
pub struct GpsdSource {
    address: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "class")]
enum GpsdReport {
    #[serde(rename = "TPV")]
    Tpv(Tpv),
    #[serde(rename = "POLL")]
    Poll {
        #[serde(default)]
        tpv: Vec<Tpv>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct Tpv {
    #[serde(default)]
    mode: u8,
    lat: Option<f64>,
    lon: Option<f64>,
    time: Option<String>,
}

impl Tpv {
    // mode 2 is a 2D fix, mode 3 a 3D fix
    fn fix(&self, high_accuracy: bool) -> Option<GeoPoint> {
        let required = if high_accuracy { 3 } else { 2 };
        if self.mode < required {
            return None;
        }
        Some(GeoPoint::new(self.lat?, self.lon?))
    }

    fn is_fresh(&self, maximum_age: Duration, now: DateTime<Utc>) -> bool {
        let Some(reported) = self
            .time
            .as_deref()
            .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
        else {
            return false;
        };
        let age = now.signed_duration_since(reported.with_timezone(&Utc));
        age.to_std().map_or(true, |age| age <= maximum_age)
    }
}

impl GpsdSource {
    pub fn new(address: &str) -> Self {
        Self {
            address: address.to_string(),
        }
    }
}

impl PositionSource for GpsdSource {
    async fn current_position(&self, options: &PositionOptions) -> Result<GeoPoint, PositionError> {
        let unavailable = |e: std::io::Error| PositionError::Unavailable(format!("gpsd at {}: {}", self.address, e));

        let stream = TcpStream::connect(&self.address).await.map_err(unavailable)?;
        let (reader, mut writer) = stream.into_split();
        let mut commands = WATCH_COMMAND.to_vec();
        if !options.maximum_age.is_zero() {
            commands.extend_from_slice(POLL_COMMAND);
        }
        writer.write_all(&commands).await.map_err(unavailable)?;
        debug!("Watching gpsd at {}", self.address);

        let mut lines = BufReader::new(reader).lines();
        while let Some(line) = lines.next_line().await.map_err(unavailable)? {
            let report = match serde_json::from_str::<GpsdReport>(&line) {
                Ok(report) => report,
                Err(e) => {
                    debug!("Skipping unreadable gpsd report: {}", e);
                    continue;
                }
            };

            let fix = match report {
                GpsdReport::Tpv(tpv) => tpv.fix(options.high_accuracy),
                GpsdReport::Poll { tpv } => {
                    let now = Utc::now();
                    tpv.iter()
                        .filter(|t| t.is_fresh(options.maximum_age, now))
                        .find_map(|t| t.fix(options.high_accuracy))
                }
                GpsdReport::Other => None,
            };

            if let Some(at) = fix {
                info!("gpsd fix - ({}, {})", at.lat, at.lon);
                return Ok(at);
            }
        }

        Err(PositionError::Unavailable(
            "gpsd closed the connection before reporting a fix".to_string(),
        ))
    }
}
