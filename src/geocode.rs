//! Reverse geocoding: convert coordinates to a human-readable address.
//! Uses Nominatim (OpenStreetMap), which asks clients to identify
//! themselves with a User-Agent.

use crate::api::{FetchError, JsonFetcher};
use crate::models::{GeoPoint, ReverseGeocodeResponse};
use tracing::{debug, info};

pub const DEFAULT_REVERSE_GEOCODE_URL: &str = "https://nominatim.openstreetmap.org/reverse";
pub const DEFAULT_USER_AGENT: &str = "IP-Grabber-Beta/1.0";

pub fn reverse_geocode_url(base: &str, at: GeoPoint) -> String {
    format!("{}?format=jsonv2&lat={}&lon={}", base, at.lat, at.lon)
}

/// Looks up the address at `at`.
///
/// Returns `Ok(None)` when the service answered but had no usable
/// `display_name` (e.g. open water); the caller falls back to coordinates.
pub async fn reverse_geocode<F: JsonFetcher>(
    fetcher: &F,
    base: &str,
    user_agent: &str,
    at: GeoPoint,
) -> Result<Option<String>, FetchError> {
    let url = reverse_geocode_url(base, at);
    let body = fetcher.get_json(&url, &[("User-Agent", user_agent)]).await?;
    let response: ReverseGeocodeResponse = serde_json::from_value(body)?;

    match response.usable_address() {
        Some(address) => {
            info!("Reverse geocoded to: {}", address);
            Ok(Some(address.to_string()))
        }
        None => {
            debug!("Reverse geocode returned no display name for {}", at.precise_label());
            Ok(None)
        }
    }
}
