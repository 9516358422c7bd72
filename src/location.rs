//! Approximate location lookup keyed by the caller's IP address.
//!
//! This module provides [`lookup_ip`], which asks an IP geolocation
//! service (GeoJS by default) who the caller appears to be. The service
//! infers the address from the connection itself, so no IP is sent.

use crate::api::{FetchError, JsonFetcher};
use crate::models::IpGeoResponse;
use tracing::{error, info};

pub const DEFAULT_IP_LOOKUP_URL: &str = "https://get.geojs.io/v1/ip/geo.json";

/// Fetches and decodes the IP geolocation record for the caller.
///
/// # Errors
///
/// Returns [`FetchError`] on network failure, a non-success status, or a
/// body that is not an IP geolocation object.
pub async fn lookup_ip<F: JsonFetcher>(fetcher: &F, url: &str) -> Result<IpGeoResponse, FetchError> {
    let body = fetcher.get_json(url, &[]).await.map_err(|e| {
        error!("IP lookup against {} failed: {}", url, e);
        e
    })?;
    let record: IpGeoResponse = serde_json::from_value(body)?;
    info!(
        "IP lookup successful - {} ({})",
        record.ip_label(),
        record.location_label()
    );
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::HttpFetcher;
    use crate::models::GeoPoint;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn decodes_geojs_record() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/ip/geo.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ip": "192.0.2.44",
                "organization_name": "Example Telecom",
                "timezone": "America/Toronto",
                "city": "Ottawa",
                "region": "Ontario",
                "country_code": "CA",
                "latitude": "45.4112",
                "longitude": "-75.6981",
                "accuracy": 5
            })))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(None).unwrap();
        let record = lookup_ip(&fetcher, &format!("{}/v1/ip/geo.json", server.uri()))
            .await
            .unwrap();

        assert_eq!(record.ip_label(), "192.0.2.44");
        assert_eq!(record.location_label(), "Ottawa, Ontario, CA");
        assert_eq!(record.coordinates(), Some(GeoPoint::new(45.4112, -75.6981)));
    }

    #[tokio::test]
    async fn wrong_shape_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(["not", "an", "object"])))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(None).unwrap();
        let result = lookup_ip(&fetcher, &server.uri()).await;
        assert!(matches!(result, Err(FetchError::Decode(_))));
    }
}
