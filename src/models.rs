use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const UNKNOWN: &str = "Unknown";
pub const UNKNOWN_LOCATION: &str = "Unknown Location";

/// A latitude/longitude pair in decimal degrees (WGS84).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// "lat, lon" with six decimals, the way precise fixes are displayed.
    pub fn precise_label(&self) -> String {
        format!("{:.6}, {:.6}", self.lat, self.lon)
    }
}

// Response body of the IP geolocation service (GeoJS shape).
// Every field is optional. Text fields take numbers as their decimal text;
// coordinates arrive as strings but plain numbers are tolerated.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IpGeoResponse {
    #[serde(default, deserialize_with = "lenient_text")]
    pub ip: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub organization_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub organization: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub timezone: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub region: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub country_code: Option<String>,
    pub latitude: Option<Value>,
    pub longitude: Option<Value>,
}

impl IpGeoResponse {
    pub fn ip_label(&self) -> String {
        non_empty(&self.ip).unwrap_or(UNKNOWN).to_string()
    }

    /// Organization (falling back through both field names) plus timezone.
    pub fn isp_label(&self) -> String {
        let org = non_empty(&self.organization_name)
            .or_else(|| non_empty(&self.organization))
            .unwrap_or(UNKNOWN);
        let tz = non_empty(&self.timezone).unwrap_or("");
        format!("{} ({})", org, tz)
    }

    pub fn location_parts(&self) -> Vec<&str> {
        [&self.city, &self.region, &self.country_code]
            .into_iter()
            .filter_map(non_empty)
            .collect()
    }

    pub fn location_label(&self) -> String {
        let parts = self.location_parts();
        if parts.is_empty() {
            UNKNOWN_LOCATION.to_string()
        } else {
            parts.join(", ")
        }
    }

    /// Both coordinates, if both parse as finite numbers.
    pub fn coordinates(&self) -> Option<GeoPoint> {
        let lat = self.latitude.as_ref().and_then(parse_degrees)?;
        let lon = self.longitude.as_ref().and_then(parse_degrees)?;
        Some(GeoPoint::new(lat, lon))
    }
}

/// The three primary strings shown after a successful IP lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct IpSummary {
    pub ip: String,
    pub isp: String,
    pub location: String,
}

impl From<&IpGeoResponse> for IpSummary {
    fn from(resp: &IpGeoResponse) -> Self {
        Self {
            ip: resp.ip_label(),
            isp: resp.isp_label(),
            location: resp.location_label(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReverseGeocodeResponse {
    pub display_name: Option<String>,
}

impl ReverseGeocodeResponse {
    pub fn usable_address(&self) -> Option<&str> {
        non_empty(&self.display_name)
    }
}

// Only the empty string counts as missing; whitespace is shown as sent.
fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

// Strings pass through, numbers become their text, anything else is missing.
fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn parse_degrees(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(body: Value) -> IpGeoResponse {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn full_response_derives_display_strings() {
        let resp = response(json!({
            "ip": "203.0.113.7",
            "organization_name": "Example Fiber",
            "organization": "AS64500 Example Fiber",
            "timezone": "Europe/London",
            "city": "Leeds",
            "region": "England",
            "country_code": "GB",
            "latitude": "53.7965",
            "longitude": "-1.5478"
        }));

        let summary = IpSummary::from(&resp);
        assert_eq!(summary.ip, "203.0.113.7");
        assert_eq!(summary.isp, "Example Fiber (Europe/London)");
        assert_eq!(summary.location, "Leeds, England, GB");
        assert_eq!(resp.coordinates(), Some(GeoPoint::new(53.7965, -1.5478)));
    }

    #[test]
    fn missing_fields_fall_back() {
        let resp = response(json!({}));
        let summary = IpSummary::from(&resp);
        assert_eq!(summary.ip, "Unknown");
        assert_eq!(summary.isp, "Unknown ()");
        assert_eq!(summary.location, "Unknown Location");
        assert!(resp.location_parts().is_empty());
        assert_eq!(resp.coordinates(), None);
    }

    #[test]
    fn organization_falls_back_to_second_field() {
        let resp = response(json!({
            "organization_name": "",
            "organization": "AS64500 Example",
            "timezone": "UTC"
        }));
        assert_eq!(resp.isp_label(), "AS64500 Example (UTC)");
    }

    #[test]
    fn empty_location_parts_are_skipped() {
        let resp = response(json!({ "city": "", "region": "Ontario", "country_code": "CA" }));
        assert_eq!(resp.location_label(), "Ontario, CA");
    }

    #[test]
    fn values_are_shown_untrimmed() {
        let resp = response(json!({
            "ip": " 203.0.113.7 ",
            "city": " ",
            "region": "Ontario",
            "country_code": "CA"
        }));
        assert_eq!(resp.ip_label(), " 203.0.113.7 ");
        assert_eq!(resp.location_label(), " , Ontario, CA");
    }

    #[test]
    fn numeric_text_fields_do_not_fail_the_record() {
        let resp = response(json!({
            "ip": "198.51.100.4",
            "organization": 12345,
            "city": null,
            "region": ["not", "text"],
            "country_code": "US"
        }));
        assert_eq!(resp.isp_label(), "12345 ()");
        assert_eq!(resp.location_label(), "US");
    }

    #[test]
    fn coordinates_accept_numbers_and_reject_garbage() {
        let numeric = response(json!({ "latitude": 48.85, "longitude": 2.35 }));
        assert_eq!(numeric.coordinates(), Some(GeoPoint::new(48.85, 2.35)));

        let garbage = response(json!({ "latitude": "nil", "longitude": "2.35" }));
        assert_eq!(garbage.coordinates(), None);

        let nan = response(json!({ "latitude": "NaN", "longitude": "2.35" }));
        assert_eq!(nan.coordinates(), None);

        let half = response(json!({ "latitude": "48.85" }));
        assert_eq!(half.coordinates(), None);
    }

    #[test]
    fn precise_label_uses_six_decimals() {
        assert_eq!(GeoPoint::new(51.5, -0.1275).precise_label(), "51.500000, -0.127500");
    }

    #[test]
    fn reverse_geocode_address_must_be_non_empty() {
        let found: ReverseGeocodeResponse =
            serde_json::from_value(json!({ "display_name": "10 Downing Street, London" })).unwrap();
        assert_eq!(found.usable_address(), Some("10 Downing Street, London"));

        let empty: ReverseGeocodeResponse =
            serde_json::from_value(json!({ "display_name": "" })).unwrap();
        assert_eq!(empty.usable_address(), None);

        let spaces: ReverseGeocodeResponse =
            serde_json::from_value(json!({ "display_name": "  " })).unwrap();
        assert_eq!(spaces.usable_address(), Some("  "));

        let error: ReverseGeocodeResponse =
            serde_json::from_value(json!({ "error": "Unable to geocode" })).unwrap();
        assert_eq!(error.usable_address(), None);
    }
}
