//! Nominatim / OpenStreetMap reverse geocoder client.
//!
//! Nominatim has strict rate limits: **1 request per second** maximum on the
//! public instance. The monitor's fixed inter-cycle delay keeps us far under
//! that, so no additional throttling is layered here.
//!
//! See <https://nominatim.org/release-docs/develop/api/Reverse/>

use crate::{GeocodeError, Locality};

/// Public Nominatim reverse endpoint.
pub const DEFAULT_BASE_URL: &str = "https://nominatim.openstreetmap.org/reverse";

/// Reverse-geocodes a coordinate pair into its locality.
///
/// Returns `Ok(None)` when Nominatim has no address for the spot (open
/// water, unmapped areas) — that is a data condition, not an error.
///
/// # Errors
///
/// Returns [`GeocodeError`] if the HTTP request or response parsing fails.
pub async fn reverse(
    client: &reqwest::Client,
    base_url: &str,
    latitude: f64,
    longitude: f64,
) -> Result<Option<Locality>, GeocodeError> {
    let lat = latitude.to_string();
    let lon = longitude.to_string();
    let resp = client
        .get(base_url)
        .query(&[
            ("lat", lat.as_str()),
            ("lon", lon.as_str()),
            ("format", "jsonv2"),
            ("zoom", "18"),
        ])
        .send()
        .await?;

    if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(GeocodeError::RateLimited);
    }

    let body: serde_json::Value = resp.json().await?;
    let locality = parse_response(&body)?;
    if locality.is_none() {
        log::debug!("No reverse geocoding result for ({latitude}, {longitude})");
    }
    Ok(locality)
}

/// Parses a Nominatim reverse JSON response.
fn parse_response(body: &serde_json::Value) -> Result<Option<Locality>, GeocodeError> {
    // Nominatim reports "no result" as an error object with HTTP 200.
    if body.get("error").is_some() {
        return Ok(None);
    }

    let address = body
        .get("address")
        .and_then(serde_json::Value::as_object)
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing address object in Nominatim response".to_string(),
        })?;

    let field = |key: &str| address.get(key).and_then(|v| v.as_str()).map(String::from);

    Ok(Some(Locality {
        neighborhood: field("neighbourhood").or_else(|| field("suburb")),
        city: field("city").or_else(|| field("town")),
    }))
}
