#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Static map rendering for published alerts.
//!
//! One fetch against the Mapbox Static Images API: a tilted close-up of the
//! incident coordinates with a red marker, in the traffic-day or
//! traffic-night style. Day versus night is decided by a fixed local clock
//! cutoff, not real astronomical sunset — the source covers a single
//! communications center, so a constant is accurate enough.

use async_trait::async_trait;
use chrono::{Local, NaiveTime, Timelike};
use strum_macros::Display;

/// Mapbox Static Images API base.
const MAPBOX_BASE_URL: &str = "https://api.mapbox.com/styles/v1/mapbox/";

/// Local hour after which the night style is used.
const NIGHT_CUTOFF_HOUR: u32 = 19;

/// Camera and size parameters matching the published alert format.
const ZOOM: u32 = 16;
const BEARING: u32 = 0;
const PITCH: u32 = 60;
const SIZE: &str = "500x500@2x";

/// Marker: small red pin at the incident.
const MARKER: &str = "pin-s+ff4242";

/// Errors that can occur while rendering a map image.
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Map style variant, selected by time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum MapStyle {
    /// Daytime traffic style.
    #[strum(serialize = "traffic-day-v2")]
    Day,
    /// Nighttime traffic style.
    #[strum(serialize = "traffic-night-v2")]
    Night,
}

impl MapStyle {
    /// Picks the style for a given local clock time.
    #[must_use]
    pub fn for_time(time: NaiveTime) -> Self {
        if time.hour() >= NIGHT_CUTOFF_HOUR {
            Self::Night
        } else {
            Self::Day
        }
    }
}

/// Trait for rendering a map image centered on an incident.
#[async_trait]
pub trait MapRenderer: Send + Sync {
    /// Renders the map for the given coordinates, returning image bytes.
    ///
    /// # Errors
    ///
    /// Returns [`MapError`] if the fetch fails.
    async fn render(&self, longitude: f64, latitude: f64) -> Result<Vec<u8>, MapError>;
}

/// Mapbox-backed [`MapRenderer`].
pub struct MapboxRenderer {
    access_token: String,
    client: reqwest::Client,
}

impl MapboxRenderer {
    /// Creates a renderer with the given Mapbox access token.
    #[must_use]
    pub fn new(access_token: String) -> Self {
        Self {
            access_token,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl MapRenderer for MapboxRenderer {
    async fn render(&self, longitude: f64, latitude: f64) -> Result<Vec<u8>, MapError> {
        let style = MapStyle::for_time(Local::now().time());
        let url = static_image_url(longitude, latitude, style, &self.access_token);
        log::debug!("Rendering {style} map for ({longitude}, {latitude})");

        let response = self.client.get(&url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}

/// Builds the Static Images request URL.
#[must_use]
pub fn static_image_url(longitude: f64, latitude: f64, style: MapStyle, token: &str) -> String {
    format!(
        "{MAPBOX_BASE_URL}{style}/static/{MARKER}({longitude},{latitude})/\
         {longitude},{latitude},{ZOOM},{BEARING},{PITCH}/{SIZE}?access_token={token}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_style_before_cutoff() {
        let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap();
        assert_eq!(MapStyle::for_time(noon), MapStyle::Day);
    }

    #[test]
    fn night_style_at_and_after_cutoff() {
        let seven_pm = NaiveTime::from_hms_opt(19, 0, 0).unwrap();
        let late = NaiveTime::from_hms_opt(23, 30, 0).unwrap();
        assert_eq!(MapStyle::for_time(seven_pm), MapStyle::Night);
        assert_eq!(MapStyle::for_time(late), MapStyle::Night);
    }

    #[test]
    fn early_morning_is_day_style() {
        // The cutoff is a clock heuristic, not sunset: 1 AM renders day.
        let one_am = NaiveTime::from_hms_opt(1, 0, 0).unwrap();
        assert_eq!(MapStyle::for_time(one_am), MapStyle::Day);
    }

    #[test]
    fn builds_static_image_url() {
        let url = static_image_url(-117.242_060, 32.940_853, MapStyle::Day, "tok123");
        assert_eq!(
            url,
            "https://api.mapbox.com/styles/v1/mapbox/traffic-day-v2/static/\
             pin-s+ff4242(-117.24206,32.940853)/-117.24206,32.940853,16,0,60/\
             500x500@2x?access_token=tok123"
        );
    }

    #[test]
    fn night_url_uses_night_style() {
        let url = static_image_url(-117.0, 32.0, MapStyle::Night, "tok");
        assert!(url.contains("/traffic-night-v2/"));
    }
}
