#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Reverse geocoding for incident coordinates.
//!
//! Wraps the Nominatim `/reverse` endpoint to turn a lat/lng pair into the
//! neighbourhood and city strings shown in published alerts. Geocoding is
//! strictly best-effort enrichment: a miss yields `None` fields, never a
//! failed incident.

pub mod nominatim;

use thiserror::Error;

/// Errors that can occur during geocoding operations.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider rejected the request for rate limiting.
    #[error("Rate limited by geocoding provider")]
    RateLimited,

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of what went wrong.
        message: String,
    },
}

/// The locality half of a reverse geocoding result.
///
/// Either field may be absent — Nominatim only reports the address components
/// it actually knows for the spot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Locality {
    /// Neighbourhood name, when known.
    pub neighborhood: Option<String>,
    /// City name, when known.
    pub city: Option<String>,
}
