#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! The incident record and its two derived signals: identity and time.
//!
//! The CHP incident page has no stable record identifiers, so everything
//! downstream (deduplication, statistics) works off this loosely-typed record
//! whose serde field names match the source's own column headers. The
//! persisted log is a plain JSON array of these records with absent fields
//! omitted.

pub mod identity;
pub mod time;

use serde::{Deserialize, Serialize};

pub use identity::Identity;
pub use time::{IncidentTime, UnparseableTime, parse_incident_time};

/// One reported traffic incident, as observed in a single poll of the source.
///
/// Every field is optional — the source routinely omits columns, and the
/// coordinate/detail half of the record only exists when the postback for the
/// selected row succeeds. Records are read-only after creation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Incident {
    /// Source-provided incident number. The authoritative dedup signal when
    /// present.
    #[serde(rename = "No.", default, skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,

    /// Raw timestamp string in one of the source formats
    /// (`YYYY-MM-DD HH:MM:SS` or `H:MM AM/PM`). Kept verbatim; parse with
    /// [`parse_incident_time`].
    #[serde(rename = "Time", default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,

    /// Report type, e.g. "Trfc Collision-No Inj".
    #[serde(rename = "Type", default, skip_serializing_if = "Option::is_none")]
    pub report_type: Option<String>,

    /// Free-text location from the incident table.
    #[serde(
        rename = "Location",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub location: Option<String>,

    /// Ordered detail lines scraped from the incident's expanded row, with
    /// unit-status noise already filtered out.
    #[serde(rename = "Details", default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,

    /// Latitude (WGS84). Only set when the source reported it with 6-decimal
    /// precision.
    #[serde(
        rename = "Latitude",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub latitude: Option<f64>,

    /// Longitude (WGS84). Only set when the source reported it with 6-decimal
    /// precision.
    #[serde(
        rename = "Longitude",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub longitude: Option<f64>,

    /// Neighborhood derived via reverse geocoding, when available.
    #[serde(
        rename = "Neighborhood",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub neighborhood: Option<String>,

    /// City derived via reverse geocoding, when available.
    #[serde(rename = "City", default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

impl Incident {
    /// Whether this record carries enough information to be identified.
    ///
    /// A record with no incident number, no location, and no timestamp cannot
    /// be meaningfully deduplicated and must be rejected before it reaches
    /// the store.
    #[must_use]
    pub fn is_identifiable(&self) -> bool {
        let has = |field: &Option<String>| field.as_deref().is_some_and(|s| !s.is_empty());
        has(&self.number) || has(&self.location) || has(&self.time)
    }

    /// Both coordinates, when the source provided them.
    #[must_use]
    pub const fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.longitude, self.latitude) {
            (Some(lon), Some(lat)) => Some((lon, lat)),
            _ => None,
        }
    }
}
