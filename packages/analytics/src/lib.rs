#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Statistics aggregation over the incident log.
//!
//! [`aggregate`] is a pure function over the full store contents — idempotent
//! and safe to re-run on every display refresh. [`read_snapshot`] wraps it
//! with the panel's read tolerance: the store file may be mid-rewrite or not
//! exist yet, and both simply mean "no data yet".

use std::path::Path;

use traffic_watch_analytics_models::AnalyticsSnapshot;
use traffic_watch_incident_models::{Incident, IncidentTime, parse_incident_time};

/// Computes the statistics snapshot for a sequence of incidents.
///
/// Records with an unparseable timestamp still contribute to the location
/// counts — only their time-dependent statistics are skipped. "Most recent"
/// is computed by comparing parsed times across the whole sequence, never by
/// taking the last element, since the store makes no ordering promise.
#[must_use]
pub fn aggregate(incidents: &[Incident]) -> AnalyticsSnapshot {
    let mut snapshot = AnalyticsSnapshot {
        total_incidents: incidents.len(),
        ..AnalyticsSnapshot::default()
    };

    let mut latest: Option<(IncidentTime, &str)> = None;

    for incident in incidents {
        if let Some(raw) = incident.time.as_deref() {
            match parse_incident_time(raw) {
                Ok(parsed) => {
                    *snapshot.per_hour.entry(parsed.hour()).or_insert(0) += 1;
                    if latest.is_none_or(|(best, _)| parsed > best) {
                        latest = Some((parsed, raw));
                    }
                }
                Err(e) => {
                    log::warn!("Skipping time-based stats for record: {e}");
                }
            }
        }

        if let Some(location) = incident.location.as_deref()
            && !location.is_empty()
        {
            *snapshot
                .location_counts
                .entry(location.to_owned())
                .or_insert(0) += 1;
        }
    }

    snapshot.last_incident_time = latest.map(|(_, raw)| raw.to_owned());
    snapshot
}

/// Reads and aggregates the persisted incident log for display.
///
/// A missing, partially written, or otherwise unreadable file yields the
/// empty snapshot — the display treats it as "no data yet", never an error.
#[must_use]
pub fn read_snapshot(path: &Path) -> AnalyticsSnapshot {
    let incidents: Vec<Incident> = match std::fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(incidents) => incidents,
            Err(e) => {
                log::debug!("Incident log at {} not readable yet: {e}", path.display());
                return AnalyticsSnapshot::default();
            }
        },
        Err(_) => return AnalyticsSnapshot::default(),
    };
    aggregate(&incidents)
}
