#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Derived statistics types shared by the aggregator, the status panel, and
//! the CLI.

use std::collections::BTreeMap;

use serde::Serialize;

/// Running statistics derived from the full incident log.
///
/// Never persisted — always recomputed from the store contents, so two
/// snapshots of the same store are always identical.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSnapshot {
    /// Total number of recorded incidents.
    pub total_incidents: usize,
    /// Incident count per hour of day (0–23). Hours with no incidents are
    /// absent.
    pub per_hour: BTreeMap<u32, u64>,
    /// Incident count per location string.
    pub location_counts: BTreeMap<String, u64>,
    /// Raw timestamp string of the most recent incident with a parseable
    /// time, or `None` when the log is empty or nothing parsed.
    pub last_incident_time: Option<String>,
}

impl AnalyticsSnapshot {
    /// The location with the highest incident count.
    ///
    /// Ties resolve to the lexically smallest location so the answer is
    /// stable across refreshes.
    #[must_use]
    pub fn most_frequent_location(&self) -> Option<&str> {
        let mut best: Option<(&str, u64)> = None;
        for (location, &count) in &self.location_counts {
            if best.is_none_or(|(_, best_count)| count > best_count) {
                best = Some((location, count));
            }
        }
        best.map(|(location, _)| location)
    }
}
