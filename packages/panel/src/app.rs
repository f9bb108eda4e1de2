//! Panel display state.
//!
//! A pure-display struct: it holds the latest statistics snapshot (re-read
//! from the persisted store on a timer) and the monitor's coarse status. It
//! never sees the monitor's in-memory dedup state.

use std::path::PathBuf;

use traffic_watch_analytics::read_snapshot;
use traffic_watch_analytics_models::AnalyticsSnapshot;
use traffic_watch_monitor::{BotState, MonitorStatus};
use traffic_watch_store::StoreError;

/// Everything the panel draws, refreshed on a timer and by status updates.
pub struct PanelApp {
    /// Path of the persisted incident log this panel watches.
    store_path: PathBuf,
    /// Latest statistics snapshot.
    pub snapshot: AnalyticsSnapshot,
    /// Latest monitor status.
    pub status: MonitorStatus,
}

impl PanelApp {
    #[must_use]
    pub fn new(store_path: PathBuf) -> Self {
        Self {
            store_path,
            snapshot: AnalyticsSnapshot::default(),
            status: MonitorStatus::default(),
        }
    }

    /// Re-reads the statistics from the persisted store.
    ///
    /// Tolerant by contract: a missing or mid-rewrite file reads as "no data
    /// yet".
    pub fn refresh(&mut self) {
        self.snapshot = read_snapshot(&self.store_path);
    }

    /// Applies a status update from the monitor.
    pub fn set_status(&mut self, status: MonitorStatus) {
        self.status = status;
    }

    /// Empties the store and resets all displayed statistics immediately.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the file replacement fails; the displayed
    /// statistics are left untouched in that case.
    pub fn clear(&mut self) -> Result<(), StoreError> {
        traffic_watch_store::truncate(&self.store_path)?;
        self.snapshot = AnalyticsSnapshot::default();
        Ok(())
    }

    /// Whether the monitor is currently polling.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        matches!(self.status.state, BotState::Started)
    }

    /// The per-hour counts as a display line, e.g. `"8: 1, 9: 2"`.
    #[must_use]
    pub fn per_hour_line(&self) -> String {
        if self.snapshot.per_hour.is_empty() {
            return "None".to_string();
        }
        self.snapshot
            .per_hour
            .iter()
            .map(|(hour, count)| format!("{hour}: {count}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
