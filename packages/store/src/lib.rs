#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! The append-only log of published incidents.
//!
//! One flat JSON file holds every incident ever published, serialized as an
//! array of duck-typed field maps. The log is the historical record seeding
//! the statistics panel *and* the source of both deduplication signals:
//!
//! - the **incident-number set** — every non-empty `"No."` already seen,
//! - the **posted-identity set** — the [`Identity`] of every stored record.
//!
//! Both sets are rebuilt from disk on [`IncidentLog::load`] and maintained
//! incrementally on [`IncidentLog::append`], so the at-most-once publish
//! guarantee survives process restarts for numberless incidents too.
//!
//! Writes replace the whole file via a temp-file-and-rename so a crash
//! mid-write can never leave truncated JSON behind for the panel's reader.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use traffic_watch_incident_models::{Identity, Incident};

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O error (file read/write/rename).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The persisted log could not be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The deduplication store: full incident history plus both key sets.
#[derive(Debug)]
pub struct IncidentLog {
    path: PathBuf,
    incidents: Vec<Incident>,
    numbers: HashSet<String>,
    identities: HashSet<Identity>,
}

impl IncidentLog {
    /// Loads the full persisted history and rebuilds the key sets.
    ///
    /// A missing file is an empty history, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the file exists but cannot be read or
    /// parsed.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let incidents: Vec<Incident> = if path.exists() {
            serde_json::from_str(&std::fs::read_to_string(&path)?)?
        } else {
            Vec::new()
        };

        let mut log = Self {
            path,
            incidents: Vec::new(),
            numbers: HashSet::new(),
            identities: HashSet::new(),
        };
        for incident in incidents {
            log.index(&incident);
            log.incidents.push(incident);
        }
        log::debug!(
            "Loaded {} incident(s) from {}",
            log.incidents.len(),
            log.path.display()
        );
        Ok(log)
    }

    /// The full history, in append order.
    #[must_use]
    pub fn incidents(&self) -> &[Incident] {
        &self.incidents
    }

    /// Number of stored incidents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.incidents.len()
    }

    /// Whether the history is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.incidents.is_empty()
    }

    /// The file backing this log.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether this incident number has already been published.
    #[must_use]
    pub fn contains_number(&self, number: &str) -> bool {
        self.numbers.contains(number)
    }

    /// Whether this identity has already been published.
    #[must_use]
    pub fn contains_identity(&self, identity: &Identity) -> bool {
        self.identities.contains(identity)
    }

    /// Appends one record and persists the full sequence atomically.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if serialization or the file replacement
    /// fails. The in-memory state is updated either way — the caller treats
    /// the record as published regardless.
    pub fn append(&mut self, incident: Incident) -> Result<(), StoreError> {
        self.index(&incident);
        self.incidents.push(incident);
        self.persist()
    }

    /// Replaces the history with an empty sequence, on disk and in memory.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the file replacement fails.
    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.incidents.clear();
        self.numbers.clear();
        self.identities.clear();
        self.persist()
    }

    fn index(&mut self, incident: &Incident) {
        if let Some(number) = incident.number.as_deref()
            && !number.is_empty()
        {
            self.numbers.insert(number.to_owned());
        }
        self.identities.insert(Identity::of(incident));
    }

    fn persist(&self) -> Result<(), StoreError> {
        write_atomically(&self.path, &self.incidents)
    }
}

/// Truncates a log file to an empty history without loading it first.
///
/// Used by the panel's clear action and the CLI, which must be able to reset
/// a log even when its current contents are unreadable.
///
/// # Errors
///
/// Returns [`StoreError`] if the file replacement fails.
pub fn truncate(path: &Path) -> Result<(), StoreError> {
    write_atomically(path, &[])
}

/// Serializes the full sequence to `<path>.tmp`, then renames over `path`.
fn write_atomically(path: &Path, incidents: &[Incident]) -> Result<(), StoreError> {
    let tmp = tmp_path(path);
    std::fs::write(&tmp, serde_json::to_string_pretty(incidents)?)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut file_name = path.file_name().map_or_else(
        || std::ffi::OsString::from("incident_log"),
        std::borrow::ToOwned::to_owned,
    );
    file_name.push(".tmp");
    path.with_file_name(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn incident(number: Option<&str>, time: &str, location: &str) -> Incident {
        Incident {
            number: number.map(String::from),
            time: Some(time.to_string()),
            location: Some(location.to_string()),
            ..Incident::default()
        }
    }

    #[test]
    fn missing_file_loads_as_empty_history() {
        let dir = tempfile::tempdir().unwrap();
        let log = IncidentLog::load(dir.path().join("missing.json")).unwrap();
        assert!(log.is_empty());
    }

    #[test]
    fn append_then_reload_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.json");

        let mut log = IncidentLog::load(&path).unwrap();
        log.append(incident(Some("1"), "2024-05-01 08:00:00", "Main St"))
            .unwrap();
        log.append(incident(Some("2"), "2024-05-01 09:00:00", "Main St"))
            .unwrap();

        let reloaded = IncidentLog::load(&path).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert!(reloaded.contains_number("1"));
        assert!(reloaded.contains_number("2"));
        assert!(!reloaded.contains_number("3"));
    }

    #[test]
    fn identity_set_is_rebuilt_across_restarts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.json");

        let numberless = incident(None, "8:45 PM", "I5 N / Carmel Valley Rd");
        let mut log = IncidentLog::load(&path).unwrap();
        log.append(numberless.clone()).unwrap();

        // A fresh process must still recognize the composite identity.
        let reloaded = IncidentLog::load(&path).unwrap();
        assert!(reloaded.contains_identity(&Identity::of(&numberless)));
    }

    #[test]
    fn empty_numbers_are_not_indexed() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = IncidentLog::load(dir.path().join("log.json")).unwrap();
        log.append(incident(Some(""), "8:45 PM", "Main St")).unwrap();
        assert!(!log.contains_number(""));
    }

    #[test]
    fn clear_empties_disk_and_key_sets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.json");

        let mut log = IncidentLog::load(&path).unwrap();
        log.append(incident(Some("1"), "8:45 PM", "Main St")).unwrap();
        log.clear().unwrap();

        assert!(log.is_empty());
        assert!(!log.contains_number("1"));
        assert_eq!(std::fs::read_to_string(&path).unwrap().trim(), "[]");
    }

    #[test]
    fn persisted_layout_uses_source_field_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.json");

        let mut log = IncidentLog::load(&path).unwrap();
        log.append(incident(Some("1"), "2024-05-01 08:00:00", "Main St"))
            .unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw[0]["No."], "1");
        assert_eq!(raw[0]["Location"], "Main St");
    }

    #[test]
    fn writes_leave_no_temp_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.json");

        let mut log = IncidentLog::load(&path).unwrap();
        log.append(incident(Some("1"), "8:45 PM", "Main St")).unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("log.json")]);
    }

    #[test]
    fn truncate_works_without_loading() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.json");
        std::fs::write(&path, "{ not valid json").unwrap();

        truncate(&path).unwrap();
        let log = IncidentLog::load(&path).unwrap();
        assert!(log.is_empty());
    }
}
