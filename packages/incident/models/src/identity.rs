//! Stable identity for incidents with no reliable identifier.
//!
//! The source's incident number is authoritative when present. Records that
//! lack one fall back to a composite of the raw timestamp and location —
//! fragile, but the only signals the page offers.

use std::fmt;

use crate::Incident;

/// Delimiter between the timestamp and location halves of a composite
/// identity.
const COMPOSITE_DELIMITER: char = '-';

/// The key used to decide whether two observations refer to the same
/// incident.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity(String);

impl Identity {
    /// Resolves the identity of an incident.
    ///
    /// Pure and total: a non-empty incident number is used verbatim,
    /// otherwise the timestamp and location are joined with
    /// [`COMPOSITE_DELIMITER`], with missing parts rendered as empty strings.
    /// A record missing all three fields collapses to the degenerate `"-"`
    /// identity — such records fail [`Incident::is_identifiable`] and are
    /// rejected before dedup ever sees them.
    #[must_use]
    pub fn of(incident: &Incident) -> Self {
        if let Some(number) = incident.number.as_deref()
            && !number.is_empty()
        {
            return Self(number.to_string());
        }
        let time = incident.time.as_deref().unwrap_or_default();
        let location = incident.location.as_deref().unwrap_or_default();
        Self(format!("{time}{COMPOSITE_DELIMITER}{location}"))
    }

    /// The identity as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Identity> for String {
    fn from(identity: Identity) -> Self {
        identity.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_incident_number() {
        let incident = Incident {
            number: Some("0117".to_string()),
            time: Some("8:45 PM".to_string()),
            location: Some("I5 N / Carmel Valley Rd".to_string()),
            ..Incident::default()
        };
        assert_eq!(Identity::of(&incident).as_str(), "0117");
    }

    #[test]
    fn falls_back_to_time_and_location() {
        let incident = Incident {
            time: Some("8:45 PM".to_string()),
            location: Some("I5 N / Carmel Valley Rd".to_string()),
            ..Incident::default()
        };
        assert_eq!(
            Identity::of(&incident).as_str(),
            "8:45 PM-I5 N / Carmel Valley Rd"
        );
    }

    #[test]
    fn empty_number_does_not_win() {
        let incident = Incident {
            number: Some(String::new()),
            time: Some("8:45 PM".to_string()),
            location: Some("Main St".to_string()),
            ..Incident::default()
        };
        assert_eq!(Identity::of(&incident).as_str(), "8:45 PM-Main St");
    }

    #[test]
    fn missing_parts_render_as_empty() {
        let incident = Incident {
            location: Some("Main St".to_string()),
            ..Incident::default()
        };
        assert_eq!(Identity::of(&incident).as_str(), "-Main St");
    }

    #[test]
    fn fully_empty_record_collapses_to_delimiter() {
        let identity = Identity::of(&Incident::default());
        assert_eq!(identity.as_str(), "-");
        // Always-equal degenerate identity; rejected upstream by
        // `Incident::is_identifiable`.
        assert_eq!(identity, Identity::of(&Incident::default()));
    }
}
