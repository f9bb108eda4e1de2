#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Traffic incident data source trait and implementations.
//!
//! A source knows how to fetch one candidate incident per poll and normalize
//! it into an [`Incident`] at the boundary. "Nothing to report" is a
//! legitimate result (`Ok(None)`), distinct from a fetch failure.
//!
//! There is deliberately no retry layer here: the monitor's fixed inter-cycle
//! delay is the retry mechanism, so fetches fail fast to the cycle boundary.

pub mod chp;

use async_trait::async_trait;
use traffic_watch_incident_models::Incident;

/// Errors that can occur while fetching from a data source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The page structure did not match what the scraper expects.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of what went wrong.
        message: String,
    },
}

/// Trait for fetching the current candidate incident from a source of truth.
#[async_trait]
pub trait IncidentSource: Send + Sync {
    /// Returns a unique identifier for this source (e.g. `"chp_bccc"`).
    fn id(&self) -> String;

    /// Fetches the current candidate incident.
    ///
    /// `Ok(None)` means the source has nothing to report right now (e.g. a
    /// placeholder row) — a no-op cycle, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the HTTP request or page parsing fails.
    async fn fetch(&self) -> Result<Option<Incident>, SourceError>;
}
