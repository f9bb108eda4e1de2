#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! The monitor loop: fetch → identify → dedupe → enrich → publish → persist.
//!
//! One sequential pipeline runs to completion before the next cycle's fetch
//! begins — overlapping cycles could publish the same incident twice before
//! either finishes updating the dedup sets, so there is exactly one logical
//! task here. Every collaborator failure is caught at the cycle boundary and
//! degrades to "try again next cycle"; the loop itself never terminates on an
//! error. The fixed inter-cycle delay is the only retry mechanism.
//!
//! Control and status both travel over `tokio::sync::watch` channels: the
//! display side never touches the monitor's in-memory dedup state, it only
//! sees coarse [`MonitorStatus`] snapshots and the persisted store.

pub mod config;

use std::time::Duration;

use strum_macros::Display;
use tokio::sync::watch;
use traffic_watch_ai::{AiError, Summarizer};
use traffic_watch_incident_models::{Identity, Incident};
use traffic_watch_map::{MapError, MapRenderer};
use traffic_watch_publish::{Notifier, PublishError};
use traffic_watch_source::{IncidentSource, SourceError};
use traffic_watch_store::{IncidentLog, StoreError};

/// Delay between cycles, applied regardless of cycle outcome.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// A failure somewhere in one cycle of the pipeline.
///
/// All variants are cycle-local: logged, surfaced as a [`CycleOutcome`], and
/// never allowed to take the loop down.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// Fetching from the data source failed.
    #[error("fetch failed: {0}")]
    Fetch(#[from] SourceError),

    /// Map rendering failed.
    #[error("map rendering failed: {0}")]
    MapRender(#[from] MapError),

    /// Summary generation failed.
    #[error("summary generation failed: {0}")]
    Summarize(#[from] AiError),

    /// Publishing to the destination channel failed.
    #[error("publish failed: {0}")]
    Publish(#[from] PublishError),

    /// Persisting the store failed.
    #[error("persistence failed: {0}")]
    Persist(#[from] StoreError),
}

/// What one cycle of the loop did.
#[derive(Debug)]
pub enum CycleOutcome {
    /// The source had nothing to report (placeholder row, no coordinates).
    NoData,
    /// The fetched record carried no identifying fields and was rejected.
    Rejected,
    /// The incident number is already in the store.
    DuplicateNumber,
    /// The synthesized identity has already been published.
    DuplicateIdentity,
    /// A new incident was published (and appended, best-effort).
    Published,
    /// A collaborator failed; nothing was published this cycle.
    Failed(MonitorError),
}

/// Coarse bot state surfaced to the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum BotState {
    /// The loop is polling.
    #[strum(serialize = "bot started")]
    Started,
    /// The loop is paused or has shut down.
    #[strum(serialize = "bot stopped")]
    Stopped,
}

/// Control signal for the loop, checked between cycles — an in-flight cycle
/// always finishes before the signal takes effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Control {
    /// Keep polling.
    #[default]
    Run,
    /// Stop polling but stay alive, waiting to be resumed.
    Pause,
    /// Finish the in-flight cycle and exit.
    Shutdown,
}

/// Read-only status snapshot broadcast to the display after every cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorStatus {
    /// Coarse running state.
    pub state: BotState,
    /// Cycles completed this process lifetime.
    pub cycles: u64,
    /// Incidents published this process lifetime.
    pub published: u64,
    /// The most recently published summary text.
    pub last_published: Option<String>,
    /// Generic text for the most recent cycle failure, if any.
    pub last_error: Option<String>,
}

impl Default for MonitorStatus {
    fn default() -> Self {
        Self {
            state: BotState::Stopped,
            cycles: 0,
            published: 0,
            last_published: None,
            last_error: None,
        }
    }
}

/// The monitor loop and the state it exclusively owns.
pub struct Monitor<S, M, A, N> {
    source: S,
    map: M,
    summarizer: A,
    notifier: N,
    log: IncidentLog,
    poll_interval: Duration,
    status: MonitorStatus,
    status_tx: watch::Sender<MonitorStatus>,
}

impl<S, M, A, N> Monitor<S, M, A, N>
where
    S: IncidentSource,
    M: MapRenderer,
    A: Summarizer,
    N: Notifier,
{
    /// Creates a monitor over the given collaborators and store.
    ///
    /// Returns the monitor plus the status receiver for the display side.
    pub fn new(
        source: S,
        map: M,
        summarizer: A,
        notifier: N,
        log: IncidentLog,
        poll_interval: Duration,
    ) -> (Self, watch::Receiver<MonitorStatus>) {
        let (status_tx, status_rx) = watch::channel(MonitorStatus::default());
        (
            Self {
                source,
                map,
                summarizer,
                notifier,
                log,
                poll_interval,
                status: MonitorStatus::default(),
                status_tx,
            },
            status_rx,
        )
    }

    /// Runs the loop until `control` says [`Control::Shutdown`] (or its
    /// sender is dropped).
    ///
    /// The signal is consulted between cycles only; an in-flight publish is
    /// allowed to finish and the next cycle's fetch is what actually halts.
    pub async fn run(mut self, mut control: watch::Receiver<Control>) {
        log::info!(
            "Monitor started for {} (poll interval {:?})",
            self.source.id(),
            self.poll_interval
        );

        loop {
            // Copy the signal out so no borrow is held across the awaits.
            let signal = *control.borrow();
            match signal {
                Control::Shutdown => break,
                Control::Pause => {
                    self.set_state(BotState::Stopped);
                    if control.changed().await.is_err() {
                        break;
                    }
                    continue;
                }
                Control::Run => {}
            }

            self.set_state(BotState::Started);
            let outcome = self.cycle().await;
            self.note_outcome(&outcome);

            // Fixed delay regardless of outcome — even after an error, so a
            // failing source is never hammered in a tight loop. Control
            // changes cut the wait short; they are still only acted on at
            // the top of the loop.
            tokio::select! {
                () = tokio::time::sleep(self.poll_interval) => {}
                changed = control.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        self.set_state(BotState::Stopped);
        log::info!("Monitor stopped");
    }

    /// Runs one cycle of the pipeline.
    ///
    /// Infallible by design: every collaborator error is caught here, logged
    /// with its stage, and folded into the returned [`CycleOutcome`].
    pub async fn cycle(&mut self) -> CycleOutcome {
        let fetched = match self.source.fetch().await {
            Ok(fetched) => fetched,
            Err(e) => {
                log::error!("Fetch failed: {e}");
                return CycleOutcome::Failed(e.into());
            }
        };

        let Some(incident) = fetched else {
            log::debug!("Nothing to report this cycle");
            return CycleOutcome::NoData;
        };

        if !incident.is_identifiable() {
            log::warn!("Rejecting record with no number, location, or timestamp");
            return CycleOutcome::Rejected;
        }

        let identity = Identity::of(&incident);

        if let Some(number) = incident.number.as_deref()
            && !number.is_empty()
            && self.log.contains_number(number)
        {
            log::debug!("Duplicate incident number {number}, skipping");
            return CycleOutcome::DuplicateNumber;
        }

        if self.log.contains_identity(&identity) {
            log::debug!("Duplicate identity {identity}, skipping");
            return CycleOutcome::DuplicateIdentity;
        }

        log::info!("New incident {identity}, preparing to publish");

        // Map rendering is best-effort: a missing image degrades the alert,
        // it does not suppress it.
        let image = match incident.coordinates() {
            Some((longitude, latitude)) => {
                match self.map.render(longitude, latitude).await {
                    Ok(bytes) => Some(bytes),
                    Err(e) => {
                        log::warn!("Map rendering failed, publishing without image: {e}");
                        None
                    }
                }
            }
            None => None,
        };

        let summary = match self.summarizer.summarize(&incident).await {
            Ok(summary) => summary,
            Err(e) => {
                log::error!("Summary generation failed: {e}");
                return CycleOutcome::Failed(e.into());
            }
        };

        if let Err(e) = self.notifier.publish(&summary, image).await {
            log::error!("Publish failed: {e}");
            return CycleOutcome::Failed(e.into());
        }

        self.status.last_published = Some(summary);

        // The alert is out; a failed disk write must not resurface the
        // incident as "new" next cycle, so the in-memory sets are updated
        // either way and the write failure is only logged.
        if let Err(e) = self.log.append(incident) {
            log::error!("Persistence failed (record already published): {e}");
        }

        CycleOutcome::Published
    }

    /// The number of records currently in the store.
    #[must_use]
    pub fn stored(&self) -> usize {
        self.log.len()
    }

    fn note_outcome(&mut self, outcome: &CycleOutcome) {
        self.status.cycles += 1;
        match outcome {
            CycleOutcome::Published => {
                self.status.published += 1;
                self.status.last_error = None;
            }
            CycleOutcome::Failed(e) => {
                self.status.last_error = Some(e.to_string());
            }
            CycleOutcome::NoData
            | CycleOutcome::Rejected
            | CycleOutcome::DuplicateNumber
            | CycleOutcome::DuplicateIdentity => {
                self.status.last_error = None;
            }
        }
        self.status_tx.send_replace(self.status.clone());
    }

    fn set_state(&mut self, state: BotState) {
        if self.status.state != state {
            self.status.state = state;
            log::info!("{state}");
            self.status_tx.send_replace(self.status.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use super::*;

    struct StubSource {
        responses: Mutex<VecDeque<Result<Option<Incident>, SourceError>>>,
    }

    impl StubSource {
        fn new(responses: Vec<Result<Option<Incident>, SourceError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
            }
        }
    }

    #[async_trait]
    impl IncidentSource for StubSource {
        fn id(&self) -> String {
            "stub".to_string()
        }

        async fn fetch(&self) -> Result<Option<Incident>, SourceError> {
            self.responses
                .lock()
                .await
                .pop_front()
                .unwrap_or(Ok(None))
        }
    }

    #[derive(Clone)]
    struct StubMap {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl MapRenderer for StubMap {
        async fn render(&self, _longitude: f64, _latitude: f64) -> Result<Vec<u8>, MapError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                // A reqwest error is awkward to fabricate; route the failure
                // through a real failing connect instead.
                match reqwest::get("http://127.0.0.1:1/unreachable").await {
                    Ok(_) => unreachable!("connect to a closed port succeeded"),
                    Err(e) => Err(MapError::Http(e)),
                }
            } else {
                Ok(vec![0xFF, 0xD8])
            }
        }
    }

    #[derive(Clone)]
    struct StubSummarizer {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl Summarizer for StubSummarizer {
        async fn summarize(&self, _incident: &Incident) -> Result<String, AiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(AiError::Provider {
                    message: "stub failure".to_string(),
                })
            } else {
                Ok("🚗 stub summary".to_string())
            }
        }
    }

    #[derive(Clone)]
    struct StubNotifier {
        calls: Arc<AtomicUsize>,
        with_image: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Notifier for StubNotifier {
        async fn publish(&self, _text: &str, image: Option<Vec<u8>>) -> Result<(), PublishError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if image.is_some() {
                self.with_image.fetch_add(1, Ordering::SeqCst);
            }
            Ok(())
        }
    }

    struct Fixture {
        map_calls: Arc<AtomicUsize>,
        summarize_calls: Arc<AtomicUsize>,
        publish_calls: Arc<AtomicUsize>,
        publish_with_image: Arc<AtomicUsize>,
    }

    fn monitor(
        responses: Vec<Result<Option<Incident>, SourceError>>,
        log: IncidentLog,
        map_fail: bool,
        summarize_fail: bool,
    ) -> (
        Monitor<StubSource, StubMap, StubSummarizer, StubNotifier>,
        watch::Receiver<MonitorStatus>,
        Fixture,
    ) {
        let fixture = Fixture {
            map_calls: Arc::new(AtomicUsize::new(0)),
            summarize_calls: Arc::new(AtomicUsize::new(0)),
            publish_calls: Arc::new(AtomicUsize::new(0)),
            publish_with_image: Arc::new(AtomicUsize::new(0)),
        };
        let (monitor, status_rx) = Monitor::new(
            StubSource::new(responses),
            StubMap {
                calls: Arc::clone(&fixture.map_calls),
                fail: map_fail,
            },
            StubSummarizer {
                calls: Arc::clone(&fixture.summarize_calls),
                fail: summarize_fail,
            },
            StubNotifier {
                calls: Arc::clone(&fixture.publish_calls),
                with_image: Arc::clone(&fixture.publish_with_image),
            },
            log,
            Duration::from_millis(1),
        );
        (monitor, status_rx, fixture)
    }

    fn incident(number: Option<&str>, time: &str, location: &str) -> Incident {
        Incident {
            number: number.map(String::from),
            time: Some(time.to_string()),
            location: Some(location.to_string()),
            latitude: Some(32.940_853),
            longitude: Some(-117.242_060),
            ..Incident::default()
        }
    }

    fn empty_log() -> (IncidentLog, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let log = IncidentLog::load(dir.path().join("log.json")).unwrap();
        (log, dir)
    }

    #[tokio::test]
    async fn publishes_a_new_incident_once() {
        let (log, _dir) = empty_log();
        let fresh = incident(Some("1"), "8:45 PM", "Main St");
        let (mut monitor, _status, fixture) = monitor(
            vec![Ok(Some(fresh.clone())), Ok(Some(fresh))],
            log,
            false,
            false,
        );

        assert!(matches!(monitor.cycle().await, CycleOutcome::Published));
        assert!(matches!(
            monitor.cycle().await,
            CycleOutcome::DuplicateNumber
        ));

        assert_eq!(fixture.publish_calls.load(Ordering::SeqCst), 1);
        assert_eq!(monitor.stored(), 1);
    }

    #[tokio::test]
    async fn known_number_skips_enrichment_entirely() {
        let (mut log, _dir) = empty_log();
        log.append(incident(Some("1"), "8:00 PM", "Main St")).unwrap();

        let (mut monitor, _status, fixture) = monitor(
            vec![Ok(Some(incident(Some("1"), "8:45 PM", "Main St")))],
            log,
            false,
            false,
        );

        assert!(matches!(
            monitor.cycle().await,
            CycleOutcome::DuplicateNumber
        ));
        assert_eq!(fixture.map_calls.load(Ordering::SeqCst), 0);
        assert_eq!(fixture.summarize_calls.load(Ordering::SeqCst), 0);
        assert_eq!(fixture.publish_calls.load(Ordering::SeqCst), 0);
        assert_eq!(monitor.stored(), 1);
    }

    #[tokio::test]
    async fn numberless_incident_dedupes_by_identity() {
        let (log, _dir) = empty_log();
        let numberless = incident(None, "8:45 PM", "I5 N / Carmel Valley Rd");
        let (mut monitor, _status, fixture) = monitor(
            vec![Ok(Some(numberless.clone())), Ok(Some(numberless))],
            log,
            false,
            false,
        );

        assert!(matches!(monitor.cycle().await, CycleOutcome::Published));
        assert!(matches!(
            monitor.cycle().await,
            CycleOutcome::DuplicateIdentity
        ));
        assert_eq!(fixture.publish_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fetch_error_recovers_on_the_next_cycle() {
        let (log, _dir) = empty_log();
        let (mut monitor, _status, fixture) = monitor(
            vec![
                Err(SourceError::Parse {
                    message: "transient".to_string(),
                }),
                Ok(Some(incident(Some("2"), "9:00 PM", "SR-99"))),
            ],
            log,
            false,
            false,
        );

        assert!(matches!(
            monitor.cycle().await,
            CycleOutcome::Failed(MonitorError::Fetch(_))
        ));
        assert!(matches!(monitor.cycle().await, CycleOutcome::Published));
        assert_eq!(fixture.publish_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn no_data_is_a_noop_cycle() {
        let (log, _dir) = empty_log();
        let (mut monitor, _status, fixture) = monitor(vec![Ok(None)], log, false, false);

        assert!(matches!(monitor.cycle().await, CycleOutcome::NoData));
        assert_eq!(fixture.publish_calls.load(Ordering::SeqCst), 0);
        assert_eq!(monitor.stored(), 0);
    }

    #[tokio::test]
    async fn unidentifiable_record_is_rejected() {
        let (log, _dir) = empty_log();
        let (mut monitor, _status, fixture) =
            monitor(vec![Ok(Some(Incident::default()))], log, false, false);

        assert!(matches!(monitor.cycle().await, CycleOutcome::Rejected));
        assert_eq!(fixture.summarize_calls.load(Ordering::SeqCst), 0);
        assert_eq!(monitor.stored(), 0);
    }

    #[tokio::test]
    async fn map_failure_degrades_to_text_only_publish() {
        let (log, _dir) = empty_log();
        let (mut monitor, _status, fixture) = monitor(
            vec![Ok(Some(incident(Some("3"), "8:45 PM", "Main St")))],
            log,
            true,
            false,
        );

        assert!(matches!(monitor.cycle().await, CycleOutcome::Published));
        assert_eq!(fixture.publish_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fixture.publish_with_image.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn summary_failure_fails_the_cycle_without_publishing() {
        let (log, _dir) = empty_log();
        let (mut monitor, _status, fixture) = monitor(
            vec![Ok(Some(incident(Some("4"), "8:45 PM", "Main St")))],
            log,
            false,
            true,
        );

        assert!(matches!(
            monitor.cycle().await,
            CycleOutcome::Failed(MonitorError::Summarize(_))
        ));
        assert_eq!(fixture.publish_calls.load(Ordering::SeqCst), 0);
        assert_eq!(monitor.stored(), 0);
    }

    #[tokio::test]
    async fn persistence_failure_still_counts_as_published() {
        let dir = tempfile::tempdir().unwrap();
        // Parent directory never exists, so every write fails.
        let log = IncidentLog::load(dir.path().join("missing_dir").join("log.json")).unwrap();

        let (mut monitor, _status, fixture) = monitor(
            vec![Ok(Some(incident(Some("5"), "8:45 PM", "Main St")))],
            log,
            false,
            false,
        );

        assert!(matches!(monitor.cycle().await, CycleOutcome::Published));
        assert_eq!(fixture.publish_calls.load(Ordering::SeqCst), 1);
        // The in-memory sets still advanced: the incident will not publish
        // again this process lifetime.
        assert_eq!(monitor.stored(), 1);
    }

    #[tokio::test]
    async fn status_reports_publishes_and_errors() {
        let (log, _dir) = empty_log();
        let (mut monitor, status, _fixture) = monitor(
            vec![
                Ok(Some(incident(Some("6"), "8:45 PM", "Main St"))),
                Err(SourceError::Parse {
                    message: "flaky".to_string(),
                }),
            ],
            log,
            false,
            false,
        );

        let outcome = monitor.cycle().await;
        monitor.note_outcome(&outcome);
        assert_eq!(status.borrow().published, 1);
        assert_eq!(
            status.borrow().last_published.as_deref(),
            Some("🚗 stub summary")
        );

        let outcome = monitor.cycle().await;
        monitor.note_outcome(&outcome);
        assert_eq!(status.borrow().cycles, 2);
        assert!(status.borrow().last_error.is_some());
    }

    #[tokio::test]
    async fn shutdown_signal_stops_the_loop() {
        let (log, _dir) = empty_log();
        let (monitor, status, _fixture) = monitor(vec![], log, false, false);

        let (control_tx, control_rx) = watch::channel(Control::Shutdown);
        tokio::time::timeout(Duration::from_secs(1), monitor.run(control_rx))
            .await
            .expect("run() should exit promptly on shutdown");
        drop(control_tx);

        assert_eq!(status.borrow().state, BotState::Stopped);
    }

    #[tokio::test]
    async fn run_processes_cycles_until_shutdown() {
        let (log, _dir) = empty_log();
        let (monitor, mut status, fixture) = monitor(
            vec![Ok(Some(incident(Some("7"), "8:45 PM", "Main St")))],
            log,
            false,
            false,
        );

        let (control_tx, control_rx) = watch::channel(Control::Run);
        let handle = tokio::spawn(monitor.run(control_rx));

        // Wait until the first publish shows up in the status stream.
        tokio::time::timeout(Duration::from_secs(1), async {
            loop {
                if status.borrow().published >= 1 {
                    break;
                }
                if status.changed().await.is_err() {
                    break;
                }
            }
        })
        .await
        .expect("first publish should be reported");

        control_tx.send_replace(Control::Shutdown);
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("run() should exit after shutdown")
            .unwrap();

        assert_eq!(fixture.publish_calls.load(Ordering::SeqCst), 1);
    }
}
