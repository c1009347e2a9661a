//! The measurement session controller.
//!
//! Owns the whole life of a session: reads a settings snapshot, subscribes
//! the enabled providers with buffer-appending callbacks, runs the elapsed
//! ticker, and at stop unsubscribes everything before writing each stream to
//! its file. Nothing is written while a session is active.
//!
//! ```text
//!          start()                       stop()
//!  Idle ───────────▶ Active ─────────────────────────────────▶ Idle
//!                      │  unsubscribe GPS, acc, gyro
//!                      │  serialize + write every stream
//!                      └─ write config file (if general settings)
//! ```

use crate::sensor::{
    LocationError, LocationTracker, MotionReading, ProviderError, SampleCallback, SampleRecord,
    SensorKind, SensorProvider, SubscriptionHandle,
};
use crate::session::buffer::{LeadingZeroPolicy, SharedBuffer, StreamBuffer};
use crate::session::clock::{Clock, SystemClock};
use crate::session::config::SessionConfig;
use crate::session::id::SessionId;
use crate::session::log::{create_shared_log, SharedRecordingLog};
use crate::session::ticker::{ElapsedTicker, TICK_PERIOD};
use crate::settings::SettingsStore;
use crate::storage::{FileStore, SessionLayout, StorageError, FILES_DIR};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Lifecycle state of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Active,
}

/// GPS condition during the current session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationStatus {
    /// GPS is not among the enabled sensors.
    Disabled,
    Tracking,
    /// The user refused location access; the session runs without GPS.
    PermissionDenied,
    /// The location provider could not be subscribed.
    Unavailable(String),
}

impl LocationStatus {
    /// True when GPS was wanted but is not being recorded.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            LocationStatus::PermissionDenied | LocationStatus::Unavailable(_)
        )
    }
}

/// Rejected state transitions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("a measurement session is already active")]
    AlreadyActive,
    #[error("no measurement session is active")]
    NotActive,
    /// The clock still reads the second of an earlier session; starting
    /// would reuse its folder and overwrite its files.
    #[error("session {0} already exists; try again in a moment")]
    IdInUse(SessionId),
}

/// Something that went wrong during start without preventing the session.
#[derive(Debug, thiserror::Error)]
pub enum StartIssue {
    #[error("{kind} could not be subscribed: {error}")]
    Sensor {
        kind: SensorKind,
        #[source]
        error: ProviderError,
    },
    #[error("GPS not recording: {0}")]
    Location(#[source] LocationError),
    #[error("output directory not created: {0}")]
    Storage(#[source] StorageError),
}

/// Outcome of a successful [`SessionController::start`].
#[derive(Debug)]
pub struct StartReport {
    pub session_id: SessionId,
    /// Session folder, relative to the file store root.
    pub directory: PathBuf,
    pub config: SessionConfig,
    pub location: LocationStatus,
    pub issues: Vec<StartIssue>,
}

/// Outcome of [`SessionController::stop`]. Write failures do not make stop fail.
#[derive(Debug)]
pub struct StopReport {
    pub session_id: SessionId,
    pub directory: PathBuf,
    /// Files written successfully, relative to the file store root.
    pub written: Vec<PathBuf>,
    pub failures: Vec<StorageError>,
    /// Records flushed per stream.
    pub samples: BTreeMap<SensorKind, usize>,
    pub elapsed: Duration,
}

impl StopReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Tunables that are not part of the user settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecorderOptions {
    pub leading_zero: LeadingZeroPolicy,
    pub tick_period: Duration,
}

impl Default for RecorderOptions {
    fn default() -> Self {
        Self {
            leading_zero: LeadingZeroPolicy::DiscardLeading,
            tick_period: TICK_PERIOD,
        }
    }
}

/// The three sensor sources a controller drives.
pub struct Providers {
    pub accelerometer: Box<dyn SensorProvider<MotionReading>>,
    pub gyroscope: Box<dyn SensorProvider<MotionReading>>,
    pub location: LocationTracker,
}

impl Providers {
    fn motion(&mut self, kind: SensorKind) -> Option<&mut Box<dyn SensorProvider<MotionReading>>> {
        match kind {
            SensorKind::Accelerometer => Some(&mut self.accelerometer),
            SensorKind::Gyro => Some(&mut self.gyroscope),
            SensorKind::Gps => None,
        }
    }
}

/// Config file contents: the snapshot plus the session it belongs to.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConfigArtifact<'a> {
    session_id: &'a SessionId,
    started_at: NaiveDateTime,
    #[serde(flatten)]
    config: &'a SessionConfig,
}

struct ActiveSession {
    layout: SessionLayout,
    started_at: NaiveDateTime,
    config: SessionConfig,
    streams: BTreeMap<SensorKind, SharedBuffer>,
    motion_subscriptions: Vec<(SensorKind, SubscriptionHandle)>,
    location: LocationStatus,
}

/// Single-session measurement controller.
pub struct SessionController {
    settings: Arc<dyn SettingsStore>,
    files: Arc<dyn FileStore>,
    providers: Providers,
    clock: Arc<dyn Clock>,
    options: RecorderOptions,
    log: SharedRecordingLog,
    ticker: ElapsedTicker,
    active: Option<ActiveSession>,
    last_session: Option<SessionId>,
}

impl SessionController {
    pub fn new(
        settings: Arc<dyn SettingsStore>,
        files: Arc<dyn FileStore>,
        providers: Providers,
    ) -> Self {
        let options = RecorderOptions::default();
        Self {
            settings,
            files,
            providers,
            clock: Arc::new(SystemClock),
            options,
            log: create_shared_log(),
            ticker: ElapsedTicker::new(options.tick_period),
            active: None,
            last_session: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_options(mut self, options: RecorderOptions) -> Self {
        self.options = options;
        self.ticker = ElapsedTicker::new(options.tick_period);
        self
    }

    pub fn with_log(mut self, log: SharedRecordingLog) -> Self {
        self.log = log;
        self
    }

    pub fn log(&self) -> &SharedRecordingLog {
        &self.log
    }

    pub fn state(&self) -> SessionState {
        if self.active.is_some() {
            SessionState::Active
        } else {
            SessionState::Idle
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        self.active.as_ref().map(|s| s.layout.id())
    }

    pub fn config(&self) -> Option<&SessionConfig> {
        self.active.as_ref().map(|s| &s.config)
    }

    /// GPS condition of the active session.
    pub fn location_status(&self) -> Option<&LocationStatus> {
        self.active.as_ref().map(|s| &s.location)
    }

    /// Elapsed time of the active session; zero while idle.
    pub fn current_elapsed(&self) -> Duration {
        self.ticker.elapsed()
    }

    /// Records buffered so far, per enabled stream.
    pub fn sample_counts(&self) -> BTreeMap<SensorKind, usize> {
        self.active
            .as_ref()
            .map(|s| s.streams.iter().map(|(k, b)| (*k, b.len())).collect())
            .unwrap_or_default()
    }

    /// Begin a session.
    ///
    /// Sensors that cannot be subscribed, a refused location permission and
    /// a failed directory creation are reported in [`StartReport::issues`];
    /// the session becomes active regardless.
    pub async fn start(&mut self) -> Result<StartReport, SessionError> {
        if self.active.is_some() {
            warn!("Ignoring start: a session is already active");
            return Err(SessionError::AlreadyActive);
        }

        let config = SessionConfig::load(self.settings.as_ref()).await;
        let started_at = self.clock.now();
        let id = SessionId::from_datetime(&started_at);
        if self.id_taken(&id).await {
            warn!(session = %id, "Refusing start: session id already used");
            return Err(SessionError::IdInUse(id));
        }
        let layout = SessionLayout::new(id);
        let mut issues = Vec::new();
        let mut streams = BTreeMap::new();
        let mut motion_subscriptions = Vec::new();

        for kind in [SensorKind::Accelerometer, SensorKind::Gyro] {
            if !config.is_enabled(kind) {
                continue;
            }
            let buffer = SharedBuffer::new(StreamBuffer::new(kind, self.options.leading_zero));
            let interval = config.interval(kind);
            let callback = motion_callback(buffer.clone(), Arc::clone(&self.clock));

            let Some(provider) = self.providers.motion(kind) else {
                continue;
            };
            match provider.subscribe(interval, callback) {
                Ok(handle) => {
                    debug!(sensor = %kind, ?interval, "Subscribed");
                    motion_subscriptions.push((kind, handle));
                }
                Err(error) => {
                    warn!(sensor = %kind, "Subscription failed: {error}");
                    issues.push(StartIssue::Sensor { kind, error });
                }
            }
            streams.insert(kind, buffer);
        }

        let location = if config.is_enabled(SensorKind::Gps) {
            let buffer =
                SharedBuffer::new(StreamBuffer::new(SensorKind::Gps, LeadingZeroPolicy::Keep));
            streams.insert(SensorKind::Gps, buffer.clone());
            let clock = Arc::clone(&self.clock);

            let started = self
                .providers
                .location
                .start(config.gps_interval, move |sample| {
                    buffer.append(SampleRecord::location(sample, clock.now()));
                })
                .await;
            match started {
                Ok(()) => LocationStatus::Tracking,
                Err(error) => {
                    let status = match &error {
                        LocationError::PermissionDenied(_) => {
                            self.log.record_permission_denied();
                            LocationStatus::PermissionDenied
                        }
                        other => LocationStatus::Unavailable(other.to_string()),
                    };
                    warn!("GPS degraded for this session: {error}");
                    issues.push(StartIssue::Location(error));
                    status
                }
            }
        } else {
            LocationStatus::Disabled
        };

        let directory = layout.directory();
        if let Err(e) = self.files.create_dir_all(&directory).await {
            warn!("Could not create {}: {e}", directory.display());
            issues.push(StartIssue::Storage(e));
        }

        self.ticker.start();
        self.last_session = Some(layout.id().clone());
        self.log.record_session_started();
        info!(
            session = %layout.id(),
            sensors = ?config.enabled_sensors,
            "Measurement started"
        );

        let report = StartReport {
            session_id: layout.id().clone(),
            directory,
            config: config.clone(),
            location: location.clone(),
            issues,
        };
        self.active = Some(ActiveSession {
            layout,
            started_at,
            config,
            streams,
            motion_subscriptions,
            location,
        });
        Ok(report)
    }

    /// End the session and flush every stream.
    ///
    /// All providers are unsubscribed before any buffer is read. Each file is
    /// written independently; failures are collected in the report and the
    /// controller returns to idle either way.
    pub async fn stop(&mut self) -> Result<StopReport, SessionError> {
        let Some(session) = self.active.take() else {
            warn!("Ignoring stop: no session is active");
            return Err(SessionError::NotActive);
        };
        let elapsed = self.ticker.elapsed();
        self.ticker.stop();

        self.providers.location.stop();
        for (kind, handle) in &session.motion_subscriptions {
            if let Some(provider) = self.providers.motion(*kind) {
                provider.unsubscribe(*handle);
                debug!(sensor = %kind, "Unsubscribed");
            }
        }

        let layout = &session.layout;
        let directory = layout.directory();
        let mut written = Vec::new();
        let mut failures = Vec::new();
        let mut samples = BTreeMap::new();

        // Idempotent; covers a directory that could not be created at start.
        if let Err(e) = self.files.create_dir_all(&directory).await {
            warn!("Could not create {}: {e}", directory.display());
            failures.push(e);
        }

        for (kind, shared) in &session.streams {
            let buffer = shared.take();
            samples.insert(*kind, buffer.len());
            self.log.record_samples(*kind, buffer.len() as u64);
            if buffer.suppressed() > 0 {
                debug!(sensor = %kind, count = buffer.suppressed(), "Dropped leading zero samples");
            }

            let path = layout.stream_file(*kind);
            self.write_file(path, &buffer.serialize(), &mut written, &mut failures)
                .await;
        }

        if session.config.general.is_some() {
            let artifact = ConfigArtifact {
                session_id: layout.id(),
                started_at: session.started_at,
                config: &session.config,
            };
            match serde_json::to_string_pretty(&artifact) {
                Ok(json) => {
                    self.write_file(layout.config_file(), &json, &mut written, &mut failures)
                        .await
                }
                Err(e) => warn!("Could not serialise session config: {e}"),
            }
        }

        self.log.record_session_completed();
        info!(
            session = %layout.id(),
            files = written.len(),
            failures = failures.len(),
            "Measurement stopped"
        );

        Ok(StopReport {
            session_id: layout.id().clone(),
            directory,
            written,
            failures,
            samples,
            elapsed,
        })
    }

    /// Whether `id` names a session this controller already ran or a folder
    /// already present in the file store.
    async fn id_taken(&self, id: &SessionId) -> bool {
        if self.last_session.as_ref() == Some(id) {
            return true;
        }
        match self.files.list_dir(Path::new(FILES_DIR)).await {
            Ok(names) => names.iter().any(|name| name == id.as_str()),
            Err(_) => false,
        }
    }

    async fn write_file(
        &self,
        path: PathBuf,
        contents: &str,
        written: &mut Vec<PathBuf>,
        failures: &mut Vec<StorageError>,
    ) {
        match self.files.write(&path, contents).await {
            Ok(()) => {
                self.log.record_file_written();
                written.push(path);
            }
            Err(e) => {
                warn!("Write failed: {e}");
                self.log.record_write_failure();
                failures.push(e);
            }
        }
    }
}

fn motion_callback(buffer: SharedBuffer, clock: Arc<dyn Clock>) -> SampleCallback<MotionReading> {
    Box::new(move |reading| {
        buffer.append(SampleRecord::motion(reading, clock.now()));
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::{LocationFix, ManualProvider, StaticPermission};
    use crate::settings::{MemorySettingsStore, SENSOR_SETTINGS_KEY};
    use crate::storage::LocalFileStore;
    use serde_json::json;

    fn controller(dir: &std::path::Path, settings: Arc<MemorySettingsStore>) -> SessionController {
        let providers = Providers {
            accelerometer: Box::new(ManualProvider::<MotionReading>::new()),
            gyroscope: Box::new(ManualProvider::<MotionReading>::new()),
            location: LocationTracker::new(
                Box::new(ManualProvider::<LocationFix>::new()),
                Box::new(StaticPermission::granted()),
            ),
        };
        SessionController::new(settings, Arc::new(LocalFileStore::new(dir)), providers)
    }

    #[tokio::test]
    async fn test_state_guards() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = controller(dir.path(), Arc::new(MemorySettingsStore::new()));

        assert_eq!(controller.state(), SessionState::Idle);
        assert_eq!(controller.stop().await.unwrap_err(), SessionError::NotActive);

        controller.start().await.unwrap();
        assert_eq!(controller.state(), SessionState::Active);
        assert_eq!(controller.start().await.unwrap_err(), SessionError::AlreadyActive);

        controller.stop().await.unwrap();
        assert_eq!(controller.state(), SessionState::Idle);
        assert!(controller.session_id().is_none());
    }

    #[tokio::test]
    async fn test_location_status_disabled_when_gps_off() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Arc::new(MemorySettingsStore::new());
        settings
            .set(SENSOR_SETTINGS_KEY, json!({"sensors": ["GYRO"]}))
            .await
            .unwrap();
        let mut controller = controller(dir.path(), settings);

        let report = controller.start().await.unwrap();
        assert_eq!(report.location, LocationStatus::Disabled);
        assert_eq!(controller.location_status(), Some(&LocationStatus::Disabled));
        assert_eq!(
            controller.sample_counts().keys().copied().collect::<Vec<_>>(),
            vec![SensorKind::Gyro]
        );
    }

    #[tokio::test]
    async fn test_same_second_restart_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let at = chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let mut controller = controller(dir.path(), Arc::new(MemorySettingsStore::new()))
            .with_clock(Arc::new(crate::session::SteppingClock::new(
                at,
                chrono::Duration::milliseconds(100),
            )));

        let first = controller.start().await.unwrap();
        controller.stop().await.unwrap();

        let err = controller.start().await.unwrap_err();
        assert_eq!(err, SessionError::IdInUse(first.session_id));
        assert_eq!(controller.state(), SessionState::Idle);
    }

    #[test]
    fn test_location_status_error_flag() {
        assert!(LocationStatus::PermissionDenied.is_error());
        assert!(LocationStatus::Unavailable("x".into()).is_error());
        assert!(!LocationStatus::Tracking.is_error());
        assert!(!LocationStatus::Disabled.is_error());
    }
}
