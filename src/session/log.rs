//! Recording statistics.
//!
//! Cumulative counters of what the recorder has captured and written,
//! optionally persisted between runs so `measure status` can report them.

use crate::sensor::SensorKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Thread-safe recording counters.
#[derive(Debug)]
pub struct RecordingLog {
    accelerometer_samples: AtomicU64,
    gyro_samples: AtomicU64,
    gps_samples: AtomicU64,
    sessions_started: AtomicU64,
    sessions_completed: AtomicU64,
    files_written: AtomicU64,
    write_failures: AtomicU64,
    permission_denials: AtomicU64,
    /// When this process started counting
    started: DateTime<Utc>,
    persist_path: Option<PathBuf>,
}

impl RecordingLog {
    pub fn new() -> Self {
        Self {
            accelerometer_samples: AtomicU64::new(0),
            gyro_samples: AtomicU64::new(0),
            gps_samples: AtomicU64::new(0),
            sessions_started: AtomicU64::new(0),
            sessions_completed: AtomicU64::new(0),
            files_written: AtomicU64::new(0),
            write_failures: AtomicU64::new(0),
            permission_denials: AtomicU64::new(0),
            started: Utc::now(),
            persist_path: None,
        }
    }

    /// Create a log that loads from and saves to `path`.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut log = Self::new();
        log.persist_path = Some(path);

        if let Err(e) = log.load() {
            debug!("Could not load previous recording stats: {e}");
        }

        log
    }

    fn samples(&self, kind: SensorKind) -> &AtomicU64 {
        match kind {
            SensorKind::Accelerometer => &self.accelerometer_samples,
            SensorKind::Gyro => &self.gyro_samples,
            SensorKind::Gps => &self.gps_samples,
        }
    }

    pub fn record_samples(&self, kind: SensorKind, count: u64) {
        self.samples(kind).fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_session_started(&self) {
        self.sessions_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_session_completed(&self) {
        self.sessions_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_file_written(&self) {
        self.files_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_write_failure(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_permission_denied(&self) {
        self.permission_denials.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> RecordingStats {
        RecordingStats {
            accelerometer_samples: self.accelerometer_samples.load(Ordering::Relaxed),
            gyro_samples: self.gyro_samples.load(Ordering::Relaxed),
            gps_samples: self.gps_samples.load(Ordering::Relaxed),
            sessions_started: self.sessions_started.load(Ordering::Relaxed),
            sessions_completed: self.sessions_completed.load(Ordering::Relaxed),
            files_written: self.files_written.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            permission_denials: self.permission_denials.load(Ordering::Relaxed),
            started: self.started,
        }
    }

    /// Human-readable summary.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Recording Statistics:\n\
             - Accelerometer samples: {}\n\
             - Gyroscope samples: {}\n\
             - GPS samples: {}\n\
             - Sessions started: {}\n\
             - Sessions completed: {}\n\
             - Files written: {}\n\
             - Write failures: {}\n\
             - Location permission denials: {}",
            stats.accelerometer_samples,
            stats.gyro_samples,
            stats.gps_samples,
            stats.sessions_started,
            stats.sessions_completed,
            stats.files_written,
            stats.write_failures,
            stats.permission_denials,
        )
    }

    /// Save counters to disk. A no-op without a persistence path.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let persisted = PersistedStats {
                stats: self.stats(),
                last_updated: Utc::now(),
            };
            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;
            std::fs::write(path, json)?;
        }
        Ok(())
    }

    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let persisted: PersistedStats =
                    serde_json::from_str(&content).map_err(std::io::Error::other)?;
                let s = persisted.stats;

                self.accelerometer_samples
                    .store(s.accelerometer_samples, Ordering::Relaxed);
                self.gyro_samples.store(s.gyro_samples, Ordering::Relaxed);
                self.gps_samples.store(s.gps_samples, Ordering::Relaxed);
                self.sessions_started
                    .store(s.sessions_started, Ordering::Relaxed);
                self.sessions_completed
                    .store(s.sessions_completed, Ordering::Relaxed);
                self.files_written.store(s.files_written, Ordering::Relaxed);
                self.write_failures.store(s.write_failures, Ordering::Relaxed);
                self.permission_denials
                    .store(s.permission_denials, Ordering::Relaxed);
                self.started = s.started;
            }
        }
        Ok(())
    }

    pub fn reset(&self) {
        for counter in [
            &self.accelerometer_samples,
            &self.gyro_samples,
            &self.gps_samples,
            &self.sessions_started,
            &self.sessions_completed,
            &self.files_written,
            &self.write_failures,
            &self.permission_denials,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl Default for RecordingLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of the counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingStats {
    pub accelerometer_samples: u64,
    pub gyro_samples: u64,
    pub gps_samples: u64,
    pub sessions_started: u64,
    pub sessions_completed: u64,
    pub files_written: u64,
    pub write_failures: u64,
    pub permission_denials: u64,
    pub started: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedStats {
    #[serde(flatten)]
    stats: RecordingStats,
    last_updated: DateTime<Utc>,
}

/// Recording log shared between the controller and its owner.
pub type SharedRecordingLog = Arc<RecordingLog>;

pub fn create_shared_log() -> SharedRecordingLog {
    Arc::new(RecordingLog::new())
}

pub fn create_shared_log_with_persistence(path: PathBuf) -> SharedRecordingLog {
    Arc::new(RecordingLog::with_persistence(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counting_per_sensor() {
        let log = RecordingLog::new();
        log.record_samples(SensorKind::Accelerometer, 10);
        log.record_samples(SensorKind::Gps, 2);
        log.record_samples(SensorKind::Accelerometer, 5);

        let stats = log.stats();
        assert_eq!(stats.accelerometer_samples, 15);
        assert_eq!(stats.gyro_samples, 0);
        assert_eq!(stats.gps_samples, 2);
    }

    #[test]
    fn test_reset() {
        let log = RecordingLog::new();
        log.record_session_started();
        log.record_file_written();
        log.reset();

        let stats = log.stats();
        assert_eq!(stats.sessions_started, 0);
        assert_eq!(stats.files_written, 0);
    }

    #[test]
    fn test_persistence_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats").join("recording.json");

        let log = RecordingLog::with_persistence(path.clone());
        log.record_session_started();
        log.record_session_completed();
        log.record_write_failure();
        log.save().unwrap();

        let reloaded = RecordingLog::with_persistence(path);
        let stats = reloaded.stats();
        assert_eq!(stats.sessions_started, 1);
        assert_eq!(stats.sessions_completed, 1);
        assert_eq!(stats.write_failures, 1);
    }

    #[test]
    fn test_summary_format() {
        let summary = RecordingLog::new().summary();
        assert!(summary.contains("Accelerometer samples"));
        assert!(summary.contains("Files written"));
    }
}
