//! Measurement Recorder - session-based motion and GPS telemetry capture.
//!
//! This library records accelerometer, gyroscope and GPS readings during a
//! user-initiated measurement session and writes each stream to a
//! semicolon-delimited text file when the session ends.
//!
//! # Guarantees
//!
//! - **One session at a time**: a second start while active is rejected
//! - **Single flush point**: nothing touches disk until stop
//! - **Quiescent flush**: every provider is unsubscribed before buffers are read
//! - **Best-effort writes**: one failed file never prevents the others
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     SessionController                        │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌────────────┐   ┌──────────────┐   ┌────────────────┐      │
//! │  │ Settings   │──▶│ Rate resolver│──▶│ Providers      │      │
//! │  │ snapshot   │   │ (Hz / ms)    │   │ acc, gyro, GPS │      │
//! │  └────────────┘   └──────────────┘   └────────────────┘      │
//! │                                              │ callbacks     │
//! │                                              ▼               │
//! │  ┌────────────┐                      ┌────────────────┐      │
//! │  │ FileStore  │◀──── stop() ─────────│ StreamBuffers  │      │
//! │  │ files/{id} │                      │ (in memory)    │      │
//! │  └────────────┘                      └────────────────┘      │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use measurement_recorder::{sensor, settings, storage, SessionController, Providers};
//!
//! # async fn run() -> Result<(), measurement_recorder::SessionError> {
//! let providers = Providers {
//!     accelerometer: Box::new(sensor::SimulatedMotion::accelerometer()),
//!     gyroscope: Box::new(sensor::SimulatedMotion::gyroscope()),
//!     location: sensor::LocationTracker::new(
//!         Box::new(sensor::SimulatedLocation::default()),
//!         Box::new(sensor::StaticPermission::granted()),
//!     ),
//! };
//! let mut controller = SessionController::new(
//!     Arc::new(settings::MemorySettingsStore::new()),
//!     Arc::new(storage::LocalFileStore::new("/tmp/recordings")),
//!     providers,
//! );
//!
//! controller.start().await?;
//! // ... readings accumulate ...
//! let report = controller.stop().await?;
//! println!("wrote {} files", report.written.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod sensor;
pub mod session;
pub mod settings;
pub mod storage;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError};
pub use sensor::{LocationFix, MotionReading, SampleRecord, SensorKind};
pub use session::{
    LocationStatus, Providers, RecorderOptions, SessionConfig, SessionController, SessionError,
    SessionId, SessionState, StartReport, StopReport,
};
pub use settings::{GeneralSettings, SensorSettings, SettingsStore};
pub use storage::{FileStore, LocalFileStore, SessionArchive, StorageError};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
