//! Measurement sessions.
//!
//! This module contains:
//! - The session controller and its state machine
//! - Stream buffers and their text rendering
//! - Rate resolution from settings to provider intervals
//! - The elapsed-time ticker and recording statistics

pub mod buffer;
pub mod clock;
pub mod config;
pub mod controller;
pub mod id;
pub mod log;
pub mod rate;
pub mod ticker;

// Re-export commonly used types
pub use buffer::{LeadingZeroPolicy, SharedBuffer, StreamBuffer};
pub use clock::{Clock, SteppingClock, SystemClock};
pub use config::SessionConfig;
pub use controller::{
    LocationStatus, Providers, RecorderOptions, SessionController, SessionError, SessionState,
    StartIssue, StartReport, StopReport,
};
pub use id::SessionId;
pub use log::{
    create_shared_log, create_shared_log_with_persistence, RecordingLog, RecordingStats,
    SharedRecordingLog,
};
pub use rate::{interval_to_hz, resolve_interval};
pub use ticker::{format_elapsed, ElapsedTicker};
