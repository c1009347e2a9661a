//! Sensor sources for the recorder.
//!
//! This module defines the provider capability the session controller depends
//! on, the reading and record types, and the concrete providers: push-driven
//! ([`ManualProvider`]) and timer-driven synthetic ones.

pub mod location;
pub mod manual;
pub mod provider;
pub mod simulated;
pub mod types;

// Re-export commonly used types
pub use location::{
    LocationError, LocationPermission, LocationTracker, PermissionStatus, StaticPermission,
};
pub use manual::{ManualEmitter, ManualProvider};
pub use provider::{
    Accuracy, CallbackSlot, LocationProvider, ProviderError, SampleCallback, SensorProvider,
    SubscriptionHandle,
};
pub use simulated::{MotionProfile, SimulatedLocation, SimulatedMotion};
pub use types::{
    format_timestamp, GpsSample, LocationFix, MotionReading, SampleRecord, SensorKind,
    UnknownSensor,
};
