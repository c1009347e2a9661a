//! Settings consumed by the recorder.
//!
//! The store itself belongs to whoever edits the settings; the recorder only
//! reads a snapshot of it when a session starts.

pub mod store;
pub mod types;

// Re-export commonly used types
pub use store::{JsonFileSettingsStore, MemorySettingsStore, SettingsError, SettingsStore};
pub use types::{
    DeviceInfo, GeneralSettings, MountType, SensorRates, SensorSettings, VehicleInfo,
    GENERAL_SETTINGS_KEY, SENSOR_SETTINGS_KEY,
};
