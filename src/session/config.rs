//! Snapshot of the settings taken when a session starts.

use crate::sensor::SensorKind;
use crate::session::rate::resolve_interval;
use crate::settings::{
    DeviceInfo, GeneralSettings, SensorSettings, SettingsStore, VehicleInfo,
    GENERAL_SETTINGS_KEY, SENSOR_SETTINGS_KEY,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::warn;

/// Resolved configuration for one session. Immutable once the session runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    pub enabled_sensors: BTreeSet<SensorKind>,
    #[serde(with = "millis")]
    pub accelerometer_interval: Duration,
    #[serde(with = "millis")]
    pub gyro_interval: Duration,
    #[serde(with = "millis")]
    pub gps_interval: Duration,
    /// The `generalSettings` document as read, when there was one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub general: Option<GeneralSettings>,
}

impl SessionConfig {
    /// Build a snapshot from already-parsed settings.
    pub fn resolve(sensors: &SensorSettings, general: Option<GeneralSettings>) -> Self {
        let rates = general
            .as_ref()
            .map(|g| g.sensor.clone())
            .unwrap_or_default();
        Self {
            enabled_sensors: sensors.enabled(),
            accelerometer_interval: resolve_interval(SensorKind::Accelerometer, &rates),
            gyro_interval: resolve_interval(SensorKind::Gyro, &rates),
            gps_interval: resolve_interval(SensorKind::Gps, &rates),
            general,
        }
    }

    /// Read the settings store and resolve a snapshot.
    ///
    /// Never fails: unreadable or malformed documents are logged and treated
    /// as absent, which selects the documented defaults.
    pub async fn load(store: &dyn SettingsStore) -> Self {
        let sensors: SensorSettings = read_document(store, SENSOR_SETTINGS_KEY)
            .await
            .unwrap_or_default();
        let general: Option<GeneralSettings> = read_document(store, GENERAL_SETTINGS_KEY).await;
        Self::resolve(&sensors, general)
    }

    pub fn is_enabled(&self, kind: SensorKind) -> bool {
        self.enabled_sensors.contains(&kind)
    }

    pub fn interval(&self, kind: SensorKind) -> Duration {
        match kind {
            SensorKind::Accelerometer => self.accelerometer_interval,
            SensorKind::Gyro => self.gyro_interval,
            SensorKind::Gps => self.gps_interval,
        }
    }

    pub fn device(&self) -> Option<&DeviceInfo> {
        self.general.as_ref().map(|g| &g.device)
    }

    pub fn vehicle(&self) -> Option<&VehicleInfo> {
        self.general.as_ref().map(|g| &g.vehicle)
    }
}

async fn read_document<T: DeserializeOwned>(store: &dyn SettingsStore, key: &str) -> Option<T> {
    let value = match store.get(key).await {
        Ok(Some(value)) => value,
        Ok(None) => return None,
        Err(e) => {
            warn!(key, "Could not read settings, using defaults: {e}");
            return None;
        }
    };
    match serde_json::from_value(value) {
        Ok(doc) => Some(doc),
        Err(e) => {
            warn!(key, "Malformed settings, using defaults: {e}");
            None
        }
    }
}

/// Serialise durations as whole milliseconds.
mod millis {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(duration.as_secs_f64() * 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::MemorySettingsStore;
    use serde_json::json;

    #[tokio::test]
    async fn test_empty_store_enables_everything_with_fallbacks() {
        let store = MemorySettingsStore::new();
        let config = SessionConfig::load(&store).await;

        assert_eq!(config.enabled_sensors.len(), 3);
        assert_eq!(config.accelerometer_interval, Duration::from_millis(1000));
        assert_eq!(config.gyro_interval, Duration::from_millis(1000));
        assert_eq!(config.gps_interval, Duration::from_millis(5000));
        assert!(config.general.is_none());
    }

    #[tokio::test]
    async fn test_load_reads_both_documents() {
        let store = MemorySettingsStore::new();
        store
            .set(SENSOR_SETTINGS_KEY, json!({"sensors": ["ACCELEROMETER", "GPS"]}))
            .await
            .unwrap();
        store
            .set(
                GENERAL_SETTINGS_KEY,
                json!({"device": {"brand": "x", "model": "y"},
                       "vehicle": {},
                       "sensor": {"gpsRate": "1000", "accelerometerRate": "2"}}),
            )
            .await
            .unwrap();

        let config = SessionConfig::load(&store).await;
        assert!(config.is_enabled(SensorKind::Accelerometer));
        assert!(config.is_enabled(SensorKind::Gps));
        assert!(!config.is_enabled(SensorKind::Gyro));
        assert_eq!(config.interval(SensorKind::Accelerometer), Duration::from_millis(500));
        assert_eq!(config.interval(SensorKind::Gyro), Duration::from_millis(500));
        assert_eq!(config.interval(SensorKind::Gps), Duration::from_millis(1000));
        assert_eq!(config.device().unwrap().brand.as_deref(), Some("x"));
    }

    #[tokio::test]
    async fn test_malformed_documents_fall_back() {
        let store = MemorySettingsStore::new();
        store.set(SENSOR_SETTINGS_KEY, json!("GPS")).await.unwrap();
        store.set(GENERAL_SETTINGS_KEY, json!([1, 2])).await.unwrap();

        let config = SessionConfig::load(&store).await;
        assert_eq!(config.enabled_sensors.len(), 3);
        assert!(config.general.is_none());
    }

    #[test]
    fn test_config_serializes_as_json() {
        let config = SessionConfig::resolve(
            &SensorSettings::from_kinds([SensorKind::Gyro]),
            Some(GeneralSettings::default()),
        );
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["enabledSensors"], json!(["GYRO"]));
        assert_eq!(value["gyroInterval"], json!(1000.0));
        assert!(value.get("general").is_some());
    }
}
