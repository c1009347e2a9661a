//! Typed views of the documents kept in the settings store.
//!
//! The documents are written by hand-edited forms, so parsing is lenient:
//! numeric fields may arrive as strings or numbers and blank strings count as
//! unset.

use crate::sensor::SensorKind;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use tracing::warn;

/// Store key for device, vehicle and sampling-rate settings.
pub const GENERAL_SETTINGS_KEY: &str = "generalSettings";

/// Store key for the list of enabled sensors.
pub const SENSOR_SETTINGS_KEY: &str = "sensorSettings";

/// How the phone is attached to the vehicle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountType {
    NoMount,
    Magnetic,
    Clip,
    /// Anything the form did not offer; kept verbatim.
    Other(String),
}

impl MountType {
    pub fn as_str(&self) -> &str {
        match self {
            MountType::NoMount => "NO_MOUNT",
            MountType::Magnetic => "MAGNETIC",
            MountType::Clip => "CLIP",
            MountType::Other(s) => s,
        }
    }
}

impl From<String> for MountType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "NO_MOUNT" => MountType::NoMount,
            "MAGNETIC" => MountType::Magnetic,
            "CLIP" => MountType::Clip,
            _ => MountType::Other(s),
        }
    }
}

impl fmt::Display for MountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for MountType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Device metadata echoed into the session's config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, deserialize_with = "lenient::mount", skip_serializing_if = "Option::is_none")]
    pub mount_type: Option<MountType>,
}

/// Vehicle metadata echoed into the session's config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleInfo {
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    /// Odometer reading as typed by the user.
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub km: Option<String>,
}

/// Configured sampling rates, exactly as stored.
///
/// GPS is an interval in milliseconds; accelerometer and gyro are in Hz.
/// See [`crate::session::rate`] for how these become subscription intervals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorRates {
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub gps_rate: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub accelerometer_rate: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub gyro_rate: Option<String>,
}

/// The `generalSettings` document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneralSettings {
    #[serde(default)]
    pub device: DeviceInfo,
    #[serde(default)]
    pub vehicle: VehicleInfo,
    #[serde(default)]
    pub sensor: SensorRates,
}

/// The `sensorSettings` document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorSettings {
    #[serde(default)]
    pub sensors: Vec<String>,
}

impl Default for SensorSettings {
    /// Everything enabled, as the settings form starts out.
    fn default() -> Self {
        Self::from_kinds(SensorKind::ALL)
    }
}

impl SensorSettings {
    pub fn from_kinds(kinds: impl IntoIterator<Item = SensorKind>) -> Self {
        Self {
            sensors: kinds
                .into_iter()
                .map(|k| k.settings_name().to_string())
                .collect(),
        }
    }

    /// Parse a comma-separated list such as `gps,accelerometer` or `all`.
    pub fn from_csv(s: &str) -> Self {
        let names: Vec<&str> = s.split(',').map(str::trim).filter(|s| !s.is_empty()).collect();
        if names.iter().any(|n| n.eq_ignore_ascii_case("all")) {
            return Self::default();
        }
        Self {
            sensors: names.into_iter().map(str::to_string).collect(),
        }
    }

    /// The recognised sensors. Unknown names are logged and skipped.
    pub fn enabled(&self) -> BTreeSet<SensorKind> {
        self.sensors
            .iter()
            .filter_map(|name| match name.parse::<SensorKind>() {
                Ok(kind) => Some(kind),
                Err(e) => {
                    warn!("Ignoring sensor setting: {e}");
                    None
                }
            })
            .collect()
    }
}

/// Serde helpers for form-entered values.
mod lenient {
    use super::MountType;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// Accept a string, number or null. Blank strings become `None`.
    pub fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(match value {
            Some(Value::String(s)) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::Bool(b)) => Some(b.to_string()),
            _ => None,
        })
    }

    pub fn mount<'de, D>(deserializer: D) -> Result<Option<MountType>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(text(deserializer)?.map(MountType::from))
    }
}

impl<'de> Deserialize<'de> for MountType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(MountType::from(String::deserialize(deserializer)?))
    }
}
