//! Sensor kinds, provider readings and buffered sample records.
//!
//! Readings are what a provider hands to its callback. Records are readings
//! stamped with the wall-clock time at which they were buffered.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Timestamp layout used in stream files (`YY-MM-DD HH:mm:ss:mmm`).
pub const TIMESTAMP_FORMAT: &str = "%y-%m-%d %H:%M:%S:%3f";

/// Field delimiter for stream files.
pub const FIELD_DELIMITER: char = ';';

/// Conversion factor from metres per second to kilometres per hour.
pub const MPS_TO_KMH: f64 = 3.6;

/// The sensors a session can record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SensorKind {
    Accelerometer,
    Gyro,
    Gps,
}

impl SensorKind {
    /// All kinds, in the order streams are listed.
    pub const ALL: [SensorKind; 3] = [SensorKind::Accelerometer, SensorKind::Gyro, SensorKind::Gps];

    /// Suffix used in the stream file name (`{id}-{suffix}.txt`).
    pub fn file_suffix(&self) -> &'static str {
        match self {
            SensorKind::Accelerometer => "Acc",
            SensorKind::Gyro => "Gyro",
            SensorKind::Gps => "GPS",
        }
    }

    /// Header line written at the top of the stream file.
    pub fn header(&self) -> &'static str {
        match self {
            SensorKind::Accelerometer | SensorKind::Gyro => "x;y;z;date",
            SensorKind::Gps => "lat;lon;kmh;date",
        }
    }

    /// Name used in the `sensorSettings` enablement list.
    pub fn settings_name(&self) -> &'static str {
        match self {
            SensorKind::Accelerometer => "ACCELEROMETER",
            SensorKind::Gyro => "GYRO",
            SensorKind::Gps => "GPS",
        }
    }

    /// Whether readings for this kind are three-axis motion vectors.
    pub fn is_motion(&self) -> bool {
        !matches!(self, SensorKind::Gps)
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.settings_name())
    }
}

/// Error returned when a sensor name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown sensor: {0}")]
pub struct UnknownSensor(pub String);

impl FromStr for SensorKind {
    type Err = UnknownSensor;

    /// Names are matched case-insensitively; the settings form has stored
    /// both `GPS` and `gps` at different times.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ACCELEROMETER" | "ACC" => Ok(SensorKind::Accelerometer),
            "GYRO" | "GYROSCOPE" => Ok(SensorKind::Gyro),
            "GPS" | "LOCATION" => Ok(SensorKind::Gps),
            _ => Err(UnknownSensor(s.to_string())),
        }
    }
}

/// A three-axis reading from the accelerometer or gyroscope.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MotionReading {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl MotionReading {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// True when every axis is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }
}

/// A position fix as reported by a location provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: Option<f64>,
    /// Ground speed in metres per second, if the provider knows it.
    pub speed_mps: Option<f64>,
}

impl LocationFix {
    pub fn new(latitude: f64, longitude: f64, speed_mps: Option<f64>) -> Self {
        Self {
            latitude,
            longitude,
            altitude: None,
            speed_mps,
        }
    }

    /// Speed in km/h. A fix without speed is recorded as stationary.
    pub fn speed_kmh(&self) -> f64 {
        self.speed_mps.map(|s| s * MPS_TO_KMH).unwrap_or(0.0)
    }
}

/// A GPS sample as buffered: position plus speed already converted to km/h.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsSample {
    pub latitude: f64,
    pub longitude: f64,
    pub speed_kmh: f64,
}

impl From<LocationFix> for GpsSample {
    fn from(fix: LocationFix) -> Self {
        Self {
            latitude: fix.latitude,
            longitude: fix.longitude,
            speed_kmh: fix.speed_kmh(),
        }
    }
}

/// A buffered sample: a reading plus the time it was buffered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SampleRecord {
    Motion {
        reading: MotionReading,
        captured_at: NaiveDateTime,
    },
    Location {
        sample: GpsSample,
        captured_at: NaiveDateTime,
    },
}

impl SampleRecord {
    pub fn motion(reading: MotionReading, captured_at: NaiveDateTime) -> Self {
        SampleRecord::Motion {
            reading,
            captured_at,
        }
    }

    pub fn location(sample: GpsSample, captured_at: NaiveDateTime) -> Self {
        SampleRecord::Location {
            sample,
            captured_at,
        }
    }

    pub fn captured_at(&self) -> NaiveDateTime {
        match self {
            SampleRecord::Motion { captured_at, .. } => *captured_at,
            SampleRecord::Location { captured_at, .. } => *captured_at,
        }
    }

    /// Render the record as one delimited line, without a line terminator.
    ///
    /// Floats use the shortest representation that round-trips, so `1.0`
    /// renders as `1` and no precision is lost.
    pub fn to_line(&self) -> String {
        let (a, b, c) = match self {
            SampleRecord::Motion { reading, .. } => (reading.x, reading.y, reading.z),
            SampleRecord::Location { sample, .. } => {
                (sample.latitude, sample.longitude, sample.speed_kmh)
            }
        };
        let d = FIELD_DELIMITER;
        format!(
            "{a}{d}{b}{d}{c}{d}{}",
            format_timestamp(&self.captured_at())
        )
    }
}

/// Format a capture time the way stream files expect it.
pub fn format_timestamp(at: &NaiveDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}
