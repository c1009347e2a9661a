//! In-memory stream buffers.
//!
//! One buffer per enabled sensor accumulates records for the whole session
//! and is rendered once, at stop. Buffers are unbounded.

use crate::sensor::{SampleRecord, SensorKind};
use std::sync::{Arc, Mutex, MutexGuard};

/// Line separator used in stream files.
pub const LINE_SEPARATOR: &str = "\n";

/// What to do with all-zero motion samples that arrive before any real one.
///
/// Motion providers commonly report `(0, 0, 0)` while warming up. Only the
/// leading run is affected; a zero reading after the first non-zero sample is
/// a genuine measurement and is always kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LeadingZeroPolicy {
    Keep,
    #[default]
    DiscardLeading,
}

/// Ordered records for one sensor plus the header of its file.
#[derive(Debug, Clone)]
pub struct StreamBuffer {
    kind: SensorKind,
    header: &'static str,
    records: Vec<SampleRecord>,
    policy: LeadingZeroPolicy,
    warmed_up: bool,
    suppressed: usize,
}

impl StreamBuffer {
    /// An empty buffer. The leading-zero policy only ever applies to motion sensors.
    pub fn new(kind: SensorKind, policy: LeadingZeroPolicy) -> Self {
        let policy = if kind.is_motion() {
            policy
        } else {
            LeadingZeroPolicy::Keep
        };
        Self {
            kind,
            header: kind.header(),
            records: Vec::new(),
            policy,
            warmed_up: false,
            suppressed: 0,
        }
    }

    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    pub fn header(&self) -> &str {
        self.header
    }

    /// Append a record. Returns false if it was suppressed as warm-up noise.
    pub fn append(&mut self, record: SampleRecord) -> bool {
        if !self.warmed_up {
            let leading_zero = matches!(
                &record,
                SampleRecord::Motion { reading, .. } if reading.is_zero()
            );
            if leading_zero && self.policy == LeadingZeroPolicy::DiscardLeading {
                self.suppressed += 1;
                return false;
            }
            self.warmed_up = true;
        }
        self.records.push(record);
        true
    }

    pub fn records(&self) -> &[SampleRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of leading all-zero samples dropped so far.
    pub fn suppressed(&self) -> usize {
        self.suppressed
    }

    /// Header line followed by one line per record, in append order.
    ///
    /// No trailing separator; an empty buffer renders as the header alone.
    pub fn serialize(&self) -> String {
        let mut out = String::with_capacity(self.header.len() + self.records.len() * 48);
        out.push_str(self.header);
        for record in &self.records {
            out.push_str(LINE_SEPARATOR);
            out.push_str(&record.to_line());
        }
        out
    }
}

/// A buffer shared between the session and a provider callback.
#[derive(Debug, Clone)]
pub struct SharedBuffer(Arc<Mutex<StreamBuffer>>);

impl SharedBuffer {
    pub fn new(buffer: StreamBuffer) -> Self {
        Self(Arc::new(Mutex::new(buffer)))
    }

    pub fn lock(&self) -> MutexGuard<'_, StreamBuffer> {
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn append(&self, record: SampleRecord) -> bool {
        self.lock().append(record)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Take the buffered contents, leaving an empty buffer behind.
    pub fn take(&self) -> StreamBuffer {
        let mut guard = self.lock();
        let empty = StreamBuffer::new(guard.kind, guard.policy);
        std::mem::replace(&mut *guard, empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::{GpsSample, MotionReading};
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(ms: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_milli_opt(10, 0, 0, ms)
            .unwrap()
    }

    fn motion(x: f64, y: f64, z: f64, ms: u32) -> SampleRecord {
        SampleRecord::motion(MotionReading::new(x, y, z), at(ms))
    }

    #[test]
    fn test_empty_buffer_serializes_header_only() {
        let buffer = StreamBuffer::new(SensorKind::Gyro, LeadingZeroPolicy::default());
        assert_eq!(buffer.serialize(), "x;y;z;date");

        let gps = StreamBuffer::new(SensorKind::Gps, LeadingZeroPolicy::default());
        assert_eq!(gps.serialize(), "lat;lon;kmh;date");
    }

    #[test]
    fn test_serialize_preserves_append_order() {
        let mut buffer = StreamBuffer::new(SensorKind::Accelerometer, LeadingZeroPolicy::Keep);
        for i in 0..50u32 {
            buffer.append(motion(i as f64, 0.5, -1.0, i));
        }
        assert_eq!(buffer.len(), 50);

        let text = buffer.serialize();
        let lines: Vec<&str> = text.split('\n').collect();
        assert_eq!(lines.len(), 51);
        assert_eq!(lines[0], "x;y;z;date");
        for (i, line) in lines[1..].iter().enumerate() {
            assert!(line.starts_with(&format!("{i};0.5;-1;")), "line {i}: {line}");
        }
        assert!(!text.ends_with('\n'));
    }

    #[test]
    fn test_leading_zero_samples_are_suppressed() {
        let mut buffer =
            StreamBuffer::new(SensorKind::Accelerometer, LeadingZeroPolicy::DiscardLeading);
        assert!(!buffer.append(motion(0.0, 0.0, 0.0, 0)));
        assert!(!buffer.append(motion(0.0, 0.0, 0.0, 1)));
        assert!(buffer.append(motion(0.1, 0.0, 9.8, 2)));
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.suppressed(), 2);
    }

    #[test]
    fn test_zero_after_first_real_sample_is_recorded() {
        let mut buffer = StreamBuffer::new(SensorKind::Gyro, LeadingZeroPolicy::DiscardLeading);
        assert!(buffer.append(motion(0.3, 0.0, 0.0, 0)));
        assert!(buffer.append(motion(0.0, 0.0, 0.0, 1)));
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.suppressed(), 0);
        assert!(buffer.serialize().ends_with("\n0;0;0;24-05-01 10:00:00:001"));
    }

    #[test]
    fn test_keep_policy_records_leading_zero() {
        let mut buffer = StreamBuffer::new(SensorKind::Accelerometer, LeadingZeroPolicy::Keep);
        assert!(buffer.append(motion(0.0, 0.0, 0.0, 0)));
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_policy_never_applies_to_gps() {
        let mut buffer = StreamBuffer::new(SensorKind::Gps, LeadingZeroPolicy::DiscardLeading);
        let sample = GpsSample {
            latitude: 0.0,
            longitude: 0.0,
            speed_kmh: 0.0,
        };
        assert!(buffer.append(SampleRecord::location(sample, at(0))));
        assert_eq!(buffer.serialize(), "lat;lon;kmh;date\n0;0;0;24-05-01 10:00:00:000");
    }

    #[test]
    fn test_shared_buffer_take_leaves_empty() {
        let shared = SharedBuffer::new(StreamBuffer::new(
            SensorKind::Accelerometer,
            LeadingZeroPolicy::Keep,
        ));
        shared.clone().append(motion(1.0, 2.0, 3.0, 0));
        assert_eq!(shared.len(), 1);

        let taken = shared.take();
        assert_eq!(taken.len(), 1);
        assert!(shared.is_empty());
    }
}
