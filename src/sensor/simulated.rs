//! Timer-driven synthetic providers.
//!
//! These stand in for hardware when the recorder runs on a machine without
//! motion or location sensors. Each subscription spawns a tokio task that
//! produces one reading per interval; the task stops as soon as its callback
//! slot is cleared.

use crate::sensor::provider::{
    Accuracy, CallbackSlot, LocationProvider, ProviderError, SampleCallback, SensorProvider,
    SubscriptionHandle,
};
use crate::sensor::types::{LocationFix, MotionReading};
use std::collections::HashMap;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Standard gravity, m/s².
const GRAVITY: f64 = 9.80665;

/// Metres per degree of latitude (spherical approximation).
const METRES_PER_DEGREE: f64 = 111_320.0;

struct Running<R> {
    slot: CallbackSlot<R>,
    task: JoinHandle<()>,
}

/// Book-keeping shared by the simulated providers.
struct TaskSet<R> {
    running: HashMap<SubscriptionHandle, Running<R>>,
}

impl<R: Send + 'static> TaskSet<R> {
    fn new() -> Self {
        Self {
            running: HashMap::new(),
        }
    }

    fn spawn<F>(
        &mut self,
        interval: Duration,
        callback: SampleCallback<R>,
        mut next: F,
    ) -> Result<SubscriptionHandle, ProviderError>
    where
        F: FnMut(u64) -> R + Send + 'static,
    {
        if interval.is_zero() {
            return Err(ProviderError::InvalidInterval(interval));
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| ProviderError::Other(format!("no async runtime: {e}")))?;

        let slot = CallbackSlot::new(callback);
        let producer = slot.clone();
        let task = runtime.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut n = 0u64;
            loop {
                ticker.tick().await;
                if !producer.deliver(next(n)) {
                    break;
                }
                n += 1;
            }
        });

        let handle = SubscriptionHandle::new();
        self.running.insert(handle, Running { slot, task });
        Ok(handle)
    }

    fn stop(&mut self, handle: SubscriptionHandle) {
        if let Some(running) = self.running.remove(&handle) {
            running.slot.clear();
            running.task.abort();
        }
    }
}

impl<R> Drop for TaskSet<R> {
    fn drop(&mut self) {
        for (_, running) in self.running.drain() {
            running.slot.clear();
            running.task.abort();
        }
    }
}

/// Which motion sensor to imitate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionProfile {
    /// Device lying flat with light vibration, gravity on z.
    Accelerometer,
    /// Slow sway around all three axes, rad/s.
    Gyroscope,
}

/// Synthetic accelerometer or gyroscope.
pub struct SimulatedMotion {
    profile: MotionProfile,
    tasks: TaskSet<MotionReading>,
}

impl SimulatedMotion {
    pub fn new(profile: MotionProfile) -> Self {
        Self {
            profile,
            tasks: TaskSet::new(),
        }
    }

    pub fn accelerometer() -> Self {
        Self::new(MotionProfile::Accelerometer)
    }

    pub fn gyroscope() -> Self {
        Self::new(MotionProfile::Gyroscope)
    }
}

/// Reading number `n` for a motion profile sampled every `interval`.
fn motion_sample(profile: MotionProfile, interval: Duration, n: u64) -> MotionReading {
    let t = interval.as_secs_f64() * n as f64;
    match profile {
        MotionProfile::Accelerometer => MotionReading::new(
            0.05 * (7.0 * t).sin(),
            0.05 * (5.0 * t).cos(),
            GRAVITY + 0.1 * (11.0 * t).sin(),
        ),
        MotionProfile::Gyroscope => MotionReading::new(
            0.2 * (0.5 * t).sin(),
            0.1 * (0.3 * t).cos(),
            0.05 * (0.7 * t).sin(),
        ),
    }
}

impl SensorProvider<MotionReading> for SimulatedMotion {
    fn subscribe(
        &mut self,
        interval: Duration,
        callback: SampleCallback<MotionReading>,
    ) -> Result<SubscriptionHandle, ProviderError> {
        let profile = self.profile;
        self.tasks
            .spawn(interval, callback, move |n| motion_sample(profile, interval, n))
    }

    fn unsubscribe(&mut self, handle: SubscriptionHandle) {
        self.tasks.stop(handle);
    }
}

/// Synthetic GPS moving due north-east at constant speed.
pub struct SimulatedLocation {
    origin: (f64, f64),
    speed_mps: f64,
    accuracy: Accuracy,
    tasks: TaskSet<LocationFix>,
}

impl SimulatedLocation {
    pub fn new(latitude: f64, longitude: f64, speed_mps: f64) -> Self {
        Self {
            origin: (latitude, longitude),
            speed_mps,
            accuracy: Accuracy::default(),
            tasks: TaskSet::new(),
        }
    }

    pub fn accuracy(&self) -> Accuracy {
        self.accuracy
    }
}

impl Default for SimulatedLocation {
    fn default() -> Self {
        // São Carlos, SP at urban driving speed.
        Self::new(-22.0087, -47.8909, 11.0)
    }
}

fn location_sample(origin: (f64, f64), speed_mps: f64, interval: Duration, n: u64) -> LocationFix {
    let travelled = speed_mps * interval.as_secs_f64() * n as f64;
    let step = travelled / METRES_PER_DEGREE / std::f64::consts::SQRT_2;
    let lat = origin.0 + step;
    let lon = origin.1 + step / lat.to_radians().cos().max(f64::EPSILON);
    LocationFix {
        latitude: lat,
        longitude: lon,
        altitude: Some(850.0),
        speed_mps: Some(speed_mps),
    }
}

impl SensorProvider<LocationFix> for SimulatedLocation {
    fn subscribe(
        &mut self,
        interval: Duration,
        callback: SampleCallback<LocationFix>,
    ) -> Result<SubscriptionHandle, ProviderError> {
        let (origin, speed) = (self.origin, self.speed_mps);
        self.tasks
            .spawn(interval, callback, move |n| location_sample(origin, speed, interval, n))
    }

    fn unsubscribe(&mut self, handle: SubscriptionHandle) {
        self.tasks.stop(handle);
    }
}

impl LocationProvider for SimulatedLocation {
    fn set_accuracy(&mut self, accuracy: Accuracy) {
        self.accuracy = accuracy;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_accelerometer_profile_sees_gravity() {
        let reading = motion_sample(MotionProfile::Accelerometer, Duration::from_millis(10), 0);
        assert!((reading.z - GRAVITY).abs() < 0.2);
        assert!(!reading.is_zero());
    }

    #[test]
    fn test_location_moves_away_from_origin() {
        let first = location_sample((0.0, 0.0), 10.0, Duration::from_secs(1), 0);
        let later = location_sample((0.0, 0.0), 10.0, Duration::from_secs(1), 100);
        assert_eq!(first.latitude, 0.0);
        assert!(later.latitude > 0.0);
        assert!(later.longitude > 0.0);
        assert_eq!(later.speed_mps, Some(10.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_motion_delivers_until_unsubscribed() {
        let mut provider = SimulatedMotion::accelerometer();
        let count = Arc::new(Mutex::new(0usize));
        let sink = Arc::clone(&count);

        let handle = provider
            .subscribe(
                Duration::from_millis(100),
                Box::new(move |_| *sink.lock().unwrap() += 1),
            )
            .unwrap();

        // First tick fires immediately, then one per 100 ms.
        tokio::time::sleep(Duration::from_millis(350)).await;
        provider.unsubscribe(handle);
        let delivered = *count.lock().unwrap();
        assert!(delivered >= 3, "delivered {delivered}");

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(*count.lock().unwrap(), delivered);
    }

    #[test]
    fn test_subscribe_without_runtime_fails() {
        let mut provider = SimulatedMotion::gyroscope();
        let result = provider.subscribe(Duration::from_millis(10), Box::new(|_| {}));
        assert!(matches!(result, Err(ProviderError::Other(_))));
    }
}
