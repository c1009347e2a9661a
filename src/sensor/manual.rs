//! Push-driven provider fed by its owner.
//!
//! Useful when readings arrive from somewhere the recorder does not control
//! (a host application, a replayed log) and for deterministic simulation in
//! tests: every [`ManualEmitter::emit`] call is delivered synchronously to all
//! active subscribers, in call order.

use crate::sensor::provider::{
    Accuracy, CallbackSlot, LocationProvider, ProviderError, SampleCallback, SensorProvider,
    SubscriptionHandle,
};
use crate::sensor::types::LocationFix;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

struct Subscription<R> {
    handle: SubscriptionHandle,
    interval: Duration,
    slot: CallbackSlot<R>,
}

struct Shared<R> {
    subscriptions: Vec<Subscription<R>>,
    requested_intervals: Vec<Duration>,
    accuracy: Accuracy,
    available: bool,
}

fn lock<R>(shared: &Mutex<Shared<R>>) -> MutexGuard<'_, Shared<R>> {
    shared.lock().unwrap_or_else(|e| e.into_inner())
}

/// A provider whose readings are pushed in through a [`ManualEmitter`].
pub struct ManualProvider<R> {
    shared: Arc<Mutex<Shared<R>>>,
}

/// Cloneable handle used to feed and inspect a [`ManualProvider`].
pub struct ManualEmitter<R> {
    shared: Arc<Mutex<Shared<R>>>,
}

impl<R> Clone for ManualEmitter<R> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<R> ManualProvider<R> {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared {
                subscriptions: Vec::new(),
                requested_intervals: Vec::new(),
                accuracy: Accuracy::default(),
                available: true,
            })),
        }
    }

    /// A provider that refuses every subscription, like a device without the sensor.
    pub fn unavailable() -> Self {
        let provider = Self::new();
        lock(&provider.shared).available = false;
        provider
    }

    pub fn emitter(&self) -> ManualEmitter<R> {
        ManualEmitter {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<R> Default for ManualProvider<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Clone> ManualEmitter<R> {
    /// Deliver a reading to every active subscriber. Returns how many received it.
    pub fn emit(&self, reading: R) -> usize {
        // Deliver outside the provider lock so a callback may inspect the emitter.
        let slots: Vec<CallbackSlot<R>> = lock(&self.shared)
            .subscriptions
            .iter()
            .map(|s| s.slot.clone())
            .collect();

        slots
            .iter()
            .filter(|slot| slot.deliver(reading.clone()))
            .count()
    }
}

impl<R> ManualEmitter<R> {
    pub fn active_subscriptions(&self) -> usize {
        lock(&self.shared).subscriptions.len()
    }

    /// Interval of the most recent subscription, if any was ever made.
    pub fn last_interval(&self) -> Option<Duration> {
        lock(&self.shared).requested_intervals.last().copied()
    }

    /// Every interval ever requested, in order.
    pub fn requested_intervals(&self) -> Vec<Duration> {
        lock(&self.shared).requested_intervals.clone()
    }

    pub fn accuracy(&self) -> Accuracy {
        lock(&self.shared).accuracy
    }

    /// Interval of each live subscription.
    pub fn active_intervals(&self) -> Vec<Duration> {
        lock(&self.shared)
            .subscriptions
            .iter()
            .map(|s| s.interval)
            .collect()
    }
}

impl<R: Send + 'static> SensorProvider<R> for ManualProvider<R> {
    fn subscribe(
        &mut self,
        interval: Duration,
        callback: SampleCallback<R>,
    ) -> Result<SubscriptionHandle, ProviderError> {
        let mut shared = lock(&self.shared);
        if !shared.available {
            return Err(ProviderError::Unavailable);
        }
        if interval.is_zero() {
            return Err(ProviderError::InvalidInterval(interval));
        }

        let handle = SubscriptionHandle::new();
        shared.requested_intervals.push(interval);
        shared.subscriptions.push(Subscription {
            handle,
            interval,
            slot: CallbackSlot::new(callback),
        });
        Ok(handle)
    }

    fn unsubscribe(&mut self, handle: SubscriptionHandle) {
        let mut removed = None;
        {
            let mut shared = lock(&self.shared);
            if let Some(i) = shared.subscriptions.iter().position(|s| s.handle == handle) {
                removed = Some(shared.subscriptions.remove(i));
            }
        }
        if let Some(subscription) = removed {
            subscription.slot.clear();
        }
    }
}

impl LocationProvider for ManualProvider<LocationFix> {
    fn set_accuracy(&mut self, accuracy: Accuracy) {
        lock(&self.shared).accuracy = accuracy;
    }
}
