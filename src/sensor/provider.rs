//! Capability interface implemented by every sensor source.
//!
//! A provider is push based: the session hands it an interval and a callback,
//! and the provider invokes the callback whenever a new reading is available.
//! Once [`SensorProvider::unsubscribe`] returns, the callback must never run
//! again and no invocation may still be in flight. [`CallbackSlot`] gives
//! implementations that guarantee for free.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use uuid::Uuid;

/// Callback invoked with every new reading.
pub type SampleCallback<R> = Box<dyn FnMut(R) + Send>;

/// Opaque token identifying one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(Uuid);

impl SubscriptionHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriptionHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors raised by a provider when subscribing.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("sensor is not available on this device")]
    Unavailable,
    #[error("invalid sampling interval: {0:?}")]
    InvalidInterval(Duration),
    #[error("provider error: {0}")]
    Other(String),
}

/// A push-based source of readings of type `R`.
pub trait SensorProvider<R>: Send {
    /// Start delivering readings roughly every `interval`.
    fn subscribe(
        &mut self,
        interval: Duration,
        callback: SampleCallback<R>,
    ) -> Result<SubscriptionHandle, ProviderError>;

    /// Stop the subscription. Unknown handles are ignored.
    fn unsubscribe(&mut self, handle: SubscriptionHandle);
}

/// Location accuracy tiers, lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Accuracy {
    Lowest,
    Low,
    #[default]
    Balanced,
    High,
    Highest,
    /// Highest precision plus sensor fusion; used while recording.
    BestForNavigation,
}

/// A provider of position fixes.
pub trait LocationProvider: SensorProvider<crate::sensor::LocationFix> {
    /// Accuracy applied to subscriptions made after this call.
    fn set_accuracy(&mut self, accuracy: Accuracy);
}

/// Shared, clearable home for a callback.
///
/// Producers call [`CallbackSlot::deliver`]; the subscriber side calls
/// [`CallbackSlot::clear`]. The callback runs under the slot's lock, so after
/// `clear` returns there is no delivery in progress and none will follow.
pub struct CallbackSlot<R> {
    inner: Arc<Mutex<Option<SampleCallback<R>>>>,
}

impl<R> Clone for CallbackSlot<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R> CallbackSlot<R> {
    pub fn new(callback: SampleCallback<R>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(callback))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<SampleCallback<R>>> {
        // A panicking callback must not wedge unsubscription.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Invoke the callback. Returns false once the slot has been cleared.
    pub fn deliver(&self, reading: R) -> bool {
        match self.lock().as_mut() {
            Some(callback) => {
                callback(reading);
                true
            }
            None => false,
        }
    }

    /// Drop the callback, waiting for any in-flight delivery to finish.
    pub fn clear(&self) {
        self.lock().take();
    }

    pub fn is_active(&self) -> bool {
        self.lock().is_some()
    }
}
