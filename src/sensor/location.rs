//! GPS adapter: permission gate plus location tracking.
//!
//! The tracker asks for foreground location permission, pins the provider to
//! its highest-precision tier and converts each fix into a [`GpsSample`]
//! (speed in km/h) before handing it on.

use crate::sensor::provider::{Accuracy, LocationProvider, ProviderError, SubscriptionHandle};
use crate::sensor::types::{GpsSample, LocationFix};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

/// Outcome of a permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
    /// The user dismissed the prompt without answering.
    Undetermined,
}

impl PermissionStatus {
    pub fn is_granted(&self) -> bool {
        matches!(self, PermissionStatus::Granted)
    }
}

/// Source of the foreground location permission.
#[async_trait]
pub trait LocationPermission: Send + Sync {
    async fn request_foreground(&self) -> PermissionStatus;
}

/// Permission source with a fixed answer.
///
/// Desktop targets have no runtime location prompt, so the recorder uses
/// `StaticPermission::granted()` there.
#[derive(Debug, Clone, Copy)]
pub struct StaticPermission(pub PermissionStatus);

impl StaticPermission {
    pub fn granted() -> Self {
        Self(PermissionStatus::Granted)
    }

    pub fn denied() -> Self {
        Self(PermissionStatus::Denied)
    }
}

#[async_trait]
impl LocationPermission for StaticPermission {
    async fn request_foreground(&self) -> PermissionStatus {
        self.0
    }
}

/// Why GPS tracking could not start.
#[derive(Debug, thiserror::Error)]
pub enum LocationError {
    #[error("location permission not granted ({0:?})")]
    PermissionDenied(PermissionStatus),
    #[error("location tracking is already running")]
    AlreadyTracking,
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Accuracy tier used for every recording session.
pub const RECORDING_ACCURACY: Accuracy = Accuracy::BestForNavigation;

/// Couples a location provider with its permission source.
pub struct LocationTracker {
    provider: Box<dyn LocationProvider>,
    permission: Box<dyn LocationPermission>,
    watch: Option<SubscriptionHandle>,
}

impl LocationTracker {
    pub fn new(
        provider: Box<dyn LocationProvider>,
        permission: Box<dyn LocationPermission>,
    ) -> Self {
        Self {
            provider,
            permission,
            watch: None,
        }
    }

    pub fn is_tracking(&self) -> bool {
        self.watch.is_some()
    }

    /// Request permission and start watching the position.
    ///
    /// No retry is attempted on denial; the caller decides what to surface.
    pub async fn start<F>(&mut self, interval: Duration, mut on_sample: F) -> Result<(), LocationError>
    where
        F: FnMut(GpsSample) + Send + 'static,
    {
        if self.watch.is_some() {
            return Err(LocationError::AlreadyTracking);
        }

        let status = self.permission.request_foreground().await;
        if !status.is_granted() {
            warn!(?status, "Foreground location permission not granted");
            return Err(LocationError::PermissionDenied(status));
        }

        self.provider.set_accuracy(RECORDING_ACCURACY);
        let handle = self.provider.subscribe(
            interval,
            Box::new(move |fix: LocationFix| on_sample(GpsSample::from(fix))),
        )?;
        debug!(%handle, ?interval, "Location tracking started");
        self.watch = Some(handle);
        Ok(())
    }

    /// Stop watching. A no-op when not tracking.
    pub fn stop(&mut self) {
        if let Some(handle) = self.watch.take() {
            self.provider.unsubscribe(handle);
            debug!(%handle, "Location tracking stopped");
        }
    }
}

impl Drop for LocationTracker {
    fn drop(&mut self) {
        self.stop();
    }
}
