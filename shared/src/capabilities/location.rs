use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geo::{CoordinateError, GeoPoint};
use crate::geocode::Placemark;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum PermissionState {
    #[default]
    Undetermined,
    Denied,
    Granted,
}

impl PermissionState {
    #[must_use]
    pub const fn is_granted(self) -> bool {
        matches!(self, Self::Granted)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Accuracy {
    Low,
    Balanced,
    #[default]
    High,
}

/// A position reported by the device. `timestamp_ms` is the shell's clock
/// at the moment of the fix.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PositionFix {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub accuracy_m: Option<f64>,
    pub timestamp_ms: u64,
}

impl PositionFix {
    pub fn point(&self) -> Result<GeoPoint, CoordinateError> {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum LocationOperation {
    RequestPermission,
    CurrentPosition { accuracy: Accuracy },
    ReverseGeocode { latitude: f64, longitude: f64 },
    StartWatching {
        distance_interval_m: f64,
        time_interval_ms: u64,
    },
    StopWatching,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum LocationOutput {
    Permission(PermissionState),
    Position(PositionFix),
    Placemarks(Vec<Placemark>),
    Watching,
    Stopped,
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum LocationError {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("location services are disabled")]
    ServicesDisabled,

    #[error("position unavailable: {message}")]
    Unavailable { message: String },

    #[error("reverse geocoding failed: {message}")]
    GeocodeFailed { message: String },

    #[error("location request timed out")]
    Timeout,

    #[error("unexpected location output")]
    UnexpectedOutput,
}

pub type LocationResult = Result<LocationOutput, LocationError>;

impl Operation for LocationOperation {
    type Output = LocationResult;
}

pub struct Location<Ev> {
    context: CapabilityContext<LocationOperation, Ev>,
}

impl<Ev> Capability<Ev> for Location<Ev> {
    type Operation = LocationOperation;
    type MappedSelf<MappedEv> = Location<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Location::new(self.context.map_event(f))
    }
}

impl<Ev> Location<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<LocationOperation, Ev>) -> Self {
        Self { context }
    }

    fn request<F>(&self, operation: LocationOperation, callback: F)
    where
        F: FnOnce(LocationResult) -> Ev + Send + 'static,
    {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let result = ctx.request_from_shell(operation).await;
            ctx.update_app(callback(result));
        });
    }

    /// Foreground permission. Anything other than `Granted` is reported as
    /// `Err(PermissionDenied)`.
    pub fn request_permission<F>(&self, callback: F)
    where
        F: FnOnce(Result<(), LocationError>) -> Ev + Send + 'static,
    {
        self.request(LocationOperation::RequestPermission, move |result| {
            callback(match result {
                Ok(LocationOutput::Permission(state)) if state.is_granted() => Ok(()),
                Ok(LocationOutput::Permission(_)) => Err(LocationError::PermissionDenied),
                Ok(_) => Err(LocationError::UnexpectedOutput),
                Err(e) => Err(e),
            })
        });
    }

    pub fn current_position<F>(&self, accuracy: Accuracy, callback: F)
    where
        F: FnOnce(Result<PositionFix, LocationError>) -> Ev + Send + 'static,
    {
        self.request(LocationOperation::CurrentPosition { accuracy }, move |result| {
            callback(match result {
                Ok(LocationOutput::Position(fix)) => Ok(fix),
                Ok(_) => Err(LocationError::UnexpectedOutput),
                Err(e) => Err(e),
            })
        });
    }

    pub fn reverse_geocode<F>(&self, point: GeoPoint, callback: F)
    where
        F: FnOnce(Result<Vec<Placemark>, LocationError>) -> Ev + Send + 'static,
    {
        let operation = LocationOperation::ReverseGeocode {
            latitude: point.lat(),
            longitude: point.lon(),
        };
        self.request(operation, move |result| {
            callback(match result {
                Ok(LocationOutput::Placemarks(placemarks)) => Ok(placemarks),
                Ok(_) => Err(LocationError::UnexpectedOutput),
                Err(e) => Err(e),
            })
        });
    }

    /// Starts the shell's position watch. Fixes then arrive as
    /// `Event::PositionChanged` until `stop_watching`.
    pub fn start_watching<F>(&self, distance_interval_m: f64, time_interval_ms: u64, callback: F)
    where
        F: FnOnce(LocationResult) -> Ev + Send + 'static,
    {
        self.request(
            LocationOperation::StartWatching {
                distance_interval_m,
                time_interval_ms,
            },
            callback,
        );
    }

    pub fn stop_watching(&self) {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            ctx.notify_shell(LocationOperation::StopWatching).await;
        });
    }
}
