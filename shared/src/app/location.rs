use tracing::{debug, info, warn};

use super::App;
use crate::capabilities::{Accuracy, Capabilities, KvResult, LocationError, LocationResult, PositionFix};
use crate::event::{Event, GeocodeRequest, LocationPurpose};
use crate::geo::GeoPoint;
use crate::geocode::{first_address, CanonicalLocation, Placemark};
use crate::model::{Model, Screen};
use crate::session::StorageKey;
use crate::{get_current_time_ms, AppError};

impl App {
    /// Permission, then a high-accuracy fix, then the throttled reverse
    /// geocode and save.
    pub(super) fn locate(
        model: &mut Model,
        caps: &Capabilities,
        purpose: LocationPurpose,
        force: bool,
    ) {
        model.location.locating = true;
        caps.location.request_permission(move |result| Event::PermissionResolved {
            purpose,
            force,
            result,
        });
    }

    pub(super) fn permission_resolved(
        model: &mut Model,
        caps: &Capabilities,
        purpose: LocationPurpose,
        force: bool,
        result: Result<(), LocationError>,
    ) {
        match result {
            Ok(()) => caps
                .location
                .current_position(Accuracy::High, move |result| Event::PositionResolved {
                    purpose,
                    force,
                    result: Box::new(result),
                }),
            Err(e) => {
                warn!(?purpose, error = %e, "location permission not granted");
                model.set_error(e.into());
                Self::location_failed(model, caps, purpose);
            }
        }
    }

    fn location_failed(model: &mut Model, caps: &Capabilities, purpose: LocationPurpose) {
        model.location.locating = false;
        if purpose == LocationPurpose::Sos {
            Self::sos_location_settled(model, caps, None);
        }
    }

    pub(super) fn position_resolved(
        model: &mut Model,
        caps: &Capabilities,
        purpose: LocationPurpose,
        force: bool,
        result: Result<PositionFix, LocationError>,
    ) {
        let fix = match result {
            Ok(fix) => fix,
            Err(e) => {
                warn!(?purpose, error = %e, "no position fix");
                // The SOS screen carries on without a location.
                if purpose != LocationPurpose::Sos {
                    model.set_error(e.into());
                }
                Self::location_failed(model, caps, purpose);
                return;
            }
        };
        let point = match fix.point() {
            Ok(point) => point,
            Err(e) => {
                warn!(?purpose, error = %e, "device reported an invalid position");
                if purpose != LocationPurpose::Sos {
                    model.set_error(AppError::from(e));
                }
                Self::location_failed(model, caps, purpose);
                return;
            }
        };
        model.location.position = Some(fix);

        if purpose == LocationPurpose::SafeSpaces && model.screen == Screen::SafeSpaces {
            Self::fetch_nearby(model, caps, point);
            if !model.safe_places.watching {
                model.safe_places.watching = true;
                caps.location.start_watching(
                    model.config.watch_distance_interval_m,
                    model.config.watch_time_interval_ms,
                    |result| Event::WatchStarted(Box::new(result)),
                );
            }
        }

        Self::geocode_if_due(model, caps, point, fix.timestamp_ms, purpose, force);
    }

    fn geocode_if_due(
        model: &mut Model,
        caps: &Capabilities,
        point: GeoPoint,
        timestamp_ms: u64,
        purpose: LocationPurpose,
        force: bool,
    ) {
        let now = get_current_time_ms();
        if !model.location.throttle.should_attempt(now, point, force) {
            debug!(?purpose, "reverse geocode throttled");
            model.location.locating = false;
            return;
        }

        model.location.throttle.record_attempt(now);
        let request = GeocodeRequest {
            point,
            timestamp_ms,
            purpose,
        };
        caps.location.reverse_geocode(point, move |result| Event::GeocodeResolved {
            request: Box::new(request),
            result: Box::new(result),
        });
    }

    pub(super) fn geocode_resolved(
        model: &mut Model,
        caps: &Capabilities,
        request: GeocodeRequest,
        result: Result<Vec<Placemark>, LocationError>,
    ) {
        let address = match result {
            Ok(placemarks) => first_address(&placemarks),
            Err(e) => {
                warn!(error = %e, "reverse geocode failed, saving coordinates only");
                None
            }
        };
        let location = CanonicalLocation::new(request.point, address, request.timestamp_ms);
        model.location.locating = false;
        model.location.canonical = Some(location.clone());
        if request.purpose == LocationPurpose::Sos {
            Self::sos_location_settled(model, caps, Some(location.clone()));
        }

        let point = request.point;
        let key = match StorageKey::CurrentLocation.kv_key() {
            Ok(key) => key,
            Err(e) => {
                warn!(error = %e, "location key rejected");
                return;
            }
        };
        let saved = serde_json::to_vec(&location)
            .map_err(|e| e.to_string())
            .and_then(|bytes| {
                key.write(&caps.kv, bytes, move |result| Event::LocationSaved {
                    point,
                    result: Box::new(result),
                })
                .map_err(|e| e.to_string())
            });
        if let Err(e) = saved {
            warn!(error = %e, "current location not saved");
        }
    }

    pub(super) fn location_saved(model: &mut Model, point: GeoPoint, result: &KvResult) {
        match result {
            Ok(_) => {
                model.location.throttle.record_saved(point);
                debug!("current location saved");
            }
            Err(e) => warn!(error = %e, "current location not saved"),
        }
    }

    /// A fix pushed by the shell's position watch.
    pub(super) fn position_changed(model: &mut Model, caps: &Capabilities, fix: PositionFix) {
        let point = match fix.point() {
            Ok(point) => point,
            Err(e) => {
                warn!(error = %e, "watch reported an invalid position");
                return;
            }
        };
        model.location.position = Some(fix);
        if !model.safe_places.watching {
            debug!("position update with no active watch");
            return;
        }

        let now = get_current_time_ms();
        let interval = model.config.nearby_refresh_interval_ms;
        let refresh_due = !matches!(
            model.safe_places.last_fetch_ms,
            Some(last) if now.saturating_sub(last) <= interval
        );
        if refresh_due {
            Self::fetch_nearby(model, caps, point);
        }
        Self::geocode_if_due(
            model,
            caps,
            point,
            fix.timestamp_ms,
            LocationPurpose::SafeSpaces,
            false,
        );
    }

    pub(super) fn watch_started(model: &mut Model, result: &LocationResult) {
        match result {
            Ok(_) => info!("position watch active"),
            Err(e) => {
                warn!(error = %e, "position watch failed to start");
                model.safe_places.watching = false;
            }
        }
    }
}
