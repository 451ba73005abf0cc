use serde_json::Value;
use tracing::{debug, info, warn};

use super::App;
use crate::capabilities::{Capabilities, HttpMethod, LocationError};
use crate::event::{ApiCall, ApiPurpose, Event, LaunchAction, LocationPurpose};
use crate::geo::GeoPoint;
use crate::geocode::{first_address, Placemark};
use crate::model::{Model, PlaceDraft};
use crate::places::{create_body, default_place_name, nearby_path, top_target, SafePlace};
use crate::{get_current_time_ms, AppError, ErrorKind};

impl App {
    pub(super) fn open_safe_spaces(model: &mut Model, caps: &Capabilities) {
        model.safe_places.draft = None;
        model.safe_places.synced = false;
        Self::load(caps, model.session.safe_places_key());
        Self::locate(model, caps, LocationPurpose::SafeSpaces, true);
    }

    pub(super) fn places_cache_loaded(model: &mut Model, cached: Option<Value>) {
        if model.safe_places.synced {
            debug!("safe places cache superseded by server list");
            return;
        }
        if let Some(cached) = cached {
            model.safe_places.places = SafePlace::list_from_server(&cached);
            debug!(count = model.safe_places.places.len(), "safe places restored from cache");
        }
    }

    pub(super) fn fetch_nearby(model: &mut Model, caps: &Capabilities, origin: GeoPoint) {
        model.safe_places.last_fetch_ms = Some(get_current_time_ms());
        model.safe_places.loading = true;
        let path = nearby_path(origin, model.config.safe_place_radius_m);
        Self::send_api(model, caps, ApiCall::get(ApiPurpose::ListSafePlaces, path));
    }

    pub(super) fn places_loaded(
        model: &mut Model,
        caps: &Capabilities,
        result: Result<Value, AppError>,
    ) {
        model.safe_places.loading = false;
        match result {
            Ok(body) => {
                model.safe_places.places = SafePlace::list_from_server(&body);
                model.safe_places.synced = true;
                debug!(count = model.safe_places.places.len(), "nearby safe places loaded");
                Self::persist_places(model, caps);
            }
            Err(e) => warn!(error = %e, "nearby safe places unavailable"),
        }
    }

    fn persist_places(model: &Model, caps: &Capabilities) {
        let cached = Value::Array(
            model
                .safe_places
                .places
                .iter()
                .map(SafePlace::to_server)
                .collect(),
        );
        Self::store_json(caps, model.session.safe_places_key(), &cached);
    }

    pub(super) fn map_tapped(model: &mut Model, caps: &Capabilities, latitude: f64, longitude: f64) {
        let point = match GeoPoint::new(latitude, longitude) {
            Ok(point) => point,
            Err(e) => {
                model.set_error(e.into());
                return;
            }
        };
        model.safe_places.draft = Some(PlaceDraft {
            point,
            name: default_place_name(model.safe_places.places.len()),
            address: None,
            resolving_address: true,
            saving: false,
        });
        caps.location.reverse_geocode(point, move |result| Event::DraftAddressResolved {
            point,
            result: Box::new(result),
        });
    }

    pub(super) fn draft_address_resolved(
        model: &mut Model,
        point: GeoPoint,
        result: Result<Vec<Placemark>, LocationError>,
    ) {
        let Some(draft) = model.safe_places.draft.as_mut().filter(|d| d.point == point) else {
            debug!("address for a discarded draft");
            return;
        };
        draft.resolving_address = false;
        draft.address = match result {
            Ok(placemarks) => first_address(&placemarks),
            Err(e) => {
                warn!(error = %e, "no address for tapped point");
                None
            }
        };
    }

    pub(super) fn save_place_draft(model: &mut Model, caps: &Capabilities) {
        let existing = model.safe_places.places.len();
        let Some(draft) = model.safe_places.draft.as_mut() else {
            return;
        };
        if draft.saving {
            return;
        }
        draft.saving = true;

        let name = match draft.name.trim() {
            "" => default_place_name(existing),
            name => name.to_string(),
        };
        let body = create_body(&name, draft.address.as_deref(), draft.point);
        Self::send_api(
            model,
            caps,
            ApiCall::post(ApiPurpose::CreateSafePlace, "/api/safeplaces", body),
        );
    }

    pub(super) fn place_created(
        model: &mut Model,
        caps: &Capabilities,
        result: Result<Value, AppError>,
    ) {
        match result {
            Ok(body) => {
                model.safe_places.draft = None;
                match SafePlace::from_server(&body) {
                    Some(place) => {
                        info!("safe place created");
                        model.safe_places.places.insert(0, place);
                        Self::persist_places(model, caps);
                    }
                    None => warn!("created safe place came back without an id"),
                }
            }
            Err(e) => {
                if let Some(draft) = model.safe_places.draft.as_mut() {
                    draft.saving = false;
                }
                let message = if e.http_status().is_some() {
                    format!("Save failed: {}", e.message)
                } else {
                    "Failed to create place".to_string()
                };
                model.set_error(AppError::user_visible(e.kind, message).with_internal(e.to_string()));
            }
        }
    }

    pub(super) fn delete_place(model: &mut Model, caps: &Capabilities, id: String) {
        let path = format!("/api/safeplaces/{id}");
        Self::send_api(
            model,
            caps,
            ApiCall::new(ApiPurpose::DeleteSafePlace { id }, HttpMethod::Delete, path),
        );
    }

    pub(super) fn place_deleted(
        model: &mut Model,
        caps: &Capabilities,
        id: &str,
        result: Result<Value, AppError>,
    ) {
        match result {
            Ok(_) => {
                model.safe_places.places.retain(|p| p.id != id);
                Self::persist_places(model, caps);
            }
            Err(e) => {
                let message = if e.http_status().is_some() {
                    "Could not remove place"
                } else {
                    "Failed to remove place"
                };
                model.set_error(AppError::user_visible(e.kind, message).with_internal(e.to_string()));
            }
        }
    }

    pub(super) fn navigate_to_target(model: &mut Model, caps: &Capabilities) {
        let origin = model.location.current_point();
        let target = top_target(&model.safe_places.places, origin).and_then(|place| place.point);
        match target {
            Some(point) => {
                caps.launcher
                    .open(point.directions_url(model.config.platform), |result| Event::Launched {
                        action: LaunchAction::Directions,
                        result: Box::new(result),
                    });
            }
            None => model.set_error(AppError::user_visible(
                ErrorKind::NotFound,
                "No navigation target available.",
            )),
        }
    }
}
