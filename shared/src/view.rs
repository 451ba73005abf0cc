use serde::{Deserialize, Serialize};

use crate::contacts::{support_network, Contact, ContactDraft, SupportEntry, SUPPORT_VISIBLE_LIMIT};
use crate::countdown::Phase;
use crate::directory::{Availability, EXPERTS, HELPLINES, RESOURCES};
use crate::geo::{format_distance, format_walking_time, GeoPoint};
use crate::geocode::CanonicalLocation;
use crate::greeting::safety_tip;
use crate::model::{Model, PlaceDraft, Screen, SettingsToggles, Toast, ToastKind};
use crate::places::{nearest_police, SafePlace};
use crate::sos::{AlertStatus, ContactPicker};
use crate::{AppError, ErrorSeverity, ONBOARDING_PAGES, TOAST_DURATION_MS};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LocationView {
    pub latitude: f64,
    pub longitude: f64,
    pub dms: String,
    pub address: Option<String>,
    pub maps_link: String,
    pub updated_at: String,
}

impl From<&CanonicalLocation> for LocationView {
    fn from(loc: &CanonicalLocation) -> Self {
        Self {
            latitude: loc.latitude,
            longitude: loc.longitude,
            dms: loc.dms.clone(),
            address: loc.address.clone(),
            maps_link: format!(
                "https://www.google.com/maps/search/?api=1&query={},{}",
                loc.latitude, loc.longitude
            ),
            updated_at: loc.timestamp.clone(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SupportNetworkView {
    pub entries: Vec<SupportEntry>,
    pub show_all: bool,
    pub hidden_count: usize,
}

impl SupportNetworkView {
    fn new(contacts: &[Contact], show_all: bool) -> Self {
        let mut entries = support_network(contacts);
        let hidden_count = entries.len().saturating_sub(SUPPORT_VISIBLE_LIMIT);
        if !show_all {
            entries.truncate(SUPPORT_VISIBLE_LIMIT);
        }
        Self {
            entries,
            show_all,
            hidden_count,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DashboardView {
    pub greeting: String,
    pub safety_tip: String,
    pub display_name: Option<String>,
    pub location: Option<LocationView>,
    pub support: SupportNetworkView,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ContactsView {
    pub contacts: Vec<Contact>,
    pub loading: bool,
    pub saving: bool,
    pub form: Option<ContactDraft>,
    pub support: SupportNetworkView,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PlaceRow {
    pub id: String,
    pub name: String,
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_police: bool,
    pub distance: String,
    pub walking_time: String,
}

impl PlaceRow {
    fn new(place: &SafePlace, origin: Option<GeoPoint>) -> Self {
        let distance = place.distance_from(origin);
        Self {
            id: place.id.clone(),
            name: place.name.clone(),
            address: place.address.clone(),
            latitude: place.point.map(GeoPoint::lat),
            longitude: place.point.map(GeoPoint::lon),
            is_police: place.is_police(),
            distance: format_distance(distance),
            walking_time: format_walking_time(distance),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PlaceDraftView {
    pub latitude: f64,
    pub longitude: f64,
    pub name: String,
    pub address: Option<String>,
    pub resolving_address: bool,
    pub saving: bool,
}

impl From<&PlaceDraft> for PlaceDraftView {
    fn from(draft: &PlaceDraft) -> Self {
        Self {
            latitude: draft.point.lat(),
            longitude: draft.point.lon(),
            name: draft.name.clone(),
            address: draft.address.clone(),
            resolving_address: draft.resolving_address,
            saving: draft.saving,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SafeSpacesView {
    pub places: Vec<PlaceRow>,
    pub nearest_police: Option<PlaceRow>,
    pub location: Option<LocationView>,
    pub locating: bool,
    pub loading: bool,
    pub watching: bool,
    pub can_navigate: bool,
    pub draft: Option<PlaceDraftView>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PickerRow {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub initials: String,
    pub selected: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PickerView {
    pub loading: bool,
    pub contacts: Vec<PickerRow>,
    pub selected_count: usize,
}

impl PickerView {
    fn new(picker: &ContactPicker) -> Option<Self> {
        match picker {
            ContactPicker::Closed => None,
            ContactPicker::Loading => Some(Self {
                loading: true,
                contacts: Vec::new(),
                selected_count: 0,
            }),
            ContactPicker::Ready { contacts, selected } => Some(Self {
                loading: false,
                contacts: contacts
                    .iter()
                    .map(|c| PickerRow {
                        id: c.id.clone(),
                        name: c.name.clone(),
                        phone: c.phone.clone(),
                        initials: c.initials.clone(),
                        selected: selected.contains(&c.id),
                    })
                    .collect(),
                selected_count: selected.len(),
            }),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SosView {
    pub phase: Phase,
    pub remaining: Option<u8>,
    pub triggered: bool,
    pub message: String,
    pub location: Option<LocationView>,
    pub locating: bool,
    pub alert: AlertStatus,
    pub picker: Option<PickerView>,
    pub sending_to_contacts: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HelplineRow {
    pub id: String,
    pub title: String,
    pub number: String,
    pub hours: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExpertRow {
    pub initials: String,
    pub name: String,
    pub field: String,
    pub experience: String,
    pub consultations: String,
    pub available: bool,
    pub languages: String,
    pub rating: f32,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceRow {
    pub id: String,
    pub title: String,
    pub kind: String,
    pub downloads: String,
    pub tag: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LegalSupportView {
    pub helplines: Vec<HelplineRow>,
    pub experts: Vec<ExpertRow>,
    pub resources: Vec<ResourceRow>,
}

impl LegalSupportView {
    fn new() -> Self {
        Self {
            helplines: HELPLINES
                .iter()
                .map(|h| HelplineRow {
                    id: h.id.into(),
                    title: h.title.into(),
                    number: h.number.into(),
                    hours: h.hours.into(),
                })
                .collect(),
            experts: EXPERTS
                .iter()
                .map(|e| ExpertRow {
                    initials: e.initials.into(),
                    name: e.name.into(),
                    field: e.field.into(),
                    experience: e.experience.into(),
                    consultations: e.consultations.into(),
                    available: e.status == Availability::Available,
                    languages: e.languages.into(),
                    rating: e.rating,
                })
                .collect(),
            resources: RESOURCES
                .iter()
                .map(|r| ResourceRow {
                    id: r.id.into(),
                    title: r.title.into(),
                    kind: r.kind.into(),
                    downloads: r.downloads.into(),
                    tag: r.tag.into(),
                })
                .collect(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "screen", rename_all = "snake_case")]
pub enum ScreenView {
    Splash,
    Onboarding {
        page: u8,
        pages: u8,
        is_last: bool,
    },
    Login {
        email: String,
        busy: bool,
    },
    Signup {
        busy: bool,
    },
    VerifyOtp {
        email: Option<String>,
        phone: Option<String>,
        busy: bool,
    },
    Dashboard(DashboardView),
    Contacts(ContactsView),
    SafeSpaces(SafeSpacesView),
    Sos(SosView),
    LegalSupport(LegalSupportView),
    Settings {
        toggles: SettingsToggles,
        cancel_pin: String,
        display_name: Option<String>,
        email: Option<String>,
        busy: bool,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UserFacingError {
    pub message: String,
    pub is_transient: bool,
    pub is_retryable: bool,
    pub error_code: String,
}

impl From<&AppError> for UserFacingError {
    fn from(e: &AppError) -> Self {
        Self {
            message: e.user_facing_message(),
            is_transient: e.severity == ErrorSeverity::Transient,
            is_retryable: e.is_retryable(),
            error_code: e.code().to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ToastView {
    pub message: String,
    pub kind: ToastKind,
    pub duration_ms: u64,
}

impl From<&Toast> for ToastView {
    fn from(t: &Toast) -> Self {
        Self {
            message: t.message.clone(),
            kind: t.kind,
            duration_ms: TOAST_DURATION_MS,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ViewModel {
    pub screen: ScreenView,
    pub error: Option<UserFacingError>,
    pub toast: Option<ToastView>,
    pub is_signed_in: bool,
    pub can_go_back: bool,
}

impl ViewModel {
    #[must_use]
    pub fn new(model: &Model) -> Self {
        Self {
            screen: screen_view(model),
            error: model.active_error.as_ref().map(UserFacingError::from),
            toast: model.active_toast.as_ref().map(ToastView::from),
            is_signed_in: model.is_signed_in(),
            can_go_back: !model.nav_stack.is_empty(),
        }
    }
}

fn display_name(model: &Model) -> Option<String> {
    model.session.user.as_ref().and_then(|u| u.display_name())
}

fn screen_view(model: &Model) -> ScreenView {
    let canonical = model.location.canonical.as_ref().map(LocationView::from);

    match model.screen {
        Screen::Splash => ScreenView::Splash,
        Screen::Onboarding { page } => ScreenView::Onboarding {
            page,
            pages: ONBOARDING_PAGES,
            is_last: page + 1 >= ONBOARDING_PAGES,
        },
        Screen::Login => ScreenView::Login {
            email: model.auth.login.email.clone(),
            busy: model.auth.busy,
        },
        Screen::Signup => ScreenView::Signup {
            busy: model.auth.busy,
        },
        Screen::VerifyOtp => {
            let pending = model.auth.pending.as_ref();
            ScreenView::VerifyOtp {
                email: pending.and_then(|p| p.email.clone()),
                phone: pending.and_then(|p| p.phone.clone()),
                busy: model.auth.busy,
            }
        }
        Screen::Dashboard => ScreenView::Dashboard(DashboardView {
            greeting: model.greeting.unwrap_or("Welcome back").to_string(),
            safety_tip: safety_tip(model.safety_tip).to_string(),
            display_name: display_name(model),
            location: canonical,
            support: SupportNetworkView::new(&model.contacts.list, model.contacts.show_all_support),
        }),
        Screen::Contacts => ScreenView::Contacts(ContactsView {
            contacts: model.contacts.list.clone(),
            loading: model.contacts.loading,
            saving: model.contacts.saving,
            form: model.contacts.form.clone(),
            support: SupportNetworkView::new(&model.contacts.list, model.contacts.show_all_support),
        }),
        Screen::SafeSpaces => {
            let origin = model.location.current_point();
            let places = &model.safe_places.places;
            ScreenView::SafeSpaces(SafeSpacesView {
                places: places.iter().map(|p| PlaceRow::new(p, origin)).collect(),
                nearest_police: nearest_police(places, origin).map(|(p, _)| PlaceRow::new(p, origin)),
                location: canonical,
                locating: model.location.locating,
                loading: model.safe_places.loading,
                watching: model.safe_places.watching,
                can_navigate: !places.is_empty(),
                draft: model.safe_places.draft.as_ref().map(PlaceDraftView::from),
            })
        }
        Screen::Sos => {
            let sos = &model.sos;
            ScreenView::Sos(SosView {
                phase: sos.countdown.phase(),
                remaining: sos.countdown.remaining(),
                triggered: sos.countdown.is_triggered(),
                message: sos.message(),
                location: sos.snapshot.as_ref().map(LocationView::from),
                locating: sos.locating,
                alert: sos.alert,
                picker: PickerView::new(&sos.picker),
                sending_to_contacts: sos.sending_to_contacts,
            })
        }
        Screen::LegalSupport => ScreenView::LegalSupport(LegalSupportView::new()),
        Screen::Settings => ScreenView::Settings {
            toggles: model.settings.toggles,
            cancel_pin: model.settings.cancel_pin.clone(),
            display_name: display_name(model),
            email: model
                .session
                .user
                .as_ref()
                .and_then(|u| u.email())
                .map(str::to_string),
            busy: model.auth.busy,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use serde_json::json;

    fn contact(id: &str, phone: &str) -> Contact {
        Contact::from_server(&json!({"_id": id, "full_name": id, "phone": phone})).unwrap()
    }

    #[test]
    fn test_support_network_is_capped_until_expanded() {
        let contacts: Vec<_> = (0..6).map(|i| contact(&format!("c{i}"), "0300")).collect();
        let collapsed = SupportNetworkView::new(&contacts, false);
        assert_eq!(collapsed.entries.len(), SUPPORT_VISIBLE_LIMIT);
        assert_eq!(collapsed.hidden_count, 3);

        let expanded = SupportNetworkView::new(&contacts, true);
        assert_eq!(expanded.entries.len(), 8);
    }

    #[test]
    fn test_onboarding_last_page() {
        let mut model = Model::default();
        model.screen = Screen::Onboarding { page: 5 };
        let ScreenView::Onboarding { is_last, pages, .. } = ViewModel::new(&model).screen else {
            panic!("expected onboarding");
        };
        assert!(is_last);
        assert_eq!(pages, 6);
    }

    #[test]
    fn test_error_and_toast_are_projected() {
        let mut model = Model::default();
        model.set_error(AppError::new(ErrorKind::Network, "Network error"));
        model.active_toast = Some(Toast {
            message: "Saved".into(),
            kind: ToastKind::Success,
        });
        let view = ViewModel::new(&model);
        let error = view.error.unwrap();
        assert!(error.is_retryable);
        assert_eq!(error.error_code, ErrorKind::Network.code());
        assert_eq!(view.toast.unwrap().duration_ms, TOAST_DURATION_MS);
    }

    #[test]
    fn test_legal_support_lists_directory() {
        let view = LegalSupportView::new();
        assert_eq!(view.helplines.len(), 4);
        assert_eq!(view.experts.len(), 3);
        assert!(!view.experts[1].available);
        assert_eq!(view.resources[1].id, "file_an_fir");
    }

    #[test]
    fn test_screen_wire_tag() {
        let json = serde_json::to_value(ScreenView::Splash).unwrap();
        assert_eq!(json, json!({"screen": "splash"}));
    }
}
