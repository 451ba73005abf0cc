//! The update loop. Every handler lives in an `impl App` block in one of the
//! submodules, grouped by screen.

mod account;
mod api;
mod contacts;
mod location;
mod navigation;
mod safe_places;
mod sos;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::capabilities::{Capabilities, KvResult, LauncherResult, TimerId, TimerOutput};
use crate::event::{Event, LaunchAction, LocationPurpose, TimerPurpose};
use crate::model::{Model, Toast, ToastKind};
use crate::session::StorageKey;
use crate::sos::ContactPicker;
use crate::view::ViewModel;
use crate::{AppError, ErrorKind};

#[derive(Default)]
pub struct App;

impl crux_core::App for App {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
        debug!(
            event = event.name(),
            user_initiated = event.is_user_initiated(),
            "update"
        );

        match event {
            Event::AppStarted { config } => Self::start(model, caps, config.map(|c| *c)),
            Event::Navigate(screen) => Self::navigate(model, caps, screen),
            Event::Back => Self::back(model, caps),
            Event::OnboardingNext => Self::onboarding_next(model, caps),
            Event::OnboardingSkip => Self::finish_onboarding(model, caps),
            Event::DismissError => model.clear_error(),
            Event::DismissToast => Self::dismiss_toast(model, caps),

            Event::LoginSubmitted(form) => Self::submit_login(model, caps, form),
            Event::SignupSubmitted(form) => Self::submit_signup(model, caps, *form),
            Event::VerifyOtpSubmitted { code } => Self::submit_otp(model, caps, &code),
            Event::ResendOtp => Self::resend_otp(model, caps),
            Event::Logout => Self::logout(model, caps),
            Event::SettingToggled { toggle, on } => model.settings.toggles.set(toggle, on),
            Event::CancelPinChanged(input) => model.settings.set_cancel_pin(&input),
            Event::NextSafetyTip => Self::rotate_safety_tip(model, caps),

            Event::ContactFormOpened => Self::open_contact_form(model),
            Event::EditContact { id } => Self::edit_contact(model, &id),
            Event::ContactFormChanged(draft) => Self::contact_form_changed(model, *draft),
            Event::ContactFormCancelled => model.contacts.form = None,
            Event::SaveContact => Self::save_contact(model, caps),
            Event::DeleteContact { id } => Self::delete_contact(model, caps, id),
            Event::CallNumber { number } => Self::call_number(caps, number),
            Event::SupportShowAllToggled => {
                model.contacts.show_all_support = !model.contacts.show_all_support;
            }

            Event::MapTapped {
                latitude,
                longitude,
            } => Self::map_tapped(model, caps, latitude, longitude),
            Event::PlaceDraftNameChanged(name) => {
                if let Some(draft) = model.safe_places.draft.as_mut() {
                    draft.name = name;
                }
            }
            Event::SavePlaceDraft => Self::save_place_draft(model, caps),
            Event::CancelPlaceDraft => model.safe_places.draft = None,
            Event::DeletePlace { id } => Self::delete_place(model, caps, id),
            Event::NavigateToTarget => Self::navigate_to_target(model, caps),
            Event::RefreshLocation => {
                Self::locate(model, caps, LocationPurpose::Refresh, true);
            }

            Event::CancelSos => Self::cancel_sos(model, caps),
            Event::CloseSos => Self::close_sos(model, caps),
            Event::ShareWhatsApp => Self::share_whatsapp(model, caps),
            Event::ShareNative => Self::share_native(model, caps),
            Event::SmsContact { phone } => Self::sms_contact(model, caps, phone.as_deref()),
            Event::OpenContactPicker => Self::open_contact_picker(model, caps),
            Event::ContactPickerClosed => model.sos.picker = ContactPicker::Closed,
            Event::ContactToggled { id } => model.sos.picker.toggle(&id),
            Event::SendToSelectedContacts => Self::send_to_selected_contacts(model, caps),

            Event::CallHelpline { id } => Self::call_helpline(caps, &id),
            Event::OpenResource { id } => Self::open_resource(caps, &id),

            Event::PositionChanged(fix) => Self::position_changed(model, caps, fix),

            Event::ApiResponse { call, result } => Self::api_responded(model, caps, *call, *result),
            Event::SessionRefreshed { call, result } => {
                Self::session_refreshed(model, caps, *call, *result);
            }
            Event::StorageLoaded { key, result } => Self::storage_loaded(model, caps, key, *result),
            Event::StorageWritten { key, result } => Self::storage_written(&key, &result),
            Event::PermissionResolved {
                purpose,
                force,
                result,
            } => Self::permission_resolved(model, caps, purpose, force, result),
            Event::PositionResolved {
                purpose,
                force,
                result,
            } => Self::position_resolved(model, caps, purpose, force, *result),
            Event::GeocodeResolved { request, result } => {
                Self::geocode_resolved(model, caps, *request, *result);
            }
            Event::LocationSaved { point, result } => Self::location_saved(model, point, &result),
            Event::WatchStarted(result) => Self::watch_started(model, &result),
            Event::DraftAddressResolved { point, result } => {
                Self::draft_address_resolved(model, point, *result);
            }
            Event::TimerFinished { purpose, output } => {
                Self::timer_finished(model, caps, purpose, output);
            }
            Event::CallChecked { number, supported } => {
                Self::call_checked(model, caps, number, supported);
            }
            Event::WhatsAppChecked { supported } => Self::whatsapp_checked(model, caps, supported),
            Event::Launched { action, result } => Self::launched(model, caps, action, *result),
        }

        caps.render.render();
    }

    fn view(&self, model: &Model) -> ViewModel {
        ViewModel::new(model)
    }
}

// --- Timers, toasts and storage shared by every screen ---

impl App {
    fn schedule(caps: &Capabilities, id: TimerId, purpose: TimerPurpose, millis: u64) {
        caps.timer
            .start(id, millis, move |output| Event::TimerFinished { purpose, output });
    }

    fn start_timer(
        model: &mut Model,
        caps: &Capabilities,
        purpose: TimerPurpose,
        millis: u64,
    ) -> TimerId {
        let id = model.next_timer();
        Self::schedule(caps, id, purpose, millis);
        id
    }

    fn timer_finished(
        model: &mut Model,
        caps: &Capabilities,
        purpose: TimerPurpose,
        output: TimerOutput,
    ) {
        let Some(id) = output.fired() else {
            debug!(timer = %output.id(), "timer cancelled");
            return;
        };

        match purpose {
            TimerPurpose::Splash => Self::splash_elapsed(model, caps),
            TimerPurpose::Onboarding => {
                if model.onboarding_timer == Some(id) {
                    model.onboarding_timer = None;
                    Self::onboarding_next(model, caps);
                }
            }
            TimerPurpose::CountdownTick => Self::countdown_tick(model, caps, id),
            TimerPurpose::DispatchGap => {
                if model.sos.gap_timer == Some(id) {
                    model.sos.gap_timer = None;
                    Self::dispatch_next(model, caps);
                }
            }
            TimerPurpose::SafetyTip => {
                if model.tip_timer == Some(id) {
                    model.tip_timer = None;
                    Self::rotate_safety_tip(model, caps);
                }
            }
            TimerPurpose::Toast => {
                if model.toast_timer == Some(id) {
                    model.toast_timer = None;
                    model.active_toast = None;
                }
            }
        }
    }

    fn launched(model: &mut Model, caps: &Capabilities, action: LaunchAction, result: LauncherResult) {
        let failure = match result {
            Ok(_) => None,
            Err(e) => {
                warn!(?action, error = %e, "launcher request failed");
                Some(e)
            }
        };
        let failed = failure.is_some();
        let launch_error = |message: &str| AppError::user_visible(ErrorKind::Launch, message);

        match action {
            LaunchAction::Call { .. } if failed => model.set_error(launch_error("Unable to start call")),
            LaunchAction::Directions => {
                if let Some(e) = failure {
                    model.set_error(e.into());
                }
            }
            LaunchAction::Resource if failed => {
                model.set_error(launch_error("Failed to download PDF. Please try again."));
            }
            LaunchAction::WhatsApp if failed => Self::open_whatsapp_web(model, caps),
            LaunchAction::WhatsAppWeb if failed => model.set_error(launch_error("Could not open WhatsApp.")),
            LaunchAction::Sms if failed => model.set_error(launch_error("Could not open SMS app.")),
            LaunchAction::DispatchSms => {
                if failed {
                    model.set_error(launch_error("Could not open SMS app."));
                }
                Self::dispatch_gap(model, caps);
            }
            LaunchAction::DispatchShare => Self::dispatch_next(model, caps),
            LaunchAction::Call { .. }
            | LaunchAction::Resource
            | LaunchAction::WhatsApp
            | LaunchAction::WhatsAppWeb
            | LaunchAction::Share
            | LaunchAction::Sms => {}
        }
    }

    fn show_toast(model: &mut Model, caps: &Capabilities, message: impl Into<String>, kind: ToastKind) {
        if let Some(previous) = model.toast_timer.take() {
            caps.timer.cancel(previous);
        }
        model.active_toast = Some(Toast {
            message: message.into(),
            kind,
        });
        model.toast_timer = Some(Self::start_timer(
            model,
            caps,
            TimerPurpose::Toast,
            crate::TOAST_DURATION_MS,
        ));
    }

    fn dismiss_toast(model: &mut Model, caps: &Capabilities) {
        model.active_toast = None;
        if let Some(timer) = model.toast_timer.take() {
            caps.timer.cancel(timer);
        }
    }

    /// Reads `key`; the value comes back as `Event::StorageLoaded`. Returns
    /// false when no read was issued.
    fn load(caps: &Capabilities, key: StorageKey) -> bool {
        match key.kv_key() {
            Ok(kv_key) => {
                kv_key.read(&caps.kv, move |result| Event::StorageLoaded {
                    key,
                    result: Box::new(result),
                });
                true
            }
            Err(e) => {
                warn!(key = %key.name(), error = %e, "storage key rejected");
                false
            }
        }
    }

    fn store(caps: &Capabilities, key: StorageKey, value: Vec<u8>) {
        match key.kv_key() {
            Ok(kv_key) => {
                let event_key = key.clone();
                let written = kv_key.write(&caps.kv, value, move |result| Event::StorageWritten {
                    key: event_key,
                    result: Box::new(result),
                });
                if let Err(e) = written {
                    warn!(key = %key.name(), error = %e, "storage write refused");
                }
            }
            Err(e) => warn!(key = %key.name(), error = %e, "storage key rejected"),
        }
    }

    fn store_json<T: Serialize>(caps: &Capabilities, key: StorageKey, value: &T) {
        match serde_json::to_vec(value) {
            Ok(bytes) => Self::store(caps, key, bytes),
            Err(e) => warn!(key = %key.name(), error = %e, "value not serializable"),
        }
    }

    fn remove(caps: &Capabilities, key: StorageKey) {
        match key.kv_key() {
            Ok(kv_key) => kv_key.remove(&caps.kv, move |result| Event::StorageWritten {
                key,
                result: Box::new(result),
            }),
            Err(e) => warn!(key = %key.name(), error = %e, "storage key rejected"),
        }
    }

    fn storage_written(key: &StorageKey, result: &KvResult) {
        match result {
            Ok(_) => debug!(key = %key.name(), "storage updated"),
            Err(e) => warn!(key = %key.name(), error = %e, "storage write failed"),
        }
    }

    fn storage_loaded(model: &mut Model, caps: &Capabilities, key: StorageKey, result: KvResult) {
        match key {
            StorageKey::AccessToken => {
                let token = Self::read_string(&key, result);
                model.session.set_access_token(token);
                Self::restore_done(model, caps);
            }
            StorageKey::RefreshToken => {
                let token = Self::read_string(&key, result);
                model.session.set_refresh_token(token);
                Self::restore_done(model, caps);
            }
            StorageKey::User => {
                if let Some(user) = Self::read_json(&key, result) {
                    model.session.user = Some(user);
                }
                Self::restore_done(model, caps);
            }
            StorageKey::CurrentLocation => {
                if let Some(location) = Self::read_json(&key, result) {
                    model.location.canonical = Some(location);
                }
                Self::restore_done(model, caps);
            }
            StorageKey::Contacts => {
                let cached: Option<serde_json::Value> = Self::read_json(&key, result);
                Self::picker_cache_loaded(model, caps, cached);
            }
            StorageKey::SafePlaces { .. } => {
                if key != model.session.safe_places_key() {
                    debug!("safe places cache belongs to another session");
                    return;
                }
                let cached: Option<serde_json::Value> = Self::read_json(&key, result);
                Self::places_cache_loaded(model, cached);
            }
        }
    }

    fn read_string(key: &StorageKey, result: KvResult) -> Option<String> {
        let decoded = key
            .kv_key()
            .and_then(|kv_key| result.and_then(|output| output.decode_string(&kv_key)));
        decoded.unwrap_or_else(|e| {
            warn!(key = %key.name(), error = %e, "stored value unreadable");
            None
        })
    }

    fn read_json<T: DeserializeOwned>(key: &StorageKey, result: KvResult) -> Option<T> {
        let decoded = key
            .kv_key()
            .and_then(|kv_key| result.and_then(|output| output.decode_json(&kv_key)));
        decoded.unwrap_or_else(|e| {
            warn!(key = %key.name(), error = %e, "stored value unreadable");
            None
        })
    }
}
