use serde_json::Value;
use tracing::{debug, info, warn};

use super::App;
use crate::capabilities::{Capabilities, Cue, TimerId};
use crate::contacts::Contact;
use crate::countdown::Tick;
use crate::event::{ApiCall, ApiPurpose, Event, LaunchAction, LocationPurpose, TimerPurpose};
use crate::geocode::CanonicalLocation;
use crate::model::{Model, Screen, ToastKind};
use crate::session::StorageKey;
use crate::sos::{
    alert_body, contacts_alert_body, sms_url, whatsapp_url, whatsapp_web_url, AlertStatus,
    ContactDispatch, ContactPicker, DispatchStep, SosState,
};
use crate::{get_current_time_ms, iso_timestamp, AppError, ErrorKind};

const DISPATCH_DONE: &str = "Share prompts opened for selected contacts (one-by-one).";

impl App {
    pub(super) fn open_sos(model: &mut Model, caps: &Capabilities) {
        model.sos = SosState {
            snapshot: model.location.canonical.clone(),
            ..SosState::default()
        };
        if model.sos.snapshot.is_none() {
            model.sos.locating = true;
            Self::locate(model, caps, LocationPurpose::Sos, true);
        }

        let timer = model.next_timer();
        match model.sos.countdown.start(model.config.countdown_start, timer) {
            Ok(from) => {
                info!(from, has_location = !model.sos.locating, "sos countdown started");
                caps.sound.play(Cue::Tick);
                Self::schedule(caps, timer, TimerPurpose::CountdownTick, model.config.countdown_tick_ms);
            }
            Err(e) => warn!(error = %e, "sos countdown not started"),
        }
    }

    pub(super) fn countdown_tick(model: &mut Model, caps: &Capabilities, fired: TimerId) {
        let next = model.next_timer();
        match model.sos.countdown.tick(fired, next) {
            Tick::Continue { remaining } => {
                debug!(remaining, "sos countdown");
                caps.sound.play(Cue::Tick);
                Self::schedule(caps, next, TimerPurpose::CountdownTick, model.config.countdown_tick_ms);
            }
            Tick::Fire => {
                info!("sos fired");
                caps.sound.play(Cue::Alarm);
                if model.sos.locating {
                    info!("sos alert waiting for location");
                    model.sos.alert = AlertStatus::WaitingForLocation;
                    model.held_sos_alerts = model.held_sos_alerts.saturating_add(1);
                } else {
                    model.sos.alert = AlertStatus::Sending;
                    let snapshot = model.sos.snapshot.clone();
                    Self::send_sos_alert(model, caps, snapshot);
                }
            }
            Tick::Stale => debug!(timer = %fired, "stale countdown tick ignored"),
        }
    }

    fn send_sos_alert(model: &mut Model, caps: &Capabilities, location: Option<CanonicalLocation>) {
        let body = alert_body(&iso_timestamp(get_current_time_ms()), location.as_ref());
        Self::send_api(model, caps, ApiCall::post(ApiPurpose::SosAlert, "/api/alerts", body));
    }

    pub(super) fn sos_alert_sent(model: &mut Model, result: Result<Value, AppError>) {
        let status = match result {
            Ok(_) => {
                info!("sos alert delivered");
                AlertStatus::Sent
            }
            Err(e) => {
                warn!(error = %e, "sos alert failed");
                AlertStatus::Failed
            }
        };
        if model.sos.alert == AlertStatus::Sending {
            model.sos.alert = status;
        }
    }

    /// An SOS location lookup finished, with or without a location. Alerts
    /// held back for it go out now, even if the screen was left or opened
    /// again meanwhile.
    pub(super) fn sos_location_settled(
        model: &mut Model,
        caps: &Capabilities,
        location: Option<CanonicalLocation>,
    ) {
        if model.sos.locating {
            model.sos.locating = false;
            model.sos.snapshot.clone_from(&location);
        }
        let held = std::mem::take(&mut model.held_sos_alerts);
        if held == 0 {
            return;
        }
        info!(held, has_location = location.is_some(), "sending held sos alerts");
        if model.sos.alert == AlertStatus::WaitingForLocation {
            model.sos.alert = AlertStatus::Sending;
        }
        for _ in 0..held {
            Self::send_sos_alert(model, caps, location.clone());
        }
    }

    pub(super) fn cancel_sos(model: &mut Model, caps: &Capabilities) {
        if let Some(timer) = model.sos.countdown.cancel() {
            caps.timer.cancel(timer);
            info!("sos cancelled");
        }
    }

    pub(super) fn close_sos(model: &mut Model, caps: &Capabilities) {
        if model.screen != Screen::Sos {
            return;
        }
        if model.nav_stack.is_empty() {
            Self::reset_to(model, caps, Screen::Dashboard);
        } else {
            Self::back(model, caps);
        }
    }

    pub(super) fn leave_sos(model: &mut Model, caps: &Capabilities) {
        if let Some(timer) = model.sos.countdown.cancel() {
            caps.timer.cancel(timer);
            info!("sos countdown cancelled on leave");
        }
        model.sos.countdown.close();
        if let Some(timer) = model.sos.gap_timer.take() {
            caps.timer.cancel(timer);
        }
        model.sos.picker = ContactPicker::Closed;
        model.sos.dispatch = None;
        model.sos.sending_to_contacts = false;
    }

    pub(super) fn share_whatsapp(model: &Model, caps: &Capabilities) {
        let url = whatsapp_url(&model.sos.message());
        caps.launcher
            .can_open(url, |supported| Event::WhatsAppChecked { supported });
    }

    pub(super) fn whatsapp_checked(model: &Model, caps: &Capabilities, supported: bool) {
        if !supported {
            Self::open_whatsapp_web(model, caps);
            return;
        }
        caps.launcher
            .open(whatsapp_url(&model.sos.message()), |result| Event::Launched {
                action: LaunchAction::WhatsApp,
                result: Box::new(result),
            });
    }

    pub(super) fn open_whatsapp_web(model: &Model, caps: &Capabilities) {
        caps.launcher
            .open(whatsapp_web_url(&model.sos.message()), |result| Event::Launched {
                action: LaunchAction::WhatsAppWeb,
                result: Box::new(result),
            });
    }

    pub(super) fn share_native(model: &Model, caps: &Capabilities) {
        caps.launcher.share(model.sos.message(), |result| Event::Launched {
            action: LaunchAction::Share,
            result: Box::new(result),
        });
    }

    pub(super) fn sms_contact(model: &mut Model, caps: &Capabilities, phone: Option<&str>) {
        let Some(phone) = phone.map(str::trim).filter(|p| !p.is_empty()) else {
            model.set_error(AppError::user_visible(
                ErrorKind::Validation,
                "Contact has no phone number.",
            ));
            return;
        };
        let url = sms_url(model.config.platform, phone, &model.sos.message());
        caps.launcher.open(url, |result| Event::Launched {
            action: LaunchAction::Sms,
            result: Box::new(result),
        });
    }

    pub(super) fn open_contact_picker(model: &mut Model, caps: &Capabilities) {
        model.sos.picker = ContactPicker::Loading;
        if !Self::load(caps, StorageKey::Contacts) {
            Self::picker_cache_loaded(model, caps, None);
        }
    }

    pub(super) fn picker_cache_loaded(
        model: &mut Model,
        caps: &Capabilities,
        cached: Option<Value>,
    ) {
        if model.sos.picker != ContactPicker::Loading {
            return;
        }
        let contacts = cached
            .as_ref()
            .map(Contact::list_from_server)
            .unwrap_or_default();

        if !contacts.is_empty() {
            model.sos.picker = ContactPicker::ready(contacts);
        } else if model.is_signed_in() {
            Self::send_api(
                model,
                caps,
                ApiCall::get(ApiPurpose::PickerContacts, "/api/contacts?mine=true"),
            );
        } else {
            model.sos.picker = ContactPicker::ready(Vec::new());
        }
    }

    pub(super) fn picker_contacts_loaded(model: &mut Model, result: Result<Value, AppError>) {
        if model.sos.picker != ContactPicker::Loading {
            return;
        }
        let contacts = match result {
            Ok(body) => Contact::list_from_server(&body),
            Err(e) => {
                warn!(error = %e, "picker contacts unavailable");
                Vec::new()
            }
        };
        model.sos.picker = ContactPicker::ready(contacts);
    }

    pub(super) fn send_to_selected_contacts(model: &mut Model, caps: &Capabilities) {
        let selected = model.sos.picker.selected_contacts();
        if selected.is_empty() {
            debug!("no contacts selected");
            return;
        }
        info!(count = selected.len(), "notifying selected contacts");

        model.sos.sending_to_contacts = true;
        let body = contacts_alert_body(&selected, model.sos.snapshot.as_ref());
        Self::send_api(
            model,
            caps,
            ApiCall::post(ApiPurpose::ContactsAlert, "/api/alerts/send-to-contacts", body),
        );

        model.sos.dispatch = Some(ContactDispatch::new(selected));
        model.sos.picker = ContactPicker::Closed;
        Self::dispatch_next(model, caps);
    }

    /// Opens the prompt for the next queued contact, or finishes the run.
    pub(super) fn dispatch_next(model: &mut Model, caps: &Capabilities) {
        let message = model.sos.message();
        let platform = model.config.platform;
        let Some(dispatch) = model.sos.dispatch.as_mut() else {
            return;
        };

        match dispatch.next_step(platform, &message) {
            Some(DispatchStep::Sms { url }) => caps.launcher.open(url, |result| Event::Launched {
                action: LaunchAction::DispatchSms,
                result: Box::new(result),
            }),
            Some(DispatchStep::Share) => caps.launcher.share(message, |result| Event::Launched {
                action: LaunchAction::DispatchShare,
                result: Box::new(result),
            }),
            None => {
                model.sos.dispatch = None;
                model.sos.sending_to_contacts = false;
                info!("contact dispatch finished");
                Self::show_toast(model, caps, DISPATCH_DONE, ToastKind::Success);
            }
        }
    }

    pub(super) fn dispatch_gap(model: &mut Model, caps: &Capabilities) {
        if model.sos.dispatch.is_some() {
            let gap = model.config.contact_dispatch_gap_ms;
            let timer = Self::start_timer(model, caps, TimerPurpose::DispatchGap, gap);
            model.sos.gap_timer = Some(timer);
        }
    }
}
