use serde::{Deserialize, Serialize};

use crate::account::{LoginForm, PendingVerification, SignupForm};
use crate::capabilities::{PositionFix, TimerId};
use crate::config::AppConfig;
use crate::contacts::{Contact, ContactDraft};
use crate::error::AppError;
use crate::geo::GeoPoint;
use crate::geocode::{CanonicalLocation, GeocodeThrottle};
use crate::places::SafePlace;
use crate::session::Session;
use crate::sos::SosState;
use crate::CANCEL_PIN_DIGITS;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(tag = "screen", rename_all = "snake_case")]
pub enum Screen {
    #[default]
    Splash,
    Onboarding {
        page: u8,
    },
    Login,
    Signup,
    VerifyOtp,
    Dashboard,
    Contacts,
    SafeSpaces,
    Sos,
    LegalSupport,
    Settings,
}

impl Screen {
    /// Screens reachable without signing in.
    #[must_use]
    pub const fn is_public(self) -> bool {
        matches!(
            self,
            Self::Splash | Self::Onboarding { .. } | Self::Login | Self::Signup | Self::VerifyOtp
        )
    }
}

#[derive(Debug, Default)]
pub struct LocationState {
    pub canonical: Option<CanonicalLocation>,
    pub position: Option<PositionFix>,
    pub throttle: GeocodeThrottle,
    pub locating: bool,
}

impl LocationState {
    /// The freshest known point: the live fix, else the saved location.
    #[must_use]
    pub fn current_point(&self) -> Option<GeoPoint> {
        self.position
            .and_then(|fix| fix.point().ok())
            .or_else(|| self.canonical.as_ref().and_then(|c| c.point().ok()))
    }
}

/// A map tap waiting to become a safe place.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceDraft {
    pub point: GeoPoint,
    pub name: String,
    pub address: Option<String>,
    pub resolving_address: bool,
    pub saving: bool,
}

#[derive(Debug, Default)]
pub struct SafePlacesState {
    pub places: Vec<SafePlace>,
    pub loading: bool,
    /// A server list has arrived since the screen opened; the cache no
    /// longer applies.
    pub synced: bool,
    pub last_fetch_ms: Option<u64>,
    pub watching: bool,
    pub draft: Option<PlaceDraft>,
}

#[derive(Debug, Default)]
pub struct ContactsState {
    pub list: Vec<Contact>,
    pub loaded: bool,
    pub loading: bool,
    pub form: Option<ContactDraft>,
    pub saving: bool,
    pub show_all_support: bool,
}

#[derive(Debug, Default)]
pub struct AuthState {
    pub login: LoginForm,
    pub signup: SignupForm,
    pub otp_code: String,
    pub pending: Option<PendingVerification>,
    pub busy: bool,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SettingsToggles {
    pub voice_activation: bool,
    pub auto_location_sharing: bool,
    pub audio_recording: bool,
    pub vibration_alerts: bool,
}

/// Local settings screen state. Nothing here is sent to the backend.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SettingsState {
    pub toggles: SettingsToggles,
    /// Up to [`CANCEL_PIN_DIGITS`] digits for cancelling false alarms.
    pub cancel_pin: String,
}

impl SettingsState {
    /// Keeps the digits of `input`, cut to [`CANCEL_PIN_DIGITS`].
    pub fn set_cancel_pin(&mut self, input: &str) {
        self.cancel_pin = input
            .chars()
            .filter(char::is_ascii_digit)
            .take(CANCEL_PIN_DIGITS)
            .collect();
    }

    #[must_use]
    pub fn has_cancel_pin(&self) -> bool {
        self.cancel_pin.len() == CANCEL_PIN_DIGITS
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SettingToggle {
    VoiceActivation,
    AutoLocationSharing,
    AudioRecording,
    VibrationAlerts,
}

impl SettingsToggles {
    pub fn set(&mut self, toggle: SettingToggle, on: bool) {
        let slot = match toggle {
            SettingToggle::VoiceActivation => &mut self.voice_activation,
            SettingToggle::AutoLocationSharing => &mut self.auto_location_sharing,
            SettingToggle::AudioRecording => &mut self.audio_recording,
            SettingToggle::VibrationAlerts => &mut self.vibration_alerts,
        };
        *slot = on;
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ToastKind {
    #[default]
    Info,
    Success,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub message: String,
    pub kind: ToastKind,
}

#[derive(Debug, Default)]
pub struct Model {
    pub config: AppConfig,

    // Navigation
    pub screen: Screen,
    pub nav_stack: Vec<Screen>,
    pub restores_pending: u8,
    pub splash_elapsed: bool,
    pub onboarding_timer: Option<TimerId>,

    // Session (tokens are secrets and never serialized)
    pub session: Session,
    pub auth: AuthState,
    pub greeting: Option<&'static str>,
    pub greeting_seed: u64,
    pub safety_tip: usize,
    pub tip_timer: Option<TimerId>,

    // Features
    pub location: LocationState,
    pub safe_places: SafePlacesState,
    pub contacts: ContactsState,
    pub sos: SosState,
    /// SOS alerts that fired before their location lookup settled. They
    /// outlive the SOS screen visit that raised them.
    pub held_sos_alerts: u32,
    pub settings: SettingsState,

    // Generic UI state
    pub active_error: Option<AppError>,
    pub active_toast: Option<Toast>,
    pub toast_timer: Option<TimerId>,
    pub next_timer_id: u64,
}

impl Model {
    /// A timer id never handed out before.
    pub fn next_timer(&mut self) -> TimerId {
        self.next_timer_id += 1;
        TimerId(self.next_timer_id)
    }

    pub fn set_error(&mut self, error: AppError) {
        self.active_error = Some(error);
    }

    pub fn clear_error(&mut self) {
        self.active_error = None;
    }

    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.session.has_access_token()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_pin_keeps_four_digits() {
        let mut settings = SettingsState::default();
        settings.set_cancel_pin("12a3");
        assert_eq!(settings.cancel_pin, "123");
        assert!(!settings.has_cancel_pin());

        settings.set_cancel_pin("123456");
        assert_eq!(settings.cancel_pin, "1234");
        assert!(settings.has_cancel_pin());

        settings.set_cancel_pin("");
        assert!(settings.cancel_pin.is_empty());
    }

    #[test]
    fn test_timer_ids_are_unique() {
        let mut model = Model::default();
        let a = model.next_timer();
        let b = model.next_timer();
        assert_ne!(a, b);
    }

    #[test]
    fn test_public_screens() {
        assert!(Screen::Login.is_public());
        assert!(Screen::Onboarding { page: 2 }.is_public());
        assert!(!Screen::Sos.is_public());
        assert!(!Screen::Dashboard.is_public());
    }

    #[test]
    fn test_settings_toggle() {
        let mut settings = SettingsToggles::default();
        settings.set(SettingToggle::VibrationAlerts, true);
        assert!(settings.vibration_alerts);
        assert!(!settings.voice_activation);
    }

    #[test]
    fn test_current_point_prefers_live_fix() {
        let mut location = LocationState::default();
        assert!(location.current_point().is_none());
        location.canonical = Some(CanonicalLocation::new(
            GeoPoint::new(1.0, 2.0).unwrap(),
            None,
            0,
        ));
        assert_eq!(location.current_point().unwrap().lat(), 1.0);
        location.position = Some(PositionFix {
            latitude: 3.0,
            longitude: 4.0,
            accuracy_m: None,
            timestamp_ms: 0,
        });
        assert_eq!(location.current_point().unwrap().lat(), 3.0);
    }
}
