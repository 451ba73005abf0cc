use tracing::{debug, info, warn};

use super::App;
use crate::capabilities::Capabilities;
use crate::config::AppConfig;
use crate::event::{ApiCall, ApiPurpose, TimerPurpose};
use crate::geocode::GeocodeThrottle;
use crate::greeting::{greeting, local_hour, next_tip, tip_interval_ms};
use crate::model::{Model, Screen};
use crate::session::StorageKey;
use crate::{get_current_time_ms, ONBOARDING_PAGES, ONBOARDING_PAGE_MS, SPLASH_DURATION_MS};

impl App {
    pub(super) fn start(model: &mut Model, caps: &Capabilities, config: Option<AppConfig>) {
        let config = config.unwrap_or_default();
        model.config = match config.validate() {
            Ok(()) => config,
            Err(e) => {
                warn!(error = %e, "invalid configuration, using defaults");
                AppConfig::default()
            }
        };
        model.location.throttle = GeocodeThrottle::new(
            model.config.geocode_min_interval_ms,
            model.config.geocode_min_distance_m,
        );
        model.greeting_seed = get_current_time_ms();

        model.screen = Screen::Splash;
        model.nav_stack.clear();
        model.splash_elapsed = false;
        model.restores_pending = 0;
        for key in [
            StorageKey::AccessToken,
            StorageKey::RefreshToken,
            StorageKey::User,
            StorageKey::CurrentLocation,
        ] {
            if Self::load(caps, key) {
                model.restores_pending += 1;
            }
        }
        Self::start_timer(model, caps, TimerPurpose::Splash, SPLASH_DURATION_MS);

        info!(
            platform = ?model.config.platform,
            api = %model.config.api_base_url,
            "core started"
        );
    }

    pub(super) fn restore_done(model: &mut Model, caps: &Capabilities) {
        model.restores_pending = model.restores_pending.saturating_sub(1);
        Self::maybe_leave_splash(model, caps);
    }

    pub(super) fn splash_elapsed(model: &mut Model, caps: &Capabilities) {
        model.splash_elapsed = true;
        Self::maybe_leave_splash(model, caps);
    }

    /// The splash stays up for its full duration and until every stored
    /// value has been read back.
    fn maybe_leave_splash(model: &mut Model, caps: &Capabilities) {
        if model.screen != Screen::Splash || !model.splash_elapsed || model.restores_pending > 0 {
            return;
        }
        let next = if model.is_signed_in() {
            Screen::Dashboard
        } else {
            Screen::Onboarding { page: 0 }
        };
        info!(signed_in = model.is_signed_in(), "leaving splash");
        Self::reset_to(model, caps, next);
    }

    pub(super) fn navigate(model: &mut Model, caps: &Capabilities, screen: Screen) {
        let target = if screen.is_public() || model.is_signed_in() {
            screen
        } else {
            debug!(requested = ?screen, "not signed in, redirecting to login");
            Screen::Login
        };
        if target == model.screen {
            return;
        }

        Self::leave(model, caps);
        model.nav_stack.push(model.screen);
        model.screen = target;
        Self::enter(model, caps);
    }

    pub(super) fn back(model: &mut Model, caps: &Capabilities) {
        let Some(previous) = model.nav_stack.pop() else {
            debug!("back with empty stack");
            return;
        };
        Self::leave(model, caps);
        model.screen = previous;
        Self::enter(model, caps);
    }

    /// Replaces the whole stack with `screen`.
    pub(super) fn reset_to(model: &mut Model, caps: &Capabilities, screen: Screen) {
        Self::leave(model, caps);
        model.nav_stack.clear();
        model.screen = screen;
        Self::enter(model, caps);
    }

    fn leave(model: &mut Model, caps: &Capabilities) {
        match model.screen {
            Screen::SafeSpaces => {
                if model.safe_places.watching {
                    caps.location.stop_watching();
                    model.safe_places.watching = false;
                    debug!("position watch stopped");
                }
                model.safe_places.draft = None;
            }
            Screen::Sos => Self::leave_sos(model, caps),
            Screen::Dashboard => {
                if let Some(timer) = model.tip_timer.take() {
                    caps.timer.cancel(timer);
                }
            }
            Screen::Onboarding { .. } => {
                if let Some(timer) = model.onboarding_timer.take() {
                    caps.timer.cancel(timer);
                }
            }
            Screen::Splash
            | Screen::Login
            | Screen::Signup
            | Screen::VerifyOtp
            | Screen::Contacts
            | Screen::LegalSupport
            | Screen::Settings => {}
        }
    }

    fn enter(model: &mut Model, caps: &Capabilities) {
        debug!(screen = ?model.screen, "entering screen");
        match model.screen {
            Screen::Onboarding { .. } => {
                model.onboarding_timer = Some(Self::start_timer(
                    model,
                    caps,
                    TimerPurpose::Onboarding,
                    ONBOARDING_PAGE_MS,
                ));
            }
            Screen::Dashboard => Self::open_dashboard(model, caps),
            Screen::Contacts => Self::fetch_contacts(model, caps),
            Screen::SafeSpaces => Self::open_safe_spaces(model, caps),
            Screen::Sos => Self::open_sos(model, caps),
            Screen::Login | Screen::Signup | Screen::VerifyOtp => model.auth.busy = false,
            Screen::Splash | Screen::LegalSupport | Screen::Settings => {}
        }
    }

    fn open_dashboard(model: &mut Model, caps: &Capabilities) {
        let hour = local_hour(get_current_time_ms(), model.config.utc_offset_minutes);
        model.greeting = Some(greeting(hour, model.greeting_seed));
        model.greeting_seed = model.greeting_seed.wrapping_add(1);
        Self::schedule_safety_tip(model, caps);

        if model.is_signed_in() {
            Self::send_api(model, caps, ApiCall::get(ApiPurpose::Profile, "/api/users/profile"));
            Self::fetch_contacts(model, caps);
        }
    }

    fn schedule_safety_tip(model: &mut Model, caps: &Capabilities) {
        if let Some(stale) = model.tip_timer.take() {
            caps.timer.cancel(stale);
        }
        let millis = tip_interval_ms(model.greeting_seed ^ model.next_timer_id);
        model.tip_timer = Some(Self::start_timer(model, caps, TimerPurpose::SafetyTip, millis));
    }

    /// Shows the next tip and restarts the wait, whether the shown tip timed
    /// out or the user asked for another.
    pub(super) fn rotate_safety_tip(model: &mut Model, caps: &Capabilities) {
        if model.screen != Screen::Dashboard {
            return;
        }
        model.safety_tip = next_tip(model.safety_tip);
        debug!(tip = model.safety_tip, "safety tip rotated");
        Self::schedule_safety_tip(model, caps);
    }

    pub(super) fn onboarding_next(model: &mut Model, caps: &Capabilities) {
        let Screen::Onboarding { page } = model.screen else {
            return;
        };
        if page + 1 >= ONBOARDING_PAGES {
            Self::finish_onboarding(model, caps);
            return;
        }
        // Pages replace each other without touching the stack.
        Self::leave(model, caps);
        model.screen = Screen::Onboarding { page: page + 1 };
        Self::enter(model, caps);
    }

    pub(super) fn finish_onboarding(model: &mut Model, caps: &Capabilities) {
        if matches!(model.screen, Screen::Onboarding { .. }) {
            Self::reset_to(model, caps, Screen::Login);
        }
    }
}
