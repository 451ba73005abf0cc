use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::App;
use crate::account::{
    otp_body, verified_message, FormError, LoginForm, PendingVerification, SignupForm, LOGGED_OUT,
    LOGGED_OUT_LOCALLY, LOGGED_OUT_OFFLINE, OTP_RESENT, OTP_SENT, SERVER_UNREACHABLE, SIGNED_IN,
    SOMETHING_WENT_WRONG,
};
use crate::capabilities::Capabilities;
use crate::event::{ApiCall, ApiPurpose};
use crate::model::{ContactsState, Model, SafePlacesState, Screen, ToastKind};
use crate::session::{StorageKey, TokenGrant, UserProfile};
use crate::sos::SosState;
use crate::{AppError, ErrorKind};

impl App {
    pub(super) fn submit_login(model: &mut Model, caps: &Capabilities, form: LoginForm) {
        model.clear_error();
        let body = match form.to_body() {
            Ok(body) => body,
            Err(e) => {
                model.set_error(e.into());
                return;
            }
        };
        model.auth.login = LoginForm {
            email: form.email,
            password: String::new(),
        };
        model.auth.busy = true;
        Self::send_api(
            model,
            caps,
            ApiCall::post(ApiPurpose::Login, "/api/users/login", body).anonymous(),
        );
    }

    pub(super) fn login_completed(
        model: &mut Model,
        caps: &Capabilities,
        result: Result<Value, AppError>,
    ) {
        model.auth.busy = false;
        let body = match result {
            Ok(body) => body,
            Err(e) => {
                model.set_error(Self::explain(e, SERVER_UNREACHABLE));
                return;
            }
        };

        let grant = TokenGrant::from_json(&body);
        if grant.access_token.is_none() {
            warn!("login response carried no access token");
            model.set_error(AppError::user_visible(ErrorKind::Authentication, "Login failed"));
            return;
        }

        let writes = model.session.apply_grant(grant);
        Self::persist_writes(caps, writes);
        info!("signed in");
        Self::show_toast(model, caps, SIGNED_IN, ToastKind::Success);
        Self::reset_to(model, caps, Screen::Dashboard);
    }

    pub(super) fn submit_signup(model: &mut Model, caps: &Capabilities, form: SignupForm) {
        model.clear_error();
        let body = match form.to_body() {
            Ok(body) => body,
            Err(e) => {
                model.set_error(e.into());
                return;
            }
        };
        model.auth.signup = SignupForm {
            password: String::new(),
            confirm_password: String::new(),
            ..form
        };
        model.auth.busy = true;
        Self::send_api(
            model,
            caps,
            ApiCall::post(ApiPurpose::Register, "/api/users/register", body).anonymous(),
        );
    }

    pub(super) fn signup_completed(
        model: &mut Model,
        caps: &Capabilities,
        result: Result<Value, AppError>,
    ) {
        model.auth.busy = false;
        match result {
            Ok(body) => {
                let pending = PendingVerification::from_signup(&model.auth.signup, &body);
                debug!(has_pending_id = pending.pending_id.is_some(), "signup accepted");
                model.auth.pending = Some(pending);
                model.auth.otp_code.clear();
                Self::show_toast(model, caps, OTP_SENT, ToastKind::Info);
                Self::navigate(model, caps, Screen::VerifyOtp);
            }
            Err(e) => model.set_error(Self::explain(e, SOMETHING_WENT_WRONG)),
        }
    }

    pub(super) fn submit_otp(model: &mut Model, caps: &Capabilities, code: &str) {
        model.clear_error();
        let body = match otp_body(code) {
            Ok(body) => body,
            Err(e) => {
                model.set_error(e.into());
                return;
            }
        };
        model.auth.otp_code = code.trim().to_string();
        model.auth.busy = true;
        Self::send_api(
            model,
            caps,
            ApiCall::post(ApiPurpose::VerifyOtp, "/api/users/verify-otp", body).anonymous(),
        );
    }

    pub(super) fn otp_verified(
        model: &mut Model,
        caps: &Capabilities,
        result: Result<Value, AppError>,
    ) {
        model.auth.busy = false;
        match result {
            Ok(body) => {
                info!("account verified");
                model.auth.pending = None;
                model.auth.otp_code.clear();
                Self::show_toast(model, caps, verified_message(&body), ToastKind::Success);
                Self::reset_to(model, caps, Screen::Login);
            }
            Err(e) => model.set_error(Self::explain(e, SOMETHING_WENT_WRONG)),
        }
    }

    pub(super) fn resend_otp(model: &mut Model, caps: &Capabilities) {
        model.clear_error();
        let body = model
            .auth
            .pending
            .as_ref()
            .map_or(Err(FormError::NoOtpDestination), PendingVerification::resend_body);
        match body {
            Ok(body) => {
                model.auth.busy = true;
                Self::send_api(
                    model,
                    caps,
                    ApiCall::post(ApiPurpose::SendOtp, "/api/users/send-otp", body).anonymous(),
                );
            }
            Err(e) => model.set_error(e.into()),
        }
    }

    pub(super) fn otp_resent(
        model: &mut Model,
        caps: &Capabilities,
        result: Result<Value, AppError>,
    ) {
        model.auth.busy = false;
        match result {
            Ok(_) => Self::show_toast(model, caps, OTP_RESENT, ToastKind::Success),
            Err(e) => model.set_error(Self::explain(e, SOMETHING_WENT_WRONG)),
        }
    }

    /// Local sign-out happens first and unconditionally; the server is told
    /// afterwards when there is a refresh token to revoke.
    pub(super) fn logout(model: &mut Model, caps: &Capabilities) {
        let refresh_token = model.session.refresh_token().map(str::to_string);

        model.session.clear();
        for key in [StorageKey::AccessToken, StorageKey::RefreshToken, StorageKey::User] {
            Self::remove(caps, key);
        }
        Self::reset_to(model, caps, Screen::Login);
        model.contacts = ContactsState::default();
        model.safe_places = SafePlacesState::default();
        model.sos = SosState::default();
        model.auth.login.password.clear();
        info!("signed out");

        match refresh_token {
            Some(token) => Self::send_api(
                model,
                caps,
                ApiCall::post(
                    ApiPurpose::Logout,
                    "/api/users/logout",
                    json!({ "refreshToken": token }),
                )
                .anonymous(),
            ),
            None => Self::show_toast(model, caps, LOGGED_OUT, ToastKind::Success),
        }
    }

    pub(super) fn logout_completed(
        model: &mut Model,
        caps: &Capabilities,
        result: Result<Value, AppError>,
    ) {
        match result {
            Ok(_) => Self::show_toast(model, caps, LOGGED_OUT, ToastKind::Success),
            Err(e) => {
                warn!(error = %e, "server logout failed");
                let message = if e.http_status().is_some() {
                    LOGGED_OUT_LOCALLY
                } else {
                    LOGGED_OUT_OFFLINE
                };
                Self::show_toast(model, caps, message, ToastKind::Warning);
            }
        }
    }

    pub(super) fn profile_loaded(
        model: &mut Model,
        caps: &Capabilities,
        result: Result<Value, AppError>,
    ) {
        let body = match result {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "profile unavailable, keeping stored user");
                return;
            }
        };
        if !model.is_signed_in() {
            debug!("profile arrived after sign-out");
            return;
        }

        let user = ["user", "data"]
            .iter()
            .find_map(|field| body.get(*field))
            .filter(|v| v.is_object())
            .unwrap_or(&body);
        if !user.is_object() {
            warn!("profile response was not an object");
            return;
        }

        let profile = UserProfile(user.clone());
        Self::store(caps, StorageKey::User, profile.0.to_string().into_bytes());
        model.session.user = Some(profile);
    }
}
