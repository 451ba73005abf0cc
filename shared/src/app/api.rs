use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::App;
use crate::capabilities::{Capabilities, HttpError, HttpMethod, HttpRequest, HttpResult};
use crate::event::{ApiCall, ApiPurpose, Event};
use crate::model::Model;
use crate::session::{StorageKey, TokenGrant};
use crate::{AppError, ErrorKind};

const SESSION_EXPIRED: &str = "Session expired. Please sign in again.";

impl App {
    fn build_request(
        model: &Model,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
    ) -> Result<HttpRequest, HttpError> {
        let url = model.config.endpoint_url(path)?;
        let mut request = HttpRequest::new(method, url)
            .with_timeout_ms(model.config.request_timeout_ms)?
            .with_header("Content-Type", "application/json")?;
        if let Some(auth) = model.session.auth_header() {
            request = request.with_header("Authorization", auth)?;
        }
        if let Some(body) = body {
            request = request.with_json(body)?;
        }
        Ok(request)
    }

    pub(super) fn send_api(model: &mut Model, caps: &Capabilities, call: ApiCall) {
        let path = call.path.split('?').next().unwrap_or_default();
        debug!(purpose = ?call.purpose, method = call.method.as_str(), path, retried = call.retried, "api request");

        match Self::build_request(model, call.method, &call.path, call.body.as_ref()) {
            Ok(request) => request.send(&caps.http, move |result| Event::ApiResponse {
                call: Box::new(call),
                result: Box::new(result),
            }),
            Err(e) => {
                warn!(purpose = ?call.purpose, error = %e, "request could not be built");
                Self::api_completed(model, caps, call, Err(e.into()));
            }
        }
    }

    pub(super) fn api_responded(
        model: &mut Model,
        caps: &Capabilities,
        call: ApiCall,
        result: HttpResult,
    ) {
        if let Ok(response) = &result {
            let expired = call.purpose.is_auth_failure(response.status());
            if expired && call.authenticated && !call.retried && model.session.has_refresh_token() {
                info!(purpose = ?call.purpose, "access token rejected, refreshing session");
                Self::send_refresh(model, caps, call);
                return;
            }
        }
        Self::api_completed(model, caps, call, Self::outcome(result));
    }

    fn outcome(result: HttpResult) -> Result<Value, AppError> {
        match result {
            Ok(response) if response.is_success() => Ok(response.json_value()),
            Ok(response) => Err(AppError::from_http_status(response.status(), response.body())),
            Err(e) => Err(e.into()),
        }
    }

    fn send_refresh(model: &mut Model, caps: &Capabilities, call: ApiCall) {
        let body = json!({ "refreshToken": model.session.refresh_token() });
        match Self::build_request(model, HttpMethod::Post, "/api/users/refresh", Some(&body)) {
            Ok(request) => request.send(&caps.http, move |result| Event::SessionRefreshed {
                call: Box::new(call),
                result: Box::new(result),
            }),
            Err(e) => {
                warn!(error = %e, "refresh request could not be built");
                Self::api_completed(model, caps, call, Err(e.into()));
            }
        }
    }

    pub(super) fn session_refreshed(
        model: &mut Model,
        caps: &Capabilities,
        mut call: ApiCall,
        result: HttpResult,
    ) {
        let grant = match result {
            Ok(response) if response.is_success() => TokenGrant::from_json(&response.json_value()),
            Ok(response) => {
                warn!(status = response.status(), "session refresh rejected");
                TokenGrant::default()
            }
            Err(e) => {
                warn!(error = %e, "session refresh failed");
                TokenGrant::default()
            }
        };

        if grant.access_token.is_none() {
            Self::api_completed(
                model,
                caps,
                call,
                Err(AppError::new(ErrorKind::Authentication, SESSION_EXPIRED)),
            );
            return;
        }

        let writes = model.session.apply_grant(grant);
        Self::persist_writes(caps, writes);
        info!("session refreshed, retrying request");
        call.retried = true;
        Self::send_api(model, caps, call);
    }

    pub(super) fn persist_writes(caps: &Capabilities, writes: Vec<(StorageKey, Vec<u8>)>) {
        for (key, bytes) in writes {
            Self::store(caps, key, bytes);
        }
    }

    /// Text for a failed call: the server's own message when it answered,
    /// otherwise `fallback`.
    pub(super) fn explain(error: AppError, fallback: &str) -> AppError {
        if error.http_status().is_some() {
            return AppError {
                show_message: true,
                ..error
            };
        }
        let internal = error
            .internal_message
            .clone()
            .unwrap_or_else(|| error.message.clone());
        AppError::user_visible(error.kind, fallback).with_internal(internal)
    }

    fn api_completed(
        model: &mut Model,
        caps: &Capabilities,
        call: ApiCall,
        result: Result<Value, AppError>,
    ) {
        if let Err(e) = &result {
            debug!(purpose = ?call.purpose, error = %e, "api call failed");
        }

        match call.purpose {
            ApiPurpose::Login => Self::login_completed(model, caps, result),
            ApiPurpose::Register => Self::signup_completed(model, caps, result),
            ApiPurpose::VerifyOtp => Self::otp_verified(model, caps, result),
            ApiPurpose::SendOtp => Self::otp_resent(model, caps, result),
            ApiPurpose::Logout => Self::logout_completed(model, caps, result),
            ApiPurpose::Profile => Self::profile_loaded(model, caps, result),
            ApiPurpose::ListContacts => Self::contacts_loaded(model, caps, result),
            ApiPurpose::CreateContact | ApiPurpose::UpdateContact { .. } => {
                Self::contact_saved(model, caps, result);
            }
            ApiPurpose::DeleteContact { id } => Self::contact_deleted(model, caps, &id, result),
            ApiPurpose::PickerContacts => Self::picker_contacts_loaded(model, result),
            ApiPurpose::ListSafePlaces => Self::places_loaded(model, caps, result),
            ApiPurpose::CreateSafePlace => Self::place_created(model, caps, result),
            ApiPurpose::DeleteSafePlace { id } => Self::place_deleted(model, caps, &id, result),
            ApiPurpose::SosAlert => Self::sos_alert_sent(model, result),
            ApiPurpose::ContactsAlert => match result {
                Ok(_) => info!("contacts alert recorded"),
                Err(e) => warn!(error = %e, "contacts alert not recorded"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explain_keeps_server_message() {
        let error = AppError::from_http_status(400, br#"{"error":"Invalid credentials"}"#);
        let explained = App::explain(error, "fallback");
        assert_eq!(explained.user_facing_message(), "Invalid credentials");
    }

    #[test]
    fn test_explain_uses_fallback_without_response() {
        let error: AppError = HttpError::Offline.into();
        let explained = App::explain(error, "Unable to contact server.");
        assert_eq!(explained.user_facing_message(), "Unable to contact server.");
        assert_eq!(explained.kind, ErrorKind::Network);
        assert!(explained.internal_message.is_some());
    }

    #[test]
    fn test_outcome_classifies_responses() {
        use crate::capabilities::HttpResponse;

        let ok = App::outcome(Ok(HttpResponse::from_json(200, &json!({"a": 1})))).unwrap();
        assert_eq!(ok["a"], 1);

        let err = App::outcome(Ok(HttpResponse::new(404, Vec::new()))).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert_eq!(err.http_status(), Some(404));

        let err = App::outcome(Err(HttpError::Timeout { timeout_ms: 10 })).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Timeout);
    }
}
