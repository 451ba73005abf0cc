//! Login, signup and OTP forms: client-side validation and request bodies.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::AppError;

pub const SIGNED_IN: &str = "Signed in successfully!";
pub const OTP_SENT: &str = "OTP sent. Please verify.";
pub const VERIFIED: &str = "Your account has been verified!";
pub const OTP_RESENT: &str = "OTP resent successfully!";
pub const LOGGED_OUT: &str = "You have been logged out.";
pub const LOGGED_OUT_LOCALLY: &str = "Could not notify server, but you were signed out locally.";
pub const LOGGED_OUT_OFFLINE: &str = "Could not contact server, but you were signed out locally.";
pub const SERVER_UNREACHABLE: &str = "Unable to contact server. Check API URL & network.";
pub const SOMETHING_WENT_WRONG: &str = "Something went wrong";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("Please enter both email and password.")]
    MissingCredentials,
    #[error("Please fill in all fields")]
    MissingSignupFields,
    #[error("Passwords do not match")]
    PasswordMismatch,
    #[error("Please enter OTP")]
    MissingOtp,
    #[error("No email or phone available to resend OTP")]
    NoOtpDestination,
}

impl From<FormError> for AppError {
    fn from(e: FormError) -> Self {
        AppError::validation(e.to_string())
    }
}

fn blank(s: &str) -> bool {
    s.trim().is_empty()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn to_body(&self) -> Result<Value, FormError> {
        if blank(&self.email) || self.password.is_empty() {
            return Err(FormError::MissingCredentials);
        }
        Ok(json!({"email": self.email.trim(), "password": self.password}))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignupForm {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub confirm_password: String,
}

impl SignupForm {
    pub fn to_body(&self) -> Result<Value, FormError> {
        if [&self.full_name, &self.email, &self.phone, &self.password, &self.confirm_password]
            .iter()
            .any(|f| blank(f))
        {
            return Err(FormError::MissingSignupFields);
        }
        if self.password != self.confirm_password {
            return Err(FormError::PasswordMismatch);
        }
        Ok(json!({
            "full_name": self.full_name.trim(),
            "email": self.email.trim(),
            "phone": self.phone.trim(),
            "password": self.password,
        }))
    }
}

/// Signup in progress, waiting for the emailed code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingVerification {
    pub pending_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl PendingVerification {
    #[must_use]
    pub fn from_signup(form: &SignupForm, response: &Value) -> Self {
        let pending_id = ["pendingId", "pending_id"]
            .iter()
            .find_map(|f| match response.get(*f) {
                Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
                Some(Value::Number(n)) => Some(n.to_string()),
                _ => None,
            });
        let keep = |s: &str| Some(s.trim().to_string()).filter(|s| !s.is_empty());
        Self {
            pending_id,
            email: keep(&form.email),
            phone: keep(&form.phone),
        }
    }

    pub fn resend_body(&self) -> Result<Value, FormError> {
        if self.email.is_none() && self.phone.is_none() {
            return Err(FormError::NoOtpDestination);
        }
        Ok(json!({"email": self.email, "phone": self.phone, "type": "email_verif"}))
    }
}

pub fn otp_body(code: &str) -> Result<Value, FormError> {
    let code = code.trim();
    if code.is_empty() {
        return Err(FormError::MissingOtp);
    }
    Ok(json!({"code": code}))
}

/// Success text for a verified account: the server's message when it sent one.
#[must_use]
pub fn verified_message(response: &Value) -> String {
    response
        .get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or(VERIFIED)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    mod login_tests {
        use super::*;

        #[test]
        fn test_requires_both_fields() {
            let form = LoginForm {
                email: "a@b.com".into(),
                password: String::new(),
            };
            assert_eq!(form.to_body(), Err(FormError::MissingCredentials));
            assert_eq!(
                FormError::MissingCredentials.to_string(),
                "Please enter both email and password."
            );
        }

        #[test]
        fn test_body_trims_email_only() {
            let form = LoginForm {
                email: " a@b.com ".into(),
                password: " pw ".into(),
            };
            assert_eq!(form.to_body().unwrap(), json!({"email": "a@b.com", "password": " pw "}));
        }
    }

    mod signup_tests {
        use super::*;

        fn form() -> SignupForm {
            SignupForm {
                full_name: "Ayesha Khan".into(),
                email: "ayesha@example.com".into(),
                phone: "03001234567".into(),
                password: "secret1".into(),
                confirm_password: "secret1".into(),
            }
        }

        #[test]
        fn test_all_fields_required() {
            let mut f = form();
            f.phone = " ".into();
            assert_eq!(f.to_body(), Err(FormError::MissingSignupFields));
        }

        #[test]
        fn test_passwords_must_match() {
            let mut f = form();
            f.confirm_password = "other".into();
            assert_eq!(f.to_body(), Err(FormError::PasswordMismatch));
        }

        #[test]
        fn test_body_has_no_confirmation() {
            let body = form().to_body().unwrap();
            assert_eq!(body["full_name"], "Ayesha Khan");
            assert!(body.get("confirm_password").is_none());
        }

        #[test]
        fn test_pending_id_variants() {
            let a = PendingVerification::from_signup(&form(), &json!({"pendingId": "p1"}));
            let b = PendingVerification::from_signup(&form(), &json!({"pending_id": "p2"}));
            let c = PendingVerification::from_signup(&form(), &json!({}));
            assert_eq!(a.pending_id.as_deref(), Some("p1"));
            assert_eq!(b.pending_id.as_deref(), Some("p2"));
            assert_eq!(c.pending_id, None);
            assert_eq!(c.email.as_deref(), Some("ayesha@example.com"));
        }
    }

    mod otp_tests {
        use super::*;

        #[test]
        fn test_code_required() {
            assert_eq!(otp_body("  "), Err(FormError::MissingOtp));
            assert_eq!(otp_body(" 123456 ").unwrap(), json!({"code": "123456"}));
        }

        #[test]
        fn test_resend_needs_destination() {
            assert_eq!(
                PendingVerification::default().resend_body(),
                Err(FormError::NoOtpDestination)
            );
            let pending = PendingVerification {
                email: Some("a@b.com".into()),
                ..PendingVerification::default()
            };
            assert_eq!(
                pending.resend_body().unwrap(),
                json!({"email": "a@b.com", "phone": null, "type": "email_verif"})
            );
        }

        #[test]
        fn test_verified_message() {
            assert_eq!(verified_message(&json!({"message": "Verified!"})), "Verified!");
            assert_eq!(verified_message(&json!({})), VERIFIED);
        }
    }
}
