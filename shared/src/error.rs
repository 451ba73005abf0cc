use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::capabilities::{HttpError, KvError, LauncherError, LocationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorSeverity {
    Transient,
    Permanent,
    Fatal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Network,
    Timeout,
    Authentication,
    Authorization,
    Validation,
    NotFound,
    Conflict,
    RateLimited,
    Storage,
    Serialization,
    Deserialization,
    Location,
    LocationPermissionDenied,
    Launch,
    InvalidState,
    Internal,
    Unknown,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Network => "NETWORK_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::Authentication => "AUTH_ERROR",
            Self::Authorization => "FORBIDDEN",
            Self::Validation => "VALIDATION_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "CONFLICT",
            Self::RateLimited => "RATE_LIMITED",
            Self::Storage => "STORAGE_ERROR",
            Self::Serialization => "SERIALIZATION_ERROR",
            Self::Deserialization => "DESERIALIZATION_ERROR",
            Self::Location => "LOCATION_ERROR",
            Self::LocationPermissionDenied => "LOCATION_PERMISSION_DENIED",
            Self::Launch => "LAUNCH_ERROR",
            Self::InvalidState => "INVALID_STATE",
            Self::Internal => "INTERNAL_ERROR",
            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    #[must_use]
    pub const fn default_severity(self) -> ErrorSeverity {
        match self {
            Self::Network
            | Self::Timeout
            | Self::RateLimited
            | Self::Storage
            | Self::Location
            | Self::Launch => ErrorSeverity::Transient,

            Self::Serialization | Self::Deserialization | Self::Internal | Self::InvalidState => {
                ErrorSeverity::Fatal
            }

            Self::Authentication
            | Self::Authorization
            | Self::Validation
            | Self::NotFound
            | Self::Conflict
            | Self::LocationPermissionDenied
            | Self::Unknown => ErrorSeverity::Permanent,
        }
    }

    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::Network | Self::Timeout | Self::RateLimited | Self::Storage | Self::Location
        )
    }

    /// Kinds whose `message` was written for the user, usually by the server.
    #[must_use]
    pub const fn carries_user_message(self) -> bool {
        matches!(
            self,
            Self::Validation
                | Self::Authentication
                | Self::Authorization
                | Self::NotFound
                | Self::Conflict
                | Self::Launch
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppError {
    pub kind: ErrorKind,
    pub severity: ErrorSeverity,
    pub message: String,
    pub internal_message: Option<String>,
    pub context: HashMap<String, String>,
    #[serde(default)]
    pub show_message: bool,
}

impl AppError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.default_severity(),
            message: message.into(),
            internal_message: None,
            context: HashMap::new(),
            show_message: false,
        }
    }

    /// An error whose `message` was written for the user, whatever its kind.
    #[must_use]
    pub fn user_visible(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            show_message: true,
            ..Self::new(kind, message)
        }
    }

    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    #[must_use]
    pub fn with_internal(mut self, internal: impl Into<String>) -> Self {
        self.internal_message = Some(internal.into());
        self
    }

    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }

    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind.is_retryable() && !matches!(self.severity, ErrorSeverity::Fatal)
    }

    #[must_use]
    pub fn http_status(&self) -> Option<u16> {
        self.context.get("http_status").and_then(|s| s.parse().ok())
    }

    #[must_use]
    pub fn user_facing_message(&self) -> String {
        if (self.show_message || self.kind.carries_user_message()) && !self.message.is_empty() {
            return self.message.clone();
        }
        match self.kind {
            ErrorKind::Network => {
                "Unable to connect. Please check your internet connection and try again.".into()
            }
            ErrorKind::Timeout => "The request timed out. Please try again.".into(),
            ErrorKind::Authentication => "Your session has expired. Please sign in again.".into(),
            ErrorKind::Authorization => "You don't have permission to perform this action.".into(),
            ErrorKind::NotFound => "The requested item could not be found.".into(),
            ErrorKind::RateLimited => "Too many requests. Please wait a moment and try again.".into(),
            ErrorKind::Storage => "Unable to save data on this device.".into(),
            ErrorKind::Serialization | ErrorKind::Deserialization => {
                "A data error occurred. Please contact support if this persists.".into()
            }
            ErrorKind::Location => {
                "Unable to determine your location. Please check your GPS settings.".into()
            }
            ErrorKind::LocationPermissionDenied => "Location permission required".into(),
            ErrorKind::InvalidState => "The app is in an invalid state. Please restart the app.".into(),
            ErrorKind::Validation
            | ErrorKind::Conflict
            | ErrorKind::Launch
            | ErrorKind::Internal
            | ErrorKind::Unknown => {
                "An unexpected error occurred. Please try again or contact support.".into()
            }
        }
    }

    #[must_use]
    pub fn from_http_status(status: u16, body: &[u8]) -> Self {
        let kind = match status {
            400 | 422 => ErrorKind::Validation,
            401 => ErrorKind::Authentication,
            403 => ErrorKind::Authorization,
            404 => ErrorKind::NotFound,
            409 => ErrorKind::Conflict,
            429 => ErrorKind::RateLimited,
            408 => ErrorKind::Timeout,
            500..=599 => ErrorKind::Internal,
            _ => ErrorKind::Unknown,
        };

        Self::new(kind, server_message(status, body)).with_context("http_status", status.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message)?;
        if let Some(internal) = &self.internal_message {
            write!(f, " (internal: {internal})")?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

/// Pulls a human readable message out of an error response body.
///
/// The backend is inconsistent: some routes answer `{ "error": ... }`, some
/// `{ "message": ... }`, and a few plain text. An empty body falls back to
/// `HTTP {status}`.
#[must_use]
pub fn server_message(status: u16, body: &[u8]) -> String {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
        for field in ["error", "message"] {
            if let Some(text) = value.get(field).and_then(serde_json::Value::as_str) {
                if !text.trim().is_empty() {
                    return text.to_string();
                }
            }
        }
    }

    match std::str::from_utf8(body).map(str::trim) {
        Ok(text) if !text.is_empty() => text.to_string(),
        _ => format!("HTTP {status}"),
    }
}

impl From<HttpError> for AppError {
    fn from(e: HttpError) -> Self {
        match &e {
            HttpError::Timeout { .. } => {
                AppError::new(ErrorKind::Timeout, "Request timed out").with_internal(e.to_string())
            }
            HttpError::ConnectionError { .. } | HttpError::Offline => {
                AppError::new(ErrorKind::Network, "Network error").with_internal(e.to_string())
            }
            HttpError::InvalidUrl { .. }
            | HttpError::PrivateNetworkBlocked { .. }
            | HttpError::InvalidHeader { .. }
            | HttpError::InvalidRequest { .. } => {
                AppError::new(ErrorKind::Internal, "Request could not be built")
                    .with_internal(e.to_string())
            }
            HttpError::SerializationError { .. } => {
                AppError::new(ErrorKind::Serialization, "Request could not be encoded")
                    .with_internal(e.to_string())
            }
            HttpError::InvalidResponse { .. } => {
                AppError::new(ErrorKind::Deserialization, "Unexpected server response")
                    .with_internal(e.to_string())
            }
        }
    }
}

impl From<KvError> for AppError {
    fn from(e: KvError) -> Self {
        let kind = match &e {
            KvError::Serialization { .. } => ErrorKind::Deserialization,
            KvError::InvalidKey { .. } => ErrorKind::Internal,
            KvError::ValueTooLarge { .. } | KvError::Storage { .. } => ErrorKind::Storage,
        };
        AppError::new(kind, "Local storage failed").with_internal(e.to_string())
    }
}

impl From<LocationError> for AppError {
    fn from(e: LocationError) -> Self {
        match e {
            LocationError::PermissionDenied => {
                AppError::new(ErrorKind::LocationPermissionDenied, "Location permission required")
            }
            other => AppError::new(ErrorKind::Location, "Unable to get location")
                .with_internal(other.to_string()),
        }
    }
}

impl From<LauncherError> for AppError {
    fn from(e: LauncherError) -> Self {
        AppError::new(ErrorKind::Launch, e.to_string())
    }
}
