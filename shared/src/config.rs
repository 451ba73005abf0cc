use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capabilities::{HttpError, ValidatedUrl};
use crate::{
    AppError, ErrorKind, CONTACT_DISPATCH_GAP_MS, COUNTDOWN_START, COUNTDOWN_TICK_MS,
    DEFAULT_API_BASE_URL, GEOCODE_MIN_DISTANCE_M, GEOCODE_MIN_INTERVAL_MS,
    GREETING_UTC_OFFSET_MINUTES, NEARBY_REFRESH_INTERVAL_MS, REQUEST_TIMEOUT_MS,
    SAFE_PLACE_RADIUS_M, WATCH_DISTANCE_INTERVAL_M, WATCH_TIME_INTERVAL_MS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    #[default]
    Android,
    Ios,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("invalid API base URL: {0}")]
    InvalidBaseUrl(#[from] HttpError),
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
    #[error("{field} must be a finite, non-negative distance")]
    BadDistance { field: &'static str },
    #[error("UTC offset {0} minutes is outside -12:00..+14:00")]
    UtcOffset(i32),
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::new(ErrorKind::InvalidState, "Invalid configuration").with_internal(e.to_string())
    }
}

/// Runtime settings supplied by the shell on `AppStarted`. Every field has a
/// default, so shells only send what they override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_base_url: String,
    pub platform: Platform,
    pub allow_private_network: bool,
    pub request_timeout_ms: u64,
    pub safe_place_radius_m: u32,
    pub countdown_start: u8,
    pub countdown_tick_ms: u64,
    pub geocode_min_interval_ms: u64,
    pub geocode_min_distance_m: f64,
    pub nearby_refresh_interval_ms: u64,
    pub watch_distance_interval_m: f64,
    pub watch_time_interval_ms: u64,
    pub contact_dispatch_gap_ms: u64,
    pub utc_offset_minutes: i32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            platform: Platform::default(),
            allow_private_network: false,
            request_timeout_ms: REQUEST_TIMEOUT_MS,
            safe_place_radius_m: SAFE_PLACE_RADIUS_M,
            countdown_start: COUNTDOWN_START,
            countdown_tick_ms: COUNTDOWN_TICK_MS,
            geocode_min_interval_ms: GEOCODE_MIN_INTERVAL_MS,
            geocode_min_distance_m: GEOCODE_MIN_DISTANCE_M,
            nearby_refresh_interval_ms: NEARBY_REFRESH_INTERVAL_MS,
            watch_distance_interval_m: WATCH_DISTANCE_INTERVAL_M,
            watch_time_interval_ms: WATCH_TIME_INTERVAL_MS,
            contact_dispatch_gap_ms: CONTACT_DISPATCH_GAP_MS,
            utc_offset_minutes: GREETING_UTC_OFFSET_MINUTES,
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.base_url()?;

        let intervals = [
            ("request_timeout_ms", self.request_timeout_ms),
            ("countdown_tick_ms", self.countdown_tick_ms),
            ("watch_time_interval_ms", self.watch_time_interval_ms),
            ("safe_place_radius_m", u64::from(self.safe_place_radius_m)),
            ("countdown_start", u64::from(self.countdown_start)),
        ];
        if let Some((field, _)) = intervals.iter().find(|(_, v)| *v == 0) {
            return Err(ConfigError::Zero { field: *field });
        }

        for (field, value) in [
            ("geocode_min_distance_m", self.geocode_min_distance_m),
            ("watch_distance_interval_m", self.watch_distance_interval_m),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::BadDistance { field });
            }
        }

        if !(-12 * 60..=14 * 60).contains(&self.utc_offset_minutes) {
            return Err(ConfigError::UtcOffset(self.utc_offset_minutes));
        }

        Ok(())
    }

    pub fn base_url(&self) -> Result<ValidatedUrl, HttpError> {
        let trimmed = self.api_base_url.trim_end_matches('/');
        if self.allow_private_network {
            ValidatedUrl::new_allowing_private(trimmed)
        } else {
            ValidatedUrl::new(trimmed)
        }
    }

    /// Absolute URL for an API path such as `/api/contacts`.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        let base = self.api_base_url.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }

    pub fn endpoint_url(&self, path: &str) -> Result<ValidatedUrl, HttpError> {
        let endpoint = self.endpoint(path);
        if self.allow_private_network {
            ValidatedUrl::new_allowing_private(endpoint)
        } else {
            ValidatedUrl::new(endpoint)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"platform":"ios","countdown_start":5}"#).unwrap();
        assert_eq!(config.platform, Platform::Ios);
        assert_eq!(config.countdown_start, 5);
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.contact_dispatch_gap_ms, 400);
    }

    #[test]
    fn test_rejects_private_base_url() {
        let config = AppConfig {
            api_base_url: "http://192.168.0.102:5000".into(),
            ..AppConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidBaseUrl(_))));
    }

    #[test]
    fn test_private_base_url_when_allowed() {
        let config = AppConfig {
            api_base_url: "http://192.168.0.102:5000".into(),
            allow_private_network: true,
            ..AppConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_tick() {
        let config = AppConfig {
            countdown_tick_ms: 0,
            ..AppConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Zero {
                field: "countdown_tick_ms"
            })
        ));
    }

    #[test]
    fn test_rejects_bad_offset() {
        let config = AppConfig {
            utc_offset_minutes: 15 * 60,
            ..AppConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::UtcOffset(_))));
    }

    #[test]
    fn test_endpoint_joins_paths() {
        let config = AppConfig {
            api_base_url: "https://api.example.com/".into(),
            ..AppConfig::default()
        };
        assert_eq!(config.endpoint("/api/contacts"), "https://api.example.com/api/contacts");
        assert_eq!(config.endpoint("api/alerts"), "https://api.example.com/api/alerts");
    }
}
