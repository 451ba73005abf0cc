// lib.rs - SHEILD shared core

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]

pub mod account;
pub mod app;
pub mod capabilities;
pub mod config;
pub mod contacts;
pub mod countdown;
pub mod directory;
pub mod error;
pub mod event;
pub mod geo;
pub mod geocode;
pub mod greeting;
pub mod model;
pub mod places;
pub mod session;
pub mod sos;
pub mod view;

pub use app::App;
pub use capabilities::{Capabilities, Effect};
pub use config::{AppConfig, Platform};
pub use error::{AppError, AppResult, ErrorKind, ErrorSeverity};
pub use event::Event;
pub use geo::GeoPoint;
pub use model::{Model, Screen};
pub use view::ViewModel;

pub use crux_core::{render::Render, App as CruxApp};

pub const DEFAULT_API_BASE_URL: &str = "https://sheild-backend-production.up.railway.app";
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;
pub const WALKING_SPEED_M_PER_MIN: f64 = 5000.0 / 60.0;

pub const COUNTDOWN_START: u8 = 3;
pub const COUNTDOWN_TICK_MS: u64 = 1000;
pub const SPLASH_DURATION_MS: u64 = 3000;
pub const ONBOARDING_PAGE_MS: u64 = 3000;
pub const ONBOARDING_PAGES: u8 = 6;

pub const GEOCODE_MIN_INTERVAL_MS: u64 = 8000;
pub const GEOCODE_MIN_DISTANCE_M: f64 = 50.0;
pub const NEARBY_REFRESH_INTERVAL_MS: u64 = 4000;
pub const WATCH_DISTANCE_INTERVAL_M: f64 = 5.0;
pub const WATCH_TIME_INTERVAL_MS: u64 = 3000;
pub const SAFE_PLACE_RADIUS_M: u32 = 5000;
pub const CONTACT_DISPATCH_GAP_MS: u64 = 400;
pub const REQUEST_TIMEOUT_MS: u64 = 30_000;
pub const GREETING_UTC_OFFSET_MINUTES: i32 = 5 * 60;

pub const TOAST_DURATION_MS: u64 = 3000;
pub const SAFETY_TIP_MIN_INTERVAL_MS: u64 = 120_000;
pub const SAFETY_TIP_MAX_INTERVAL_MS: u64 = 180_000;
pub const CANCEL_PIN_DIGITS: usize = 4;

#[must_use]
pub fn get_current_time_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Milliseconds since the Unix epoch, rendered the way the backend expects
/// (`2024-05-01T10:00:00.000Z`).
#[must_use]
pub fn iso_timestamp(ms: u64) -> String {
    let millis = i64::try_from(ms).unwrap_or(i64::MAX);
    chrono::DateTime::<chrono::Utc>::from_timestamp_millis(millis)
        .unwrap_or_default()
        .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
