//! Coordinates, great-circle distance and the human readable formats the
//! screens show for them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Platform;
use crate::{AppError, ErrorKind, EARTH_RADIUS_M, WALKING_SPEED_M_PER_MIN};

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum CoordinateError {
    #[error("Latitude {0} is out of valid range [-90, 90]")]
    LatitudeOutOfRange(f64),
    #[error("Longitude {0} is out of valid range [-180, 180]")]
    LongitudeOutOfRange(f64),
    #[error("Coordinate value is not finite (NaN or Infinity)")]
    NonFinite,
}

impl From<CoordinateError> for AppError {
    fn from(e: CoordinateError) -> Self {
        AppError::new(ErrorKind::Validation, e.to_string())
    }
}

/// A validated WGS84 position. Construction rejects NaN, infinities and
/// out-of-range values, so every `GeoPoint` is safe to feed into distance
/// math and URL builders.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPoint", into = "RawPoint")]
pub struct GeoPoint {
    lat: f64,
    lon: f64,
}

#[derive(Serialize, Deserialize)]
struct RawPoint {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawPoint> for GeoPoint {
    type Error = CoordinateError;

    fn try_from(raw: RawPoint) -> Result<Self, Self::Error> {
        Self::new(raw.latitude, raw.longitude)
    }
}

impl From<GeoPoint> for RawPoint {
    fn from(p: GeoPoint) -> Self {
        Self {
            latitude: p.lat,
            longitude: p.lon,
        }
    }
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Result<Self, CoordinateError> {
        if !lat.is_finite() || !lon.is_finite() {
            return Err(CoordinateError::NonFinite);
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(CoordinateError::LatitudeOutOfRange(lat));
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(CoordinateError::LongitudeOutOfRange(lon));
        }
        Ok(Self { lat, lon })
    }

    #[must_use]
    pub const fn lat(self) -> f64 {
        self.lat
    }

    #[must_use]
    pub const fn lon(self) -> f64 {
        self.lon
    }

    #[must_use]
    pub fn distance_to(self, other: Self) -> f64 {
        haversine_distance(self, other)
    }

    #[must_use]
    pub fn to_dms(self) -> String {
        format!(
            "{} {}",
            format_dms(self.lat, Axis::Latitude),
            format_dms(self.lon, Axis::Longitude)
        )
    }

    /// Reads a GeoJSON `Point`. GeoJSON orders positions `[lng, lat]`.
    #[must_use]
    pub fn from_geojson(value: &serde_json::Value) -> Option<Self> {
        let geometry: geojson::Geometry = serde_json::from_value(value.clone()).ok()?;
        match geometry.value {
            geojson::Value::Point(position) if position.len() >= 2 => {
                Self::new(position[1], position[0]).ok()
            }
            _ => None,
        }
    }

    #[must_use]
    pub fn to_geojson(self) -> geojson::Geometry {
        geojson::Geometry::new(geojson::Value::Point(vec![self.lon, self.lat]))
    }

    #[must_use]
    pub fn google_maps_link(self) -> String {
        format!(
            "https://www.google.com/maps/search/?api=1&query={},{}",
            self.lat, self.lon
        )
    }

    #[must_use]
    pub fn directions_url(self, platform: Platform) -> String {
        match platform {
            Platform::Ios => format!("maps:0,0?q={},{}", self.lat, self.lon),
            Platform::Android => format!("geo:{0},{1}?q={0},{1}", self.lat, self.lon),
        }
    }
}

#[must_use]
pub fn haversine_distance(p1: GeoPoint, p2: GeoPoint) -> f64 {
    const EPSILON: f64 = 1e-10;

    if (p1.lat - p2.lat).abs() < EPSILON && (p1.lon - p2.lon).abs() < EPSILON {
        return 0.0;
    }

    let lat1 = p1.lat.to_radians();
    let lat2 = p2.lat.to_radians();
    let d_lat = (p2.lat - p1.lat).to_radians();
    let d_lon = (p2.lon - p1.lon).to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    let a = a.clamp(0.0, 1.0);

    EARTH_RADIUS_M * 2.0 * a.sqrt().asin()
}

#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn walking_minutes(meters: f64) -> u64 {
    if !meters.is_finite() || meters <= 0.0 {
        return 1;
    }
    ((meters / WALKING_SPEED_M_PER_MIN).round() as u64).max(1)
}

#[must_use]
pub fn format_walking_time(meters: Option<f64>) -> String {
    let Some(meters) = meters.filter(|m| m.is_finite()) else {
        return "—".into();
    };

    let minutes = walking_minutes(meters);
    if minutes < 60 {
        return format!("{minutes} min Walking");
    }

    let hours = minutes / 60;
    match minutes % 60 {
        0 => format!("{hours} hr Walking"),
        rest => format!("{hours} hr {rest} min Walking"),
    }
}

#[must_use]
pub fn format_distance(meters: Option<f64>) -> String {
    match meters {
        Some(m) if m.is_finite() && m >= 0.0 => {
            if m < 1000.0 {
                format!("{:.0} m", m.round())
            } else {
                format!("{:.2} km", m / 1000.0)
            }
        }
        _ => "—".into(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Latitude,
    Longitude,
}

impl Axis {
    const fn hemisphere(self, non_negative: bool) -> char {
        match (self, non_negative) {
            (Self::Latitude, true) => 'N',
            (Self::Latitude, false) => 'S',
            (Self::Longitude, true) => 'E',
            (Self::Longitude, false) => 'W',
        }
    }
}

#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn format_dms(value: f64, axis: Axis) -> String {
    let abs = value.abs();
    let mut degrees = abs.floor() as u32;
    let minutes_full = (abs - f64::from(degrees)) * 60.0;
    let mut minutes = minutes_full.floor() as u32;
    let mut seconds = ((minutes_full - f64::from(minutes)) * 60.0 * 10.0).round() / 10.0;

    // 59.96" rounds to 60.0"
    if seconds >= 60.0 {
        seconds = 0.0;
        minutes += 1;
    }
    if minutes >= 60 {
        minutes = 0;
        degrees += 1;
    }

    format!(
        "{degrees}°{minutes}'{seconds:.1}\"{}",
        axis.hemisphere(value >= 0.0)
    )
}
