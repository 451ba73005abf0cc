//! Reverse geocoding results, the persisted "current location" record and
//! the throttle that keeps the device from geocoding on every GPS jitter.

use serde::{Deserialize, Serialize};

use crate::geo::{CoordinateError, GeoPoint};
use crate::{iso_timestamp, GEOCODE_MIN_DISTANCE_M, GEOCODE_MIN_INTERVAL_MS};

/// One reverse-geocode candidate as the platform reports it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Placemark {
    pub name: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

impl Placemark {
    /// Non-empty parts joined with ", ", or `None` when nothing is known.
    #[must_use]
    pub fn format_address(&self) -> Option<String> {
        let parts: Vec<&str> = [
            &self.name,
            &self.street,
            &self.city,
            &self.region,
            &self.postal_code,
            &self.country,
        ]
        .into_iter()
        .filter_map(|part| part.as_deref().map(str::trim))
        .filter(|part| !part.is_empty())
        .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}

/// Address of the first placemark that yields one.
#[must_use]
pub fn first_address(placemarks: &[Placemark]) -> Option<String> {
    placemarks.iter().find_map(Placemark::format_address)
}

/// The location record shared by the dashboard, SOS and safe-places screens,
/// stored under `CURRENT_LOCATION_V1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub dms: String,
    pub address: Option<String>,
    pub timestamp: String,
}

impl CanonicalLocation {
    #[must_use]
    pub fn new(point: GeoPoint, address: Option<String>, timestamp_ms: u64) -> Self {
        Self {
            latitude: point.lat(),
            longitude: point.lon(),
            dms: point.to_dms(),
            address,
            timestamp: iso_timestamp(timestamp_ms),
        }
    }

    pub fn point(&self) -> Result<GeoPoint, CoordinateError> {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeThrottle {
    min_interval_ms: u64,
    min_distance_m: f64,
    last_attempt_ms: Option<u64>,
    last_saved: Option<GeoPoint>,
}

impl Default for GeocodeThrottle {
    fn default() -> Self {
        Self::new(GEOCODE_MIN_INTERVAL_MS, GEOCODE_MIN_DISTANCE_M)
    }
}

impl GeocodeThrottle {
    #[must_use]
    pub fn new(min_interval_ms: u64, min_distance_m: f64) -> Self {
        Self {
            min_interval_ms,
            min_distance_m,
            last_attempt_ms: None,
            last_saved: None,
        }
    }

    /// A forced request always proceeds. Otherwise both the interval since
    /// the last attempt and the distance from the last saved point must be
    /// exceeded; a missing reference counts as infinitely far.
    #[must_use]
    pub fn should_attempt(&self, now_ms: u64, point: GeoPoint, force: bool) -> bool {
        if force {
            return true;
        }

        #[allow(clippy::cast_precision_loss)]
        let elapsed = self
            .last_attempt_ms
            .map_or(f64::INFINITY, |t| now_ms.saturating_sub(t) as f64);
        let moved = self
            .last_saved
            .map_or(f64::INFINITY, |saved| saved.distance_to(point));

        #[allow(clippy::cast_precision_loss)]
        let interval = self.min_interval_ms as f64;
        elapsed > interval && moved > self.min_distance_m
    }

    pub fn record_attempt(&mut self, now_ms: u64) {
        self.last_attempt_ms = Some(now_ms);
    }

    pub fn record_saved(&mut self, point: GeoPoint) {
        self.last_saved = Some(point);
    }

    #[must_use]
    pub fn last_saved(&self) -> Option<GeoPoint> {
        self.last_saved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lahore() -> GeoPoint {
        GeoPoint::new(31.5204, 74.3587).unwrap()
    }

    mod placemark_tests {
        use super::*;

        #[test]
        fn test_joins_non_empty_parts() {
            let p = Placemark {
                name: Some("Gulberg".into()),
                street: Some(String::new()),
                city: Some("Lahore".into()),
                region: None,
                postal_code: Some("54000".into()),
                country: Some("Pakistan".into()),
            };
            assert_eq!(p.format_address().as_deref(), Some("Gulberg, Lahore, 54000, Pakistan"));
        }

        #[test]
        fn test_all_empty_is_none() {
            let p = Placemark {
                name: Some("  ".into()),
                ..Placemark::default()
            };
            assert_eq!(p.format_address(), None);
        }

        #[test]
        fn test_reads_camel_case_postal_code() {
            let p: Placemark =
                serde_json::from_str(r#"{"city":"Karachi","postalCode":"74000"}"#).unwrap();
            assert_eq!(p.postal_code.as_deref(), Some("74000"));
        }

        #[test]
        fn test_first_address_skips_empty_candidates() {
            let candidates = vec![
                Placemark::default(),
                Placemark {
                    city: Some("Islamabad".into()),
                    ..Placemark::default()
                },
            ];
            assert_eq!(first_address(&candidates).as_deref(), Some("Islamabad"));
        }
    }

    mod canonical_tests {
        use super::*;

        #[test]
        fn test_null_address_is_serialized() {
            let loc = CanonicalLocation::new(lahore(), None, 0);
            let json = serde_json::to_value(&loc).unwrap();
            assert!(json["address"].is_null());
            assert_eq!(json["timestamp"], "1970-01-01T00:00:00.000Z");
            assert_eq!(json["latitude"], 31.5204);
        }

        #[test]
        fn test_dms_matches_point() {
            let loc = CanonicalLocation::new(lahore(), Some("Lahore".into()), 0);
            assert_eq!(loc.dms, lahore().to_dms());
            assert_eq!(loc.point().unwrap(), lahore());
        }
    }

    mod throttle_tests {
        use super::*;

        #[test]
        fn test_first_attempt_proceeds() {
            let throttle = GeocodeThrottle::default();
            assert!(throttle.should_attempt(0, lahore(), false));
        }

        #[test]
        fn test_recent_attempt_blocks() {
            let mut throttle = GeocodeThrottle::default();
            throttle.record_attempt(10_000);
            assert!(!throttle.should_attempt(15_000, lahore(), false));
            assert!(throttle.should_attempt(18_001, lahore(), false));
        }

        #[test]
        fn test_small_movement_blocks_even_after_interval() {
            let mut throttle = GeocodeThrottle::default();
            throttle.record_attempt(0);
            throttle.record_saved(lahore());
            let nearby = GeoPoint::new(31.5206, 74.3587).unwrap();
            assert!(!throttle.should_attempt(60_000, nearby, false));

            let far = GeoPoint::new(31.53, 74.3587).unwrap();
            assert!(throttle.should_attempt(60_000, far, false));
        }

        #[test]
        fn test_boundaries_are_exclusive() {
            let mut throttle = GeocodeThrottle::default();
            throttle.record_attempt(1000);
            assert!(!throttle.should_attempt(9000, lahore(), false));
        }

        #[test]
        fn test_force_bypasses_everything() {
            let mut throttle = GeocodeThrottle::default();
            throttle.record_attempt(1000);
            throttle.record_saved(lahore());
            assert!(throttle.should_attempt(1001, lahore(), true));
        }

        #[test]
        fn test_attempt_without_save_keeps_distance_infinite() {
            let mut throttle = GeocodeThrottle::default();
            throttle.record_attempt(0);
            assert!(throttle.last_saved().is_none());
            assert!(throttle.should_attempt(8001, lahore(), false));
        }
    }
}
