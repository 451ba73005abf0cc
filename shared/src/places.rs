//! Safe places: normalisation of server records, police detection and the
//! nearest-police pick that drives the "navigate" button.

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::geo::{haversine_distance, GeoPoint};

pub const POLICE_TYPES: [&str; 3] = ["police", "police_station", "police-station"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SafePlace {
    pub id: String,
    pub name: String,
    pub address: String,
    pub point: Option<GeoPoint>,
    pub server_distance_m: Option<f64>,
    pub created_at: Option<String>,
    pub kind: Option<String>,
    pub meta: Value,
}

fn id_of(value: &Value) -> Option<String> {
    ["_id", "id"].iter().find_map(|field| match value.get(*field) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn str_field(value: &Value, field: &str) -> Option<String> {
    value
        .get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl SafePlace {
    /// Normalises one record from `/api/safeplaces`. Records without an id
    /// cannot be deleted or keyed and are dropped.
    #[must_use]
    pub fn from_server(value: &Value) -> Option<Self> {
        let id = id_of(value)?;
        let meta = match value.get("meta") {
            Some(meta @ Value::Object(_)) => meta.clone(),
            _ => Value::Object(Map::new()),
        };
        let kind = str_field(value, "type").or_else(|| str_field(&meta, "type"));

        Some(Self {
            id,
            name: str_field(value, "name").unwrap_or_default(),
            address: str_field(value, "address").unwrap_or_default(),
            point: value.get("location").and_then(GeoPoint::from_geojson),
            server_distance_m: value
                .get("distanceMeters")
                .and_then(Value::as_f64)
                .filter(|d| d.is_finite()),
            created_at: str_field(value, "createdAt"),
            kind,
            meta,
        })
    }

    /// Parses a list response. Anything but an array yields no places.
    #[must_use]
    pub fn list_from_server(body: &Value) -> Vec<Self> {
        body.as_array()
            .map(|items| items.iter().filter_map(Self::from_server).collect())
            .unwrap_or_default()
    }

    /// The server shape, used for the on-device cache so that cached and
    /// fresh lists go through the same normalisation.
    #[must_use]
    pub fn to_server(&self) -> Value {
        let mut out = json!({
            "_id": self.id,
            "name": self.name,
            "address": self.address,
            "type": self.kind,
            "meta": self.meta,
        });
        if let Some(point) = self.point {
            out["location"] = serde_json::to_value(point.to_geojson()).unwrap_or(Value::Null);
        }
        if let Some(distance) = self.server_distance_m {
            out["distanceMeters"] = json!(distance);
        }
        if let Some(created) = &self.created_at {
            out["createdAt"] = json!(created);
        }
        out
    }

    #[must_use]
    pub fn is_police(&self) -> bool {
        let meta_type = self.meta.get("type").and_then(Value::as_str);
        let typed = [self.kind.as_deref(), meta_type]
            .into_iter()
            .flatten()
            .any(|t| POLICE_TYPES.contains(&t.to_lowercase().as_str()));

        typed || contains_word(&self.name, "police") || contains_word(&self.address, "police")
    }

    /// Server distance when it sent one, otherwise great-circle distance from
    /// `origin`. `None` when neither is available.
    #[must_use]
    pub fn distance_from(&self, origin: Option<GeoPoint>) -> Option<f64> {
        self.server_distance_m.or_else(|| {
            let (origin, point) = (origin?, self.point?);
            Some(haversine_distance(origin, point))
        })
    }
}

/// Case-insensitive whole-word search; ASCII letters, digits and `_` are
/// word characters, so accented neighbours still end a word.
fn contains_word(haystack: &str, word: &str) -> bool {
    let haystack = haystack.to_lowercase();
    let is_word_char = |c: char| c.is_ascii_alphanumeric() || c == '_';

    haystack.match_indices(word).any(|(start, matched)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + matched.len()..].chars().next();
        !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
    })
}

/// The closest police place and its distance. Unknown distances rank last;
/// on ties the earlier place wins.
#[must_use]
pub fn nearest_police(places: &[SafePlace], origin: Option<GeoPoint>) -> Option<(&SafePlace, Option<f64>)> {
    let mut best: Option<(&SafePlace, Option<f64>)> = None;
    for place in places.iter().filter(|p| p.is_police()) {
        let distance = place.distance_from(origin);
        let rank = distance.unwrap_or(f64::INFINITY);
        match best {
            Some((_, current)) if current.unwrap_or(f64::INFINITY) <= rank => {}
            _ => best = Some((place, distance)),
        }
    }
    best
}

/// Where "navigate" goes: the nearest police place, else the first place.
#[must_use]
pub fn top_target(places: &[SafePlace], origin: Option<GeoPoint>) -> Option<&SafePlace> {
    nearest_police(places, origin)
        .map(|(place, _)| place)
        .or_else(|| places.first())
}

#[must_use]
pub fn default_place_name(existing: usize) -> String {
    format!("Safe Place {}", existing + 1)
}

#[must_use]
pub fn nearby_path(origin: GeoPoint, radius_m: u32) -> String {
    format!(
        "/api/safeplaces?lat={}&lng={}&radius={radius_m}&mine=true",
        origin.lat(),
        origin.lon()
    )
}

#[must_use]
pub fn create_body(name: &str, address: Option<&str>, point: GeoPoint) -> Value {
    json!({
        "name": name,
        "address": address.unwrap_or_default(),
        "latitude": point.lat(),
        "longitude": point.lon(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(value: Value) -> SafePlace {
        SafePlace::from_server(&value).unwrap()
    }

    fn origin() -> GeoPoint {
        GeoPoint::new(31.5204, 74.3587).unwrap()
    }

    mod normalize_tests {
        use super::*;

        #[test]
        fn test_reads_server_record() {
            let p = place(json!({
                "_id": "p1",
                "name": "Model Town Police Station",
                "address": "Model Town, Lahore",
                "location": {"type": "Point", "coordinates": [74.3250, 31.4834]},
                "distanceMeters": 4210.5,
                "createdAt": "2024-05-01T10:00:00.000Z",
                "meta": {"type": "police"}
            }));
            assert_eq!(p.id, "p1");
            assert_eq!(p.kind.as_deref(), Some("police"));
            let point = p.point.unwrap();
            assert_eq!((point.lat(), point.lon()), (31.4834, 74.3250));
            assert_eq!(p.server_distance_m, Some(4210.5));
        }

        #[test]
        fn test_id_fallback_and_drop() {
            assert_eq!(place(json!({"id": "x"})).id, "x");
            assert!(SafePlace::from_server(&json!({"name": "no id"})).is_none());
        }

        #[test]
        fn test_non_numeric_distance_is_ignored() {
            let p = place(json!({"_id": "a", "distanceMeters": "far"}));
            assert_eq!(p.server_distance_m, None);
        }

        #[test]
        fn test_non_array_list_is_empty() {
            assert!(SafePlace::list_from_server(&json!({"error": "nope"})).is_empty());
            let list = SafePlace::list_from_server(&json!([{"_id": "a"}, {"name": "b"}]));
            assert_eq!(list.len(), 1);
        }

        #[test]
        fn test_cache_shape_normalises_back() {
            let original = place(json!({
                "_id": "p1",
                "name": "Home",
                "location": {"type": "Point", "coordinates": [74.3, 31.5]},
                "createdAt": "2024-05-01T10:00:00.000Z",
            }));
            assert_eq!(place(original.to_server()), original);
        }
    }

    mod police_tests {
        use super::*;

        #[test]
        fn test_type_match() {
            for kind in ["police", "Police_Station", "police-station"] {
                assert!(place(json!({"_id": "a", "type": kind})).is_police(), "{kind}");
            }
            assert!(place(json!({"_id": "a", "meta": {"type": "POLICE"}})).is_police());
        }

        #[test]
        fn test_word_boundary_match() {
            assert!(place(json!({"_id": "a", "name": "Gulberg Police Station"})).is_police());
            assert!(place(json!({"_id": "a", "address": "near police-line 3"})).is_police());
            assert!(!place(json!({"_id": "a", "name": "Policeman's cafe"})).is_police());
            assert!(!place(json!({"_id": "a", "name": "traffic_police hq"})).is_police());
            assert!(!place(json!({"_id": "a", "name": "Home"})).is_police());
        }

        #[test]
        fn test_non_ascii_neighbours_end_the_word() {
            assert!(place(json!({"_id": "a", "name": "policeé"})).is_police());
            assert!(place(json!({"_id": "a", "name": "ñpolice"})).is_police());
            assert!(place(json!({"_id": "a", "address": "Thana police، Lahore"})).is_police());
        }
    }

    mod nearest_tests {
        use super::*;

        #[test]
        fn test_prefers_smallest_distance() {
            let places = vec![
                place(json!({"_id": "far", "type": "police", "distanceMeters": 900})),
                place(json!({"_id": "home", "distanceMeters": 10})),
                place(json!({"_id": "near", "type": "police", "distanceMeters": 300})),
            ];
            let (best, distance) = nearest_police(&places, None).unwrap();
            assert_eq!(best.id, "near");
            assert_eq!(distance, Some(300.0));
        }

        #[test]
        fn test_computes_distance_from_origin() {
            let places = vec![
                place(json!({"_id": "unknown", "type": "police"})),
                place(json!({
                    "_id": "located",
                    "type": "police",
                    "location": {"type": "Point", "coordinates": [74.3587, 31.5304]}
                })),
            ];
            let (best, distance) = nearest_police(&places, Some(origin())).unwrap();
            assert_eq!(best.id, "located");
            assert!((distance.unwrap() - 1112.0).abs() < 5.0);
        }

        #[test]
        fn test_first_wins_ties_and_unknowns() {
            let places = vec![
                place(json!({"_id": "a", "type": "police"})),
                place(json!({"_id": "b", "type": "police"})),
            ];
            assert_eq!(nearest_police(&places, None).unwrap().0.id, "a");
        }

        #[test]
        fn test_top_target_falls_back_to_first() {
            let places = vec![place(json!({"_id": "home"})), place(json!({"_id": "work"}))];
            assert!(nearest_police(&places, None).is_none());
            assert_eq!(top_target(&places, None).unwrap().id, "home");
            assert!(top_target(&[], None).is_none());
        }
    }

    mod request_tests {
        use super::*;

        #[test]
        fn test_default_name() {
            assert_eq!(default_place_name(0), "Safe Place 1");
            assert_eq!(default_place_name(4), "Safe Place 5");
        }

        #[test]
        fn test_nearby_path() {
            assert_eq!(
                nearby_path(origin(), 5000),
                "/api/safeplaces?lat=31.5204&lng=74.3587&radius=5000&mine=true"
            );
        }

        #[test]
        fn test_create_body() {
            let body = create_body("Safe Place 1", None, origin());
            assert_eq!(body["address"], "");
            assert_eq!(body["latitude"], 31.5204);
        }
    }
}
