//! SOS message composition, share URLs, alert payloads and the state of one
//! visit to the SOS screen.

use std::collections::{BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::capabilities::TimerId;
use crate::config::Platform;
use crate::contacts::Contact;
use crate::countdown::Countdown;
use crate::geocode::CanonicalLocation;

pub const SOS_HEADLINE: &str = "🚨 SOS — I need help.";
pub const SOS_FOOTER: &str = "(Shared from SHEILD app)";

#[must_use]
pub fn compose_message(location: Option<&CanonicalLocation>) -> String {
    let Some(loc) = location else {
        return format!("{SOS_HEADLINE} Location not available.");
    };

    let maps = format!(
        "https://www.google.com/maps/search/?api=1&query={},{}",
        loc.latitude, loc.longitude
    );
    let detail = match loc.address.as_deref().filter(|a| !a.is_empty()) {
        Some(address) => format!("Address: {address}"),
        None => format!("Coords: {}", loc.dms),
    };
    [SOS_HEADLINE.to_string(), format!("Location: {maps}"), detail, SOS_FOOTER.to_string()].join("\n")
}

/// Percent-encodes text for a URL query value (spaces as `%20`).
#[must_use]
pub fn encode(text: &str) -> String {
    url::form_urlencoded::byte_serialize(text.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

#[must_use]
pub fn sms_url(platform: Platform, phone: &str, message: &str) -> String {
    let separator = match platform {
        Platform::Ios => '&',
        Platform::Android => '?',
    };
    format!("sms:{phone}{separator}body={}", encode(message))
}

#[must_use]
pub fn whatsapp_url(message: &str) -> String {
    format!("whatsapp://send?text={}", encode(message))
}

#[must_use]
pub fn whatsapp_web_url(message: &str) -> String {
    format!("https://wa.me/?text={}", encode(message))
}

fn location_fields(location: Option<&CanonicalLocation>) -> (Value, Value) {
    match location {
        Some(loc) => (
            json!({"latitude": loc.latitude, "longitude": loc.longitude}),
            json!({"dms": loc.dms, "address": loc.address, "timestamp": loc.timestamp}),
        ),
        None => (Value::Null, Value::Null),
    }
}

/// Body of `POST /api/alerts`.
#[must_use]
pub fn alert_body(timestamp: &str, location: Option<&CanonicalLocation>) -> Value {
    let (location, meta) = location_fields(location);
    json!({
        "type": "SOS",
        "timestamp": timestamp,
        "location": location,
        "meta": meta,
    })
}

/// Body of `POST /api/alerts/send-to-contacts`.
#[must_use]
pub fn contacts_alert_body(contacts: &[Contact], location: Option<&CanonicalLocation>) -> Value {
    let (location, meta) = location_fields(location);
    let contacts: Vec<Value> = contacts
        .iter()
        .map(|c| json!({"id": c.id, "name": c.name, "phone": c.phone}))
        .collect();
    json!({
        "contacts": contacts,
        "location": location,
        "meta": meta,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchStep {
    /// Open the SMS composer; wait the dispatch gap afterwards.
    Sms { url: String },
    /// No phone on file: fall back to the share sheet.
    Share,
}

/// Opens one share prompt per selected contact, in selection order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactDispatch {
    queue: VecDeque<Contact>,
}

impl ContactDispatch {
    #[must_use]
    pub fn new(contacts: Vec<Contact>) -> Self {
        Self {
            queue: contacts.into(),
        }
    }

    pub fn next_step(&mut self, platform: Platform, message: &str) -> Option<DispatchStep> {
        let contact = self.queue.pop_front()?;
        Some(if contact.has_phone() {
            DispatchStep::Sms {
                url: sms_url(platform, &contact.phone, message),
            }
        } else {
            DispatchStep::Share
        })
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    #[default]
    NotSent,
    /// Fired while the location was still resolving.
    WaitingForLocation,
    Sending,
    Sent,
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ContactPicker {
    #[default]
    Closed,
    Loading,
    Ready {
        contacts: Vec<Contact>,
        selected: BTreeSet<String>,
    },
}

impl ContactPicker {
    #[must_use]
    pub fn ready(contacts: Vec<Contact>) -> Self {
        Self::Ready {
            contacts,
            selected: BTreeSet::new(),
        }
    }

    pub fn toggle(&mut self, id: &str) {
        if let Self::Ready { contacts, selected } = self {
            if !contacts.iter().any(|c| c.id == id) {
                return;
            }
            if !selected.remove(id) {
                selected.insert(id.to_string());
            }
        }
    }

    /// Selected contacts in list order.
    #[must_use]
    pub fn selected_contacts(&self) -> Vec<Contact> {
        match self {
            Self::Ready { contacts, selected } => contacts
                .iter()
                .filter(|c| selected.contains(&c.id))
                .cloned()
                .collect(),
            Self::Closed | Self::Loading => Vec::new(),
        }
    }
}

/// Everything about the current SOS screen visit. Reset on every entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SosState {
    pub countdown: Countdown,
    pub snapshot: Option<CanonicalLocation>,
    pub locating: bool,
    pub alert: AlertStatus,
    pub picker: ContactPicker,
    pub dispatch: Option<ContactDispatch>,
    /// The pause between two contact prompts.
    pub gap_timer: Option<TimerId>,
    pub sending_to_contacts: bool,
}

impl SosState {
    #[must_use]
    pub fn message(&self) -> String {
        compose_message(self.snapshot.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoPoint;

    fn location(address: Option<&str>) -> CanonicalLocation {
        CanonicalLocation::new(
            GeoPoint::new(31.5204, 74.3587).unwrap(),
            address.map(str::to_string),
            0,
        )
    }

    fn contact(id: &str, phone: &str) -> Contact {
        Contact::from_server(&json!({"_id": id, "full_name": id, "phone": phone})).unwrap()
    }

    mod message_tests {
        use super::*;

        #[test]
        fn test_without_location() {
            assert_eq!(compose_message(None), "🚨 SOS — I need help. Location not available.");
        }

        #[test]
        fn test_with_address() {
            let msg = compose_message(Some(&location(Some("Gulberg, Lahore"))));
            assert_eq!(
                msg,
                "🚨 SOS — I need help.\n\
                 Location: https://www.google.com/maps/search/?api=1&query=31.5204,74.3587\n\
                 Address: Gulberg, Lahore\n\
                 (Shared from SHEILD app)"
            );
        }

        #[test]
        fn test_without_address_uses_dms() {
            let loc = location(None);
            let msg = compose_message(Some(&loc));
            assert!(msg.contains(&format!("Coords: {}", loc.dms)));
            assert!(!msg.contains("Address:"));
        }
    }

    mod url_tests {
        use super::*;

        #[test]
        fn test_encode_uses_percent_twenty() {
            assert_eq!(encode("I need help\n"), "I%20need%20help%0A");
            assert_eq!(encode("a&b=c"), "a%26b%3Dc");
        }

        #[test]
        fn test_sms_separator_per_platform() {
            assert_eq!(sms_url(Platform::Android, "0300", "hi there"), "sms:0300?body=hi%20there");
            assert_eq!(sms_url(Platform::Ios, "0300", "hi"), "sms:0300&body=hi");
        }

        #[test]
        fn test_whatsapp_urls() {
            assert_eq!(whatsapp_url("SOS"), "whatsapp://send?text=SOS");
            assert_eq!(whatsapp_web_url("S O S"), "https://wa.me/?text=S%20O%20S");
        }
    }

    mod payload_tests {
        use super::*;

        #[test]
        fn test_alert_body_with_location() {
            let body = alert_body("2024-05-01T10:00:00.000Z", Some(&location(None)));
            assert_eq!(body["type"], "SOS");
            assert_eq!(body["location"]["latitude"], 31.5204);
            assert!(body["meta"]["address"].is_null());
            assert_eq!(body["meta"]["timestamp"], "1970-01-01T00:00:00.000Z");
        }

        #[test]
        fn test_alert_body_without_location() {
            let body = alert_body("t", None);
            assert!(body["location"].is_null());
            assert!(body["meta"].is_null());
        }

        #[test]
        fn test_contacts_body() {
            let body = contacts_alert_body(&[contact("mom", "0300")], None);
            assert_eq!(body["contacts"][0]["phone"], "0300");
            assert!(body["location"].is_null());
        }
    }

    mod dispatch_tests {
        use super::*;

        #[test]
        fn test_steps_follow_selection() {
            let mut dispatch = ContactDispatch::new(vec![contact("a", "0300"), contact("b", "")]);
            assert_eq!(
                dispatch.next_step(Platform::Android, "x"),
                Some(DispatchStep::Sms {
                    url: "sms:0300?body=x".into()
                })
            );
            assert_eq!(dispatch.remaining(), 1);
            assert_eq!(dispatch.next_step(Platform::Android, "x"), Some(DispatchStep::Share));
            assert_eq!(dispatch.next_step(Platform::Android, "x"), None);
        }

        #[test]
        fn test_picker_toggle_and_order() {
            let mut picker = ContactPicker::ready(vec![contact("a", "1"), contact("b", "2")]);
            picker.toggle("b");
            picker.toggle("a");
            picker.toggle("zzz");
            let ids: Vec<_> = picker.selected_contacts().into_iter().map(|c| c.id).collect();
            assert_eq!(ids, ["a", "b"]);
            picker.toggle("a");
            assert_eq!(picker.selected_contacts().len(), 1);
        }
    }
}
