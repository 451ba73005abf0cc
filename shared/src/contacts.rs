use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::directory::SUPPORT_DEFAULTS;
use crate::AppError;

/// Support network rows shown before "show all" is pressed.
pub const SUPPORT_VISIBLE_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub relation: Option<String>,
    pub initials: String,
}

impl Contact {
    /// Accepts both the backend record (`_id`, `full_name`) and the shape this
    /// crate caches under `CONTACTS_V1` (`id`, `name`). A `{contact: ...}`
    /// envelope is unwrapped first.
    #[must_use]
    pub fn from_server(value: &Value) -> Option<Self> {
        let value = value.get("contact").unwrap_or(value);
        let id = ["_id", "id"].iter().find_map(|f| match value.get(*f) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })?;
        let text = |fields: &[&str]| {
            fields
                .iter()
                .find_map(|f| value.get(*f).and_then(Value::as_str))
                .unwrap_or_default()
                .trim()
                .to_string()
        };
        let name = text(&["full_name", "name"]);
        let relation = Some(text(&["relation"])).filter(|r| !r.is_empty());

        Some(Self {
            initials: initials(&name),
            phone: text(&["phone", "number"]),
            id,
            name,
            relation,
        })
    }

    #[must_use]
    pub fn list_from_server(body: &Value) -> Vec<Self> {
        body.as_array()
            .map(|items| items.iter().filter_map(Self::from_server).collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn has_phone(&self) -> bool {
        !self.phone.is_empty()
    }
}

/// First letters of the first two words, uppercased. "??" for a blank name.
#[must_use]
pub fn initials(name: &str) -> String {
    let letters: String = name
        .split_whitespace()
        .filter_map(|word| word.chars().next())
        .take(2)
        .flat_map(char::to_uppercase)
        .collect();
    if letters.is_empty() {
        "??".to_string()
    } else {
        letters
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContactFormError {
    #[error("Please enter name and phone")]
    MissingFields,
}

impl From<ContactFormError> for AppError {
    fn from(e: ContactFormError) -> Self {
        AppError::validation(e.to_string())
    }
}

/// The add/edit form. `editing` holds the id of the contact being edited.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactDraft {
    pub name: String,
    pub phone: String,
    pub relation: String,
    pub editing: Option<String>,
}

impl ContactDraft {
    #[must_use]
    pub fn editing(contact: &Contact) -> Self {
        Self {
            name: contact.name.clone(),
            phone: contact.phone.clone(),
            relation: contact.relation.clone().unwrap_or_default(),
            editing: Some(contact.id.clone()),
        }
    }

    /// The request body for create and update.
    pub fn to_body(&self) -> Result<Value, ContactFormError> {
        let name = self.name.trim();
        let phone = self.phone.trim();
        if name.is_empty() || phone.is_empty() {
            return Err(ContactFormError::MissingFields);
        }
        let relation = self.relation.trim();
        Ok(json!({
            "full_name": name,
            "phone": phone,
            "relation": if relation.is_empty() { Value::Null } else { json!(relation) },
        }))
    }
}

/// Rewrites the server's duplicate-key message into something a person can act on.
#[must_use]
pub fn save_error_message(server_message: &str) -> String {
    if server_message.contains("duplicate") {
        "A contact with this phone already exists.".to_string()
    } else {
        server_message.to_string()
    }
}

/// Replaces `updated` in place (by id), or prepends it when it is new.
pub fn upsert(contacts: &mut Vec<Contact>, updated: Contact) {
    if let Some(slot) = contacts.iter_mut().find(|c| c.id == updated.id) {
        *slot = updated;
    } else {
        contacts.insert(0, updated);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportEntry {
    pub id: String,
    pub label: String,
    pub number: String,
    pub subtitle: Option<String>,
    pub is_default: bool,
}

/// The user's contacts that have a phone, followed by the fixed emergency
/// numbers.
#[must_use]
pub fn support_network(contacts: &[Contact]) -> Vec<SupportEntry> {
    let own = contacts.iter().filter(|c| c.has_phone()).map(|c| SupportEntry {
        id: c.id.clone(),
        label: c.name.clone(),
        number: c.phone.clone(),
        subtitle: c.relation.clone(),
        is_default: false,
    });
    let defaults = SUPPORT_DEFAULTS.iter().map(|d| SupportEntry {
        id: d.id.to_string(),
        label: d.label.to_string(),
        number: d.number.to_string(),
        subtitle: Some(d.subtitle.to_string()),
        is_default: true,
    });
    own.chain(defaults).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(id: &str, name: &str, phone: &str) -> Contact {
        Contact::from_server(&json!({"_id": id, "full_name": name, "phone": phone})).unwrap()
    }

    mod normalize_tests {
        use super::*;

        #[test]
        fn test_initials() {
            assert_eq!(initials("ayesha khan"), "AK");
            assert_eq!(initials("Sana  Mir Ali"), "SM");
            assert_eq!(initials("Zara"), "Z");
            assert_eq!(initials("   "), "??");
        }

        #[test]
        fn test_from_server_unwraps_envelope() {
            let c = Contact::from_server(&json!({
                "contact": {"_id": "c1", "name": "Mom", "phone": "0300", "relation": "Mother"}
            }))
            .unwrap();
            assert_eq!(c.id, "c1");
            assert_eq!(c.name, "Mom");
            assert_eq!(c.relation.as_deref(), Some("Mother"));
            assert_eq!(c.initials, "M");
        }

        #[test]
        fn test_from_server_prefers_full_name() {
            let c = Contact::from_server(&json!({"id": 7, "full_name": "A B", "name": "x"})).unwrap();
            assert_eq!(c.id, "7");
            assert_eq!(c.name, "A B");
            assert_eq!(c.relation, None);
        }

        #[test]
        fn test_cached_shape_normalises_back() {
            let original = contact("c1", "Ayesha Khan", "0300");
            let cached = serde_json::to_value(&original).unwrap();
            assert_eq!(Contact::from_server(&cached).unwrap(), original);
        }

        #[test]
        fn test_list_skips_records_without_id() {
            let list = Contact::list_from_server(&json!([{"_id": "a"}, {"name": "b"}]));
            assert_eq!(list.len(), 1);
            assert!(Contact::list_from_server(&json!({"contacts": []})).is_empty());
        }
    }

    mod draft_tests {
        use super::*;

        #[test]
        fn test_requires_name_and_phone() {
            let draft = ContactDraft {
                name: "Mom".into(),
                ..ContactDraft::default()
            };
            assert_eq!(draft.to_body(), Err(ContactFormError::MissingFields));
            assert_eq!(
                ContactFormError::MissingFields.to_string(),
                "Please enter name and phone"
            );
        }

        #[test]
        fn test_empty_relation_is_null() {
            let draft = ContactDraft {
                name: " Mom ".into(),
                phone: "0300".into(),
                ..ContactDraft::default()
            };
            assert_eq!(
                draft.to_body().unwrap(),
                json!({"full_name": "Mom", "phone": "0300", "relation": null})
            );
        }

        #[test]
        fn test_editing_prefills() {
            let c = contact("c9", "Sister", "0311");
            let draft = ContactDraft::editing(&c);
            assert_eq!(draft.editing.as_deref(), Some("c9"));
            assert_eq!(draft.phone, "0311");
        }
    }

    mod list_tests {
        use super::*;

        #[test]
        fn test_duplicate_message() {
            assert_eq!(
                save_error_message("E11000 duplicate key error"),
                "A contact with this phone already exists."
            );
            assert_eq!(save_error_message("HTTP 500"), "HTTP 500");
        }

        #[test]
        fn test_upsert_replaces_or_prepends() {
            let mut list = vec![contact("a", "A", "1"), contact("b", "B", "2")];
            upsert(&mut list, contact("b", "Bee", "2"));
            assert_eq!(list[1].name, "Bee");
            upsert(&mut list, contact("c", "C", "3"));
            assert_eq!(list[0].id, "c");
            assert_eq!(list.len(), 3);
        }

        #[test]
        fn test_support_network_order() {
            let list = vec![contact("a", "Mom", "0300"), contact("b", "No Phone", "")];
            let network = support_network(&list);
            let numbers: Vec<_> = network.iter().map(|e| e.number.as_str()).collect();
            assert_eq!(numbers, ["0300", "15", "112"]);
            assert!(!network[0].is_default);
            assert!(network[2].is_default);
        }
    }
}
