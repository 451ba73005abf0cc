use serde_json::Value;
use tracing::{debug, info, warn};

use super::App;
use crate::capabilities::{Capabilities, HttpMethod};
use crate::contacts::{save_error_message, upsert, Contact, ContactDraft};
use crate::directory::{helpline, resource, tel_url};
use crate::event::{ApiCall, ApiPurpose, Event, LaunchAction};
use crate::model::{Model, Screen};
use crate::session::StorageKey;
use crate::{AppError, ErrorKind};

impl App {
    pub(super) fn fetch_contacts(model: &mut Model, caps: &Capabilities) {
        if !model.is_signed_in() {
            return;
        }
        model.contacts.loading = true;
        Self::send_api(model, caps, ApiCall::get(ApiPurpose::ListContacts, "/api/contacts"));
    }

    pub(super) fn contacts_loaded(
        model: &mut Model,
        caps: &Capabilities,
        result: Result<Value, AppError>,
    ) {
        model.contacts.loading = false;
        match result {
            Ok(body) => {
                model.contacts.list = Contact::list_from_server(&body);
                model.contacts.loaded = true;
                debug!(count = model.contacts.list.len(), "contacts loaded");
                Self::persist_contacts(model, caps);
            }
            Err(e) if model.screen == Screen::Contacts => {
                model.set_error(Self::explain(e, "Failed to load contacts"));
            }
            Err(e) => warn!(error = %e, "contacts refresh failed"),
        }
    }

    fn persist_contacts(model: &Model, caps: &Capabilities) {
        Self::store_json(caps, StorageKey::Contacts, &model.contacts.list);
    }

    pub(super) fn open_contact_form(model: &mut Model) {
        model.contacts.form = Some(ContactDraft::default());
    }

    pub(super) fn edit_contact(model: &mut Model, id: &str) {
        match model.contacts.list.iter().find(|c| c.id == id) {
            Some(contact) => model.contacts.form = Some(ContactDraft::editing(contact)),
            None => warn!("edit requested for an unknown contact"),
        }
    }

    /// The shell sends the whole form on each change; which contact is being
    /// edited stays owned by the core.
    pub(super) fn contact_form_changed(model: &mut Model, draft: ContactDraft) {
        let editing = model.contacts.form.as_ref().and_then(|f| f.editing.clone());
        model.contacts.form = Some(ContactDraft { editing, ..draft });
    }

    pub(super) fn save_contact(model: &mut Model, caps: &Capabilities) {
        if model.contacts.saving {
            return;
        }
        let Some(form) = &model.contacts.form else {
            return;
        };
        let body = match form.to_body() {
            Ok(body) => body,
            Err(e) => {
                model.set_error(e.into());
                return;
            }
        };
        let call = match form.editing.clone() {
            Some(id) => {
                let path = format!("/api/contacts/{id}");
                ApiCall::new(ApiPurpose::UpdateContact { id }, HttpMethod::Put, path).with_body(body)
            }
            None => ApiCall::post(ApiPurpose::CreateContact, "/api/contacts", body),
        };
        model.contacts.saving = true;
        Self::send_api(model, caps, call);
    }

    pub(super) fn contact_saved(
        model: &mut Model,
        caps: &Capabilities,
        result: Result<Value, AppError>,
    ) {
        model.contacts.saving = false;
        match result {
            Ok(body) => {
                model.contacts.form = None;
                match Contact::from_server(&body) {
                    Some(contact) => {
                        info!("contact saved");
                        upsert(&mut model.contacts.list, contact);
                        Self::persist_contacts(model, caps);
                    }
                    None => {
                        warn!("saved contact came back without an id, reloading list");
                        Self::fetch_contacts(model, caps);
                    }
                }
            }
            Err(e) => {
                let message = if e.http_status().is_some() {
                    save_error_message(&e.message)
                } else {
                    "Failed to save contact".to_string()
                };
                model.set_error(AppError::user_visible(e.kind, message).with_internal(e.to_string()));
            }
        }
    }

    pub(super) fn delete_contact(model: &mut Model, caps: &Capabilities, id: String) {
        let path = format!("/api/contacts/{id}");
        Self::send_api(
            model,
            caps,
            ApiCall::new(ApiPurpose::DeleteContact { id }, HttpMethod::Delete, path),
        );
    }

    pub(super) fn contact_deleted(
        model: &mut Model,
        caps: &Capabilities,
        id: &str,
        result: Result<Value, AppError>,
    ) {
        match result {
            Ok(_) => {
                model.contacts.list.retain(|c| c.id != id);
                if model.contacts.form.as_ref().and_then(|f| f.editing.as_deref()) == Some(id) {
                    model.contacts.form = None;
                }
                Self::persist_contacts(model, caps);
            }
            Err(e) => model.set_error(Self::explain(e, "Failed to delete contact")),
        }
    }

    pub(super) fn call_number(caps: &Capabilities, number: String) {
        caps.launcher
            .can_open(tel_url(&number), move |supported| Event::CallChecked { number, supported });
    }

    pub(super) fn call_checked(
        model: &mut Model,
        caps: &Capabilities,
        number: String,
        supported: bool,
    ) {
        if !supported {
            model.set_error(AppError::user_visible(
                ErrorKind::Launch,
                format!("Your device cannot call {number}"),
            ));
            return;
        }
        let url = tel_url(&number);
        caps.launcher.open(url, move |result| Event::Launched {
            action: LaunchAction::Call { number },
            result: Box::new(result),
        });
    }

    pub(super) fn call_helpline(caps: &Capabilities, id: &str) {
        match helpline(id) {
            Some(line) => Self::call_number(caps, line.number.to_string()),
            None => warn!(id, "unknown helpline"),
        }
    }

    pub(super) fn open_resource(caps: &Capabilities, id: &str) {
        match resource(id) {
            Some(doc) => caps.launcher.open(doc.url, |result| Event::Launched {
                action: LaunchAction::Resource,
                result: Box::new(result),
            }),
            None => warn!(id, "unknown legal resource"),
        }
    }
}
