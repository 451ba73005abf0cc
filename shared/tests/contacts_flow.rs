mod common;

use common::{offline, ok_json, request_of, Shell};
use serde_json::json;
use sheild_core::capabilities::{HttpMethod, LauncherOperation, LauncherOutput};
use sheild_core::contacts::ContactDraft;
use sheild_core::view::ScreenView;
use sheild_core::{Event, Screen};

/// Signed in on the contacts screen with two contacts loaded.
fn contacts_loaded() -> Shell {
    let (mut shell, _) = Shell::boot(Some("tok"));
    let mut effects = shell.send(Event::Navigate(Screen::Contacts));
    assert!(shell.model.contacts.loading);
    let mut list = effects.take_http("/api/contacts");
    let effects = shell.resolve(
        &mut list,
        ok_json(
            200,
            json!([
                {"_id": "c1", "full_name": "Ammi Jan", "phone": "+923001112222", "relation": "Mother"},
                {"_id": "c2", "full_name": "Sara", "phone": "+923003334444"}
            ]),
        ),
    );
    assert!(!shell.model.contacts.loading);
    assert!(effects.kv_writes().iter().any(|(key, _)| key == "CONTACTS_V1"));
    shell
}

fn draft(name: &str, phone: &str) -> Event {
    Event::ContactFormChanged(Box::new(ContactDraft {
        name: name.into(),
        phone: phone.into(),
        relation: String::new(),
        editing: None,
    }))
}

#[test]
fn test_contacts_screen_lists_contacts() {
    let shell = contacts_loaded();
    match shell.app.view(&shell.model).screen {
        ScreenView::Contacts(view) => {
            assert_eq!(view.contacts.len(), 2);
            assert_eq!(view.contacts[0].initials, "AJ");
        }
        other => panic!("expected contacts, got {other:?}"),
    }
}

#[test]
fn test_create_contact() {
    let mut shell = contacts_loaded();
    shell.send(Event::ContactFormOpened);
    shell.send(draft(" Bhai ", "0300 5556666"));
    let mut effects = shell.send(Event::SaveContact);
    assert!(shell.model.contacts.saving);

    let mut create = effects.take_http("/api/contacts");
    assert_eq!(request_of(&create).method(), HttpMethod::Post);
    assert_eq!(
        request_of(&create).json_body(),
        Some(json!({"full_name": "Bhai", "phone": "0300 5556666", "relation": null}))
    );

    shell.resolve(
        &mut create,
        ok_json(201, json!({"contact": {"_id": "c3", "full_name": "Bhai", "phone": "0300 5556666"}})),
    );
    assert!(!shell.model.contacts.saving);
    assert!(shell.model.contacts.form.is_none());
    assert_eq!(shell.model.contacts.list[0].id, "c3");
    assert_eq!(shell.model.contacts.list.len(), 3);
}

#[test]
fn test_incomplete_form_is_rejected() {
    let mut shell = contacts_loaded();
    shell.send(Event::ContactFormOpened);
    shell.send(draft("Bhai", "  "));
    let effects = shell.send(Event::SaveContact);
    assert!(effects.http.is_empty());
    let error = shell.model.active_error.as_ref().expect("error");
    assert_eq!(error.user_facing_message(), "Please enter name and phone");
}

#[test]
fn test_edit_keeps_the_contact_id() {
    let mut shell = contacts_loaded();
    shell.send(Event::EditContact { id: "c2".into() });
    // The shell echoes the form back without the id.
    shell.send(draft("Sara Khan", "+923003334444"));
    let mut effects = shell.send(Event::SaveContact);

    let mut update = effects.take_http("/api/contacts/c2");
    assert_eq!(request_of(&update).method(), HttpMethod::Put);
    shell.resolve(
        &mut update,
        ok_json(200, json!({"_id": "c2", "full_name": "Sara Khan", "phone": "+923003334444"})),
    );
    assert_eq!(shell.model.contacts.list.len(), 2);
    assert_eq!(shell.model.contacts.list[1].name, "Sara Khan");
}

#[test]
fn test_duplicate_phone_message() {
    let mut shell = contacts_loaded();
    shell.send(Event::ContactFormOpened);
    shell.send(draft("Copy", "+923003334444"));
    let mut effects = shell.send(Event::SaveContact);
    let mut create = effects.take_http("/api/contacts");
    shell.resolve(
        &mut create,
        ok_json(409, json!({"error": "E11000 duplicate key error collection: contacts"})),
    );
    assert!(shell.model.contacts.form.is_some());
    let error = shell.model.active_error.as_ref().expect("error");
    assert_eq!(
        error.user_facing_message(),
        "A contact with this phone already exists."
    );
}

#[test]
fn test_delete_contact() {
    let mut shell = contacts_loaded();
    let mut effects = shell.send(Event::DeleteContact { id: "c1".into() });
    let mut delete = effects.take_http("/api/contacts/c1");
    assert_eq!(request_of(&delete).method(), HttpMethod::Delete);
    shell.resolve(&mut delete, ok_json(204, json!(null)));
    let ids: Vec<&str> = shell.model.contacts.list.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["c2"]);
}

#[test]
fn test_load_failure_shown_on_contacts_screen() {
    let (mut shell, _) = Shell::boot(Some("tok"));
    let mut effects = shell.send(Event::Navigate(Screen::Contacts));
    let mut list = effects.take_http("/api/contacts");
    shell.resolve(&mut list, offline());
    let error = shell.model.active_error.as_ref().expect("error");
    assert_eq!(error.user_facing_message(), "Failed to load contacts");
}

#[test]
fn test_background_refresh_failure_is_quiet() {
    let (mut shell, mut effects) = Shell::boot(Some("tok"));
    let mut list = effects.take_http("/api/contacts");
    shell.resolve(&mut list, offline());
    assert_eq!(shell.model.screen, Screen::Dashboard);
    assert!(shell.model.active_error.is_none());
}

#[test]
fn test_call_checks_device_support() {
    let mut shell = contacts_loaded();
    let mut effects = shell.send(Event::CallNumber {
        number: "+92 300 1112222".into(),
    });
    let mut check = effects.take_launcher();
    assert_eq!(
        check.operation,
        LauncherOperation::CanOpen {
            url: "tel:+923001112222".into()
        }
    );

    shell.resolve(&mut check, Ok(LauncherOutput::Supported(false)));
    let error = shell.model.active_error.as_ref().expect("error");
    assert_eq!(
        error.user_facing_message(),
        "Your device cannot call +92 300 1112222"
    );
}

#[test]
fn test_helpline_call_opens_dialer() {
    let (mut shell, _) = Shell::boot(Some("tok"));
    shell.send(Event::Navigate(Screen::LegalSupport));
    let mut effects = shell.send(Event::CallHelpline {
        id: "domestic_violence".into(),
    });
    let mut check = effects.take_launcher();
    let mut effects = shell.resolve(&mut check, Ok(LauncherOutput::Supported(true)));
    let mut open = effects.take_launcher();
    assert_eq!(
        open.operation,
        LauncherOperation::Open {
            url: "tel:181".into()
        }
    );

    shell.resolve(
        &mut open,
        Err(sheild_core::capabilities::LauncherError::CannotOpen { url: "tel:181".into() }),
    );
    let error = shell.model.active_error.as_ref().expect("error");
    assert_eq!(error.user_facing_message(), "Unable to start call");
}
