use std::sync::Arc;

use docbind::{doc, Connection, Core, Error, InMemoryConnector, Model};

use super::support::Fixture;

#[test]
fn connect_is_idempotent() {
    let connector = Arc::new(InMemoryConnector::new());
    let core = Core::from_url("mongodb://localhost/app")
        .connector(connector.clone())
        .build()
        .unwrap();

    let first = core.connect().unwrap();
    let second = core.connect().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(connector.connects(), 1);
    assert!(core.is_connected());
}

#[test]
fn unreachable_store_is_a_connection_error() {
    let connector = Arc::new(InMemoryConnector::new());
    connector.set_unreachable(true);
    let core = Core::from_url("mongodb://localhost/app")
        .connector(connector.clone())
        .build()
        .unwrap();

    assert!(matches!(core.connect(), Err(Error::Connection(_))));
    assert!(!core.is_connected());

    connector.set_unreachable(false);
    assert!(core.connect().is_ok());
}

#[test]
fn operations_before_connect_fail_fast() {
    let core = Core::from_url("mongodb://localhost/app")
        .connector(Arc::new(InMemoryConnector::new()))
        .build()
        .unwrap();
    let users = Model::builder(&core, "users").build();

    assert!(matches!(users.find_by_id("x"), Err(Error::Connection(_))));
    assert!(matches!(users.count(&doc! {}), Err(Error::Connection(_))));
}

#[test]
fn close_fails_fast_and_taken_handles_stop_working() {
    let fixture = Fixture::new();
    let users = fixture.users();
    let mut ada = users.create(doc! { "name": "Ada" }).unwrap();
    let handle = fixture.core.connection().unwrap();

    fixture.core.close();
    fixture.core.close();

    let before = fixture.round_trips();
    assert!(matches!(users.find(doc! {}), Err(Error::Connection(_))));
    ada.set("name", "x").unwrap();
    assert!(matches!(ada.save(), Err(Error::Connection(_))));
    assert!(matches!(
        handle.count("users", &doc! {}),
        Err(Error::Connection(_))
    ));
    assert_eq!(fixture.round_trips(), before);
}

#[test]
fn reconnect_after_close_sees_the_same_data() {
    let fixture = Fixture::new();
    let users = fixture.users();
    let id = users.create(doc! { "name": "Ada" }).unwrap().id().cloned().unwrap();

    fixture.core.close();
    fixture.core.connect().unwrap();
    fixture.memory.clear_all();

    let found = users.find_by_id(id).unwrap();
    assert!(found.is_some());
    assert_eq!(fixture.connector.connects(), 2);
}

#[test]
fn models_share_the_core_connection() {
    let fixture = Fixture::new();
    let users = fixture.users();
    let notes = Model::builder(&fixture.core, "notes").build();

    users.create(doc! {}).unwrap();
    notes.create(doc! {}).unwrap();

    assert_eq!(fixture.connector.connects(), 1);
    assert_eq!(fixture.store.snapshot("users").len(), 1);
    assert_eq!(fixture.store.snapshot("notes").len(), 1);
}
