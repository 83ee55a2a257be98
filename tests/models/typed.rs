use docbind::{doc, Model, Query, Schematic};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::support::Fixture;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Schematic)]
#[document(collection = "accounts")]
struct Account {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[document(unique)]
    #[serde(rename = "mail")]
    email: String,
    #[document(unique)]
    handle: String,
    balance: i64,
}

#[derive(Debug, Serialize, Deserialize, Schematic)]
struct AuditEntry {
    message: String,
}

#[test]
fn derive_reads_collection_and_unique_fields() {
    assert_eq!(Account::COLLECTION, "accounts");
    let schema = Account::schema();
    assert!(schema.is_unique("_id"));
    assert!(schema.is_unique("mail"));
    assert!(schema.is_unique("handle"));
    assert!(!schema.is_unique("email"));
    assert!(!schema.is_unique("balance"));

    assert_eq!(AuditEntry::COLLECTION, "audit_entrys");
    assert_eq!(AuditEntry::schema().unique_fields().count(), 0);
}

#[test]
fn typed_model_round_trip() {
    let fixture = Fixture::new();
    let accounts = Model::of::<Account>(&fixture.core).build();
    assert_eq!(accounts.collection_name(), "accounts");
    accounts.ensure_indexes().unwrap();

    let account = Account {
        id: None,
        email: "ada@example.com".into(),
        handle: "ada".into(),
        balance: 10,
    };
    let mut created = accounts.create_from(&account).unwrap();
    created.set("balance", 25).unwrap();
    created.save().unwrap();

    let loaded: Account = accounts
        .find_by_id(created.id().cloned().unwrap())
        .unwrap()
        .unwrap()
        .decode()
        .unwrap();
    assert_eq!(loaded.balance, 25);
    assert_eq!(loaded.email, "ada@example.com");
    assert!(loaded.id.is_some());

    let by_mail = accounts
        .find_one(Query::new(doc! { "mail": "ada@example.com" }))
        .unwrap()
        .unwrap();
    assert_eq!(by_mail.get("handle"), Some(&json!("ada")));

    assert!(matches!(
        accounts.create_from(&Account { id: None, ..loaded }),
        Err(docbind::Error::Store(_))
    ));
}
