use std::sync::Arc;

use docbind::{
    doc, CacheDirector, Document, IdentityDirector, MemoryCache, ModelCache, Query, Schema,
};
use proptest::prelude::*;
use serde_json::{json, Value};

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        "[a-z0-9=:]{0,8}".prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
    ]
}

fn condition_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        4 => scalar(),
        1 => Just(Value::Null),
        1 => scalar().prop_map(|v| json!({ "$gt": v })),
        1 => prop::collection::vec(scalar(), 0..3).prop_map(|v| json!({ "$in": v })),
        1 => prop::collection::vec(scalar(), 0..3).prop_map(Value::from),
    ]
}

fn field() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("_id".to_string()),
        Just("email".to_string()),
        Just("name".to_string()),
        Just("$or".to_string()),
    ]
}

prop_compose! {
    fn query()(
        conditions in prop::collection::btree_map(field(), condition_value(), 0..3),
        projected in any::<bool>(),
        limited in any::<bool>(),
    ) -> Query {
        let conditions: Document = conditions.into_iter().collect();
        let mut query = Query::new(conditions);
        if projected {
            query = query.fields(["name"]);
        }
        if limited {
            query = query.limit(1);
        }
        query
    }
}

fn populated() -> (ModelCache, IdentityDirector) {
    let director = IdentityDirector::new("users", Schema::new().unique("email"));
    let memory = Arc::new(MemoryCache::new(64).accept_unique_lookups());
    let cache = ModelCache::new(memory, Arc::new(director.clone()));
    for n in 0..8 {
        cache.store(&doc! {
            "_id": format!("u{n}"),
            "email": format!("u{n}@example.com"),
            "name": "same",
        });
        cache.store(&doc! { "_id": n, "email": n, "name": "same" });
    }
    (cache, director)
}

proptest! {
    #[test]
    fn rejected_queries_never_hit(query in query()) {
        let (cache, director) = populated();
        if !director.valid_query(&query) {
            prop_assert_eq!(cache.fetch(&query), None);
        }
    }

    #[test]
    fn hits_always_satisfy_the_query(query in query()) {
        let (cache, _) = populated();
        if let Some(document) = cache.fetch(&query) {
            for (field, value) in query.conditions() {
                prop_assert_eq!(document.get(field), Some(value));
            }
        }
    }

    #[test]
    fn keys_exist_only_for_accepted_queries(query in query()) {
        let (_, director) = populated();
        prop_assert_eq!(
            director.build_query_key(&query).is_some(),
            director.valid_query(&query)
        );
    }
}

#[test]
fn unique_alias_resolves_to_the_identity_entry() {
    let (cache, _) = populated();
    let by_email = Query::new(doc! { "email": "u3@example.com" });
    let found = cache.fetch(&by_email).expect("alias hit");
    assert_eq!(found["_id"], json!("u3"));
}

#[test]
fn numeric_identities_render_as_json() {
    let director = IdentityDirector::new("users", Schema::new().unique("email"));
    let document = doc! { "_id": 42, "email": true };
    assert_eq!(director.lookups(&document).len(), 2);
    assert_eq!(
        director.build_keys(&document),
        vec!["users:42".to_string(), "users:email=true".to_string()]
    );
    assert_eq!(director.build_key(&document), Some("users:42".to_string()));
}
