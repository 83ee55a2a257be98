use std::sync::{Arc, Mutex};

use docbind::{doc, Changes, Document, Error, HookError, HookSet, Hooks, Instance, Model};
use serde_json::json;

use super::support::Fixture;

/// Records every hook invocation as `"<name>:<stage>"`.
struct Recorder {
    name: &'static str,
    log: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    fn push(&self, stage: &str) {
        self.log.lock().unwrap().push(format!("{}:{stage}", self.name));
    }
}

impl Hooks for Recorder {
    fn name(&self) -> &str {
        self.name
    }

    fn on_retrieved(&self, document: Document) -> Result<Document, HookError> {
        self.push("retrieved");
        Ok(document)
    }

    fn on_creating(&self, document: Document) -> Result<Document, HookError> {
        self.push("creating");
        Ok(document)
    }

    fn on_created(&self, _instance: &Instance) -> Result<(), HookError> {
        self.push("created");
        Ok(())
    }

    fn on_ready(&self, _instance: &mut Instance) -> Result<(), HookError> {
        self.push("ready");
        Ok(())
    }

    fn on_saving(&self, _instance: &Instance, changes: Changes) -> Result<Changes, HookError> {
        self.push("saving");
        Ok(changes)
    }
}

fn recorded(fixture: &Fixture) -> (Model, Arc<Mutex<Vec<String>>>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    fixture.core.register(Arc::new(Recorder {
        name: "plugin",
        log: log.clone(),
    }));
    let model = Model::builder(&fixture.core, "notes")
        .hook(Recorder {
            name: "model",
            log: log.clone(),
        })
        .build();
    (model, log)
}

fn drain(log: &Arc<Mutex<Vec<String>>>) -> Vec<String> {
    std::mem::take(&mut *log.lock().unwrap())
}

#[test]
fn lifecycle_order_with_plugins_first() {
    let fixture = Fixture::new();
    let (notes, log) = recorded(&fixture);

    let mut note = notes.create(doc! { "text": "hi" }).unwrap();
    assert_eq!(
        drain(&log),
        [
            "plugin:ready",
            "model:ready",
            "plugin:creating",
            "model:creating",
            "plugin:created",
            "model:created",
        ]
    );

    note.set("text", "hello").unwrap();
    note.save().unwrap();
    assert_eq!(drain(&log), ["plugin:saving", "model:saving"]);

    // every load runs the read hooks
    notes.find_by_id(note.id().cloned().unwrap()).unwrap();
    assert_eq!(
        drain(&log),
        [
            "plugin:retrieved",
            "model:retrieved",
            "plugin:ready",
            "model:ready",
        ]
    );
}

#[test]
fn plugins_apply_only_to_models_built_afterwards() {
    let fixture = Fixture::new();
    let early = Model::builder(&fixture.core, "early").build();
    let (_, log) = recorded(&fixture);

    early.create(doc! {}).unwrap();
    assert!(drain(&log).is_empty());
}

#[test]
fn pre_write_failure_leaves_the_store_untouched() {
    let fixture = Fixture::new();
    let notes = Model::builder(&fixture.core, "notes")
        .hook(HookSet::new("validate").on_creating(|document| {
            match document.get("text") {
                Some(_) => Ok(document),
                None => Err(HookError::new("text is required")),
            }
        }))
        .build();

    let before = fixture.round_trips();
    let err = notes.create(doc! {}).unwrap_err();
    assert_eq!(
        err,
        Error::Hook {
            stage: "on_creating",
            hook: "validate".into(),
            message: "text is required".into(),
        }
    );
    assert_eq!(fixture.round_trips(), before);
    assert!(fixture.store.snapshot("notes").is_empty());
}

#[test]
fn saving_failure_sends_no_update() {
    let fixture = Fixture::new();
    let notes = Model::builder(&fixture.core, "notes")
        .hook(HookSet::new("frozen").on_saving(|instance, changes| {
            if instance.get("frozen") == Some(&json!(true)) {
                Err(HookError::new("note is frozen"))
            } else {
                Ok(changes)
            }
        }))
        .build();
    let mut note = notes.create(doc! { "text": "a", "frozen": true }).unwrap();
    note.set("text", "b").unwrap();

    let before = fixture.round_trips();
    assert!(matches!(note.save(), Err(Error::Hook { stage: "on_saving", .. })));
    assert_eq!(fixture.round_trips(), before);
    assert_eq!(fixture.store.snapshot("notes")[0]["text"], json!("a"));
}

#[test]
fn post_write_failure_keeps_the_write_but_skips_the_cache() {
    let fixture = Fixture::new();
    let notes = Model::builder(&fixture.core, "notes")
        .hook(HookSet::new("notify").on_created(|_| Err(HookError::new("mailer down"))))
        .build();

    let mut note = notes.new_instance(doc! { "text": "hi" }).unwrap();
    assert!(matches!(note.save(), Err(Error::Hook { stage: "on_created", .. })));

    assert_eq!(note.state(), docbind::InstanceState::Hydrated);
    assert!(note.id().is_some());
    assert_eq!(fixture.store.snapshot("notes").len(), 1);
    assert!(fixture.memory.is_empty());
}

#[test]
fn saving_hooks_may_amend_changes() {
    let fixture = Fixture::new();
    let notes = Model::builder(&fixture.core, "notes")
        .hook(HookSet::new("revision").on_saving(|instance, changes| {
            let revision = instance.get("revision").and_then(|v| v.as_u64()).unwrap_or(0);
            Ok(changes.set("revision", revision + 1))
        }))
        .build();
    let mut note = notes.create(doc! { "text": "a", "revision": 0 }).unwrap();

    note.set("text", "b").unwrap();
    note.save().unwrap();

    assert_eq!(note.get("revision"), Some(&json!(1)));
    assert_eq!(fixture.store.snapshot("notes")[0]["revision"], json!(1));
    assert!(!note.is_dirty());
}

#[test]
fn retrieved_hooks_transform_every_read() {
    let fixture = Fixture::new();
    let notes = Model::builder(&fixture.core, "notes")
        .hook(HookSet::new("decorate").on_retrieved(|mut document| {
            let text = document["text"].as_str().unwrap_or_default().to_string();
            document.insert("text".into(), json!(format!("[{text}]")));
            Ok(document)
        }))
        .build();
    let id = notes.create(doc! { "text": "a" }).unwrap().id().cloned().unwrap();

    // the cache holds the stored form, so repeated hits are not decorated twice
    for _ in 0..2 {
        let note = notes.find_by_id(id.clone()).unwrap().unwrap();
        assert_eq!(note.get("text"), Some(&json!("[a]")));
    }
    assert_eq!(notes.find(doc! {}).unwrap()[0].get("text"), Some(&json!("[a]")));
}

#[test]
fn ready_hooks_can_fill_defaults() {
    let fixture = Fixture::new();
    let notes = Model::builder(&fixture.core, "notes")
        .hook(HookSet::new("defaults").on_ready(|instance| {
            if instance.is_new() && instance.get("status").is_none() {
                instance
                    .set("status", "draft")
                    .map_err(|e| HookError::new(e.to_string()))?;
            }
            Ok(())
        }))
        .build();

    let note = notes.create(doc! { "text": "a" }).unwrap();
    assert_eq!(note.get("status"), Some(&json!("draft")));
    assert_eq!(fixture.store.snapshot("notes")[0]["status"], json!("draft"));
}
