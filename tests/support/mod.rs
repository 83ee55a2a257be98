//! Shared fixtures for the integration suites.

#![allow(dead_code)]

use std::sync::Arc;

use docbind::{Core, InMemoryConnection, InMemoryConnector, MemoryCache, Model, Schema};

/// A connected core over an in-memory store with a bounded memory cache.
pub struct Fixture {
    pub core: Core,
    pub connector: Arc<InMemoryConnector>,
    pub store: InMemoryConnection,
    pub memory: Arc<MemoryCache>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_cache(MemoryCache::new(64))
    }

    pub fn with_cache(memory: MemoryCache) -> Self {
        let connector = Arc::new(InMemoryConnector::new());
        let memory = Arc::new(memory);
        let core = Core::from_url("mongodb://localhost/test")
            .connector(connector.clone())
            .cache(memory.clone())
            .build()
            .expect("core builds");
        core.connect().expect("connects");
        let store = connector.connection("test").expect("database opened");
        Self {
            core,
            connector,
            store,
            memory,
        }
    }

    /// `users` model with a unique `email` field.
    pub fn users(&self) -> Model {
        Model::builder(&self.core, "users")
            .schema(Schema::new().unique("email"))
            .build()
    }

    pub fn round_trips(&self) -> u64 {
        self.store.round_trips()
    }
}
