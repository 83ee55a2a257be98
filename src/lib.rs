//! docbind - a document mapper for schema-less collections.
//!
//! A [`Core`] owns the store connection, a [`Model`] binds a collection and a
//! [`Schema`] to it, and every document read or written through a model comes
//! back as an [`Instance`] with dirty tracking and a lifecycle state.
//!
//! Reads by identity can be served from a pluggable [`Cache`]. The
//! [`CacheDirector`] decides per query whether a cache key exists at all, and
//! [`ModelCache`] enforces read-through on `find_one` and invalidation after
//! every acknowledged write.
//!
//! ## Example
//!
//! ```ignore
//! use docbind::{doc, Core, InMemoryConnector, MemoryCache, Model, Schema};
//! use std::sync::Arc;
//!
//! let core = Core::from_url("mongodb://localhost/app")
//!     .connector(Arc::new(InMemoryConnector::new()))
//!     .cache(Arc::new(MemoryCache::new(1_000)))
//!     .build()?;
//! core.connect()?;
//!
//! let users = Model::builder(&core, "users")
//!     .schema(Schema::new().unique("email"))
//!     .build();
//!
//! let mut user = users.create(doc! { "email": "ada@example.com", "name": "Ada" })?;
//! user.set("name", "Ada Lovelace")?;
//! user.save()?;
//!
//! let loaded = users.find_by_id(user.id().cloned().unwrap())?;
//! ```

extern crate self as docbind;

#[macro_use]
mod macros;

mod cache;
mod connection;
mod core;
mod document;
mod error;
mod hooks;
mod model;
mod schema;

pub use crate::core::{Configuration, Core, CoreBuilder};
pub use cache::{
    Cache, CacheDirector, CacheStats, IdentityDirector, MemoryCache, ModelCache, NoOpCache,
};
pub use connection::{Connection, Connector, InMemoryConnection, InMemoryConnector};
pub use document::{identity, Changes, Document, Query, SortOrder, ID_FIELD};
pub use error::{Error, HookError, Result};
pub use hooks::{HookSet, Hooks};
pub use model::{Instance, InstanceState, Model, ModelBuilder};
pub use schema::{Schema, Schematic};

#[cfg(feature = "derive")]
pub use docbind_macros::Schematic;

// Re-exported so the `doc!` macro and derived code resolve without the caller
// depending on serde_json directly.
#[doc(hidden)]
pub use serde_json as __serde_json;
