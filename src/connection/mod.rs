//! Store connection - the primitives a model needs from a document store.
//!
//! The transport itself is out of scope: a [`Connector`] turns a URL into a
//! live [`Connection`], and the connection exposes query and write primitives
//! over named collections. [`InMemoryConnection`] is the in-process
//! implementation used for development and tests.

mod in_memory;
mod matcher;

use std::sync::Arc;

use crate::document::{Changes, Document, Query};
use crate::error::Result;

/// Query and write primitives over named collections.
///
/// Each call is one round trip. Writes are atomic per document only.
pub trait Connection: Send + Sync {
    /// Documents matching the query, honouring projection, sort, skip and limit.
    fn find(&self, collection: &str, query: &Query) -> Result<Vec<Document>>;

    /// First document matching the query.
    fn find_one(&self, collection: &str, query: &Query) -> Result<Option<Document>> {
        let query = query.clone().limit(1);
        Ok(self.find(collection, &query)?.into_iter().next())
    }

    fn count(&self, collection: &str, conditions: &Document) -> Result<u64>;

    /// Inserts a document and returns it as stored, identity included.
    fn insert(&self, collection: &str, document: Document) -> Result<Document>;

    /// Applies `changes` to the first (or, with `multi`, every) matching document.
    /// Returns the number of matched documents.
    fn update(
        &self,
        collection: &str,
        conditions: &Document,
        changes: &Changes,
        multi: bool,
    ) -> Result<u64>;

    /// Replaces the first matching document wholesale, keeping its identity.
    fn replace(&self, collection: &str, conditions: &Document, document: Document) -> Result<u64>;

    /// Deletes every matching document. Returns the number removed.
    fn delete(&self, collection: &str, conditions: &Document) -> Result<u64>;

    /// Enforces uniqueness of `field` across the collection.
    fn ensure_unique(&self, collection: &str, field: &str) -> Result<()>;

    /// Releases the connection. Later calls fail fast.
    fn close(&self);

    fn is_closed(&self) -> bool;
}

/// Opens connections from a URL.
pub trait Connector: Send + Sync {
    fn connect(&self, url: &str) -> Result<Arc<dyn Connection>>;
}

pub use in_memory::{InMemoryConnection, InMemoryConnector};
