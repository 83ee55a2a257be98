//! InMemoryConnection - HashMap-backed document store for testing and development.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use serde_json::Value;
use tracing::info;

use super::matcher::{lookup, matches, sort_cmp};
use super::{Connection, Connector};
use crate::document::{identity, Changes, Document, Query, SortOrder, ID_FIELD};
use crate::error::{Error, Result};

#[derive(Default)]
struct Collection {
    documents: Vec<Document>,
    unique: BTreeSet<String>,
}

impl Collection {
    fn matching(&self, conditions: &Document) -> Result<Vec<usize>> {
        let mut positions = Vec::new();
        for (position, document) in self.documents.iter().enumerate() {
            if matches(document, conditions)? {
                positions.push(position);
            }
        }
        Ok(positions)
    }

    /// Rejects `candidate` if it collides with another document on `_id`
    /// or a unique field. `skip` is the candidate's own position, if stored.
    fn check_unique(&self, candidate: &Document, skip: Option<usize>) -> Result<()> {
        self.check_unique_among(&self.documents, candidate, skip)
    }

    /// Same as [`Collection::check_unique`], against a staged copy of the documents.
    fn check_unique_among(
        &self,
        documents: &[Document],
        candidate: &Document,
        skip: Option<usize>,
    ) -> Result<()> {
        let fields = std::iter::once(ID_FIELD).chain(self.unique.iter().map(String::as_str));
        for field in fields {
            let Some(value) = candidate.get(field).filter(|value| !value.is_null()) else {
                continue;
            };
            let collides = documents
                .iter()
                .enumerate()
                .any(|(position, other)| Some(position) != skip && other.get(field) == Some(value));
            if collides {
                return Err(Error::Store(format!("duplicate key for {field}: {value}")));
            }
        }
        Ok(())
    }
}

type Collections = HashMap<String, Collection>;

/// In-memory document store.
///
/// Clones share both the data and the handle state. Handles opened with
/// [`InMemoryConnection::reopen`] share the data only, so closing one does not
/// affect the other.
#[derive(Clone)]
pub struct InMemoryConnection {
    data: Arc<RwLock<Collections>>,
    closed: Arc<AtomicBool>,
    round_trips: Arc<AtomicU64>,
    reject_writes: Arc<AtomicBool>,
}

impl Default for InMemoryConnection {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryConnection {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
            closed: Arc::new(AtomicBool::new(false)),
            round_trips: Arc::new(AtomicU64::new(0)),
            reject_writes: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A fresh open handle over the same data.
    pub fn reopen(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            ..Self::new()
        }
    }

    /// Number of calls that reached the store through this handle.
    pub fn round_trips(&self) -> u64 {
        self.round_trips.load(Ordering::SeqCst)
    }

    /// While set, every write is rejected with a store error.
    pub fn reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    /// Copy of a collection's documents, without counting a round trip.
    pub fn snapshot(&self, collection: &str) -> Vec<Document> {
        self.data
            .read()
            .map(|data| {
                data.get(collection)
                    .map(|c| c.documents.clone())
                    .unwrap_or_default()
            })
            .unwrap_or_default()
    }

    fn begin(&self, write: bool) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::Connection("connection is closed".into()));
        }
        self.round_trips.fetch_add(1, Ordering::SeqCst);
        if write && self.reject_writes.load(Ordering::SeqCst) {
            return Err(Error::Store("write rejected by store".into()));
        }
        Ok(())
    }

    fn read<T>(&self, f: impl FnOnce(&Collections) -> Result<T>) -> Result<T> {
        self.begin(false)?;
        let data = self
            .data
            .read()
            .map_err(|_| Error::Store("lock poisoned".into()))?;
        f(&data)
    }

    fn write<T>(&self, f: impl FnOnce(&mut Collections) -> Result<T>) -> Result<T> {
        self.begin(true)?;
        let mut data = self
            .data
            .write()
            .map_err(|_| Error::Store("lock poisoned".into()))?;
        f(&mut data)
    }
}

impl Connection for InMemoryConnection {
    fn find(&self, collection: &str, query: &Query) -> Result<Vec<Document>> {
        self.read(|data| {
            let Some(stored) = data.get(collection) else {
                return Ok(Vec::new());
            };
            let mut found: Vec<&Document> = Vec::new();
            for document in &stored.documents {
                if matches(document, query.conditions())? {
                    found.push(document);
                }
            }

            for (field, order) in query.sort_order().iter().rev() {
                found.sort_by(|a, b| {
                    let ordering = sort_cmp(lookup(a, field), lookup(b, field));
                    match order {
                        SortOrder::Ascending => ordering,
                        SortOrder::Descending => ordering.reverse(),
                    }
                });
            }

            let skip = query.skip_count().unwrap_or(0) as usize;
            let limit = query.limit_count().map_or(usize::MAX, |limit| limit as usize);
            Ok(found
                .into_iter()
                .skip(skip)
                .take(limit)
                .map(|document| project(document, query.projection()))
                .collect())
        })
    }

    fn count(&self, collection: &str, conditions: &Document) -> Result<u64> {
        self.read(|data| match data.get(collection) {
            Some(stored) => Ok(stored.matching(conditions)?.len() as u64),
            None => Ok(0),
        })
    }

    fn insert(&self, collection: &str, mut document: Document) -> Result<Document> {
        self.write(|data| {
            let stored = data.entry(collection.to_string()).or_default();
            if identity(&document).is_none() {
                document.insert(
                    ID_FIELD.to_string(),
                    Value::String(uuid::Uuid::new_v4().to_string()),
                );
            }
            stored.check_unique(&document, None)?;
            stored.documents.push(document.clone());
            Ok(document)
        })
    }

    fn update(
        &self,
        collection: &str,
        conditions: &Document,
        changes: &Changes,
        multi: bool,
    ) -> Result<u64> {
        self.write(|data| {
            let Some(stored) = data.get_mut(collection) else {
                return Ok(0);
            };
            let mut positions = stored.matching(conditions)?;
            if !multi {
                positions.truncate(1);
            }

            // Every candidate is checked against the others, so the batch
            // commits whole or not at all.
            let mut staged = stored.documents.clone();
            for &position in &positions {
                changes.apply(&mut staged[position]);
                if staged[position].get(ID_FIELD) != stored.documents[position].get(ID_FIELD) {
                    return Err(Error::Store("the _id field is immutable".into()));
                }
            }
            for &position in &positions {
                stored.check_unique_among(&staged, &staged[position], Some(position))?;
            }
            stored.documents = staged;
            Ok(positions.len() as u64)
        })
    }

    fn replace(&self, collection: &str, conditions: &Document, mut document: Document) -> Result<u64> {
        self.write(|data| {
            let Some(stored) = data.get_mut(collection) else {
                return Ok(0);
            };
            let Some(&position) = stored.matching(conditions)?.first() else {
                return Ok(0);
            };
            let current_id = stored.documents[position].get(ID_FIELD).cloned();
            match (identity(&document), &current_id) {
                (Some(new_id), Some(current)) if new_id != current => {
                    return Err(Error::Store("the _id field is immutable".into()));
                }
                _ => {}
            }
            if let Some(id) = current_id {
                document.insert(ID_FIELD.to_string(), id);
            }
            stored.check_unique(&document, Some(position))?;
            stored.documents[position] = document;
            Ok(1)
        })
    }

    fn delete(&self, collection: &str, conditions: &Document) -> Result<u64> {
        self.write(|data| {
            let Some(stored) = data.get_mut(collection) else {
                return Ok(0);
            };
            let positions = stored.matching(conditions)?;
            for &position in positions.iter().rev() {
                stored.documents.remove(position);
            }
            Ok(positions.len() as u64)
        })
    }

    fn ensure_unique(&self, collection: &str, field: &str) -> Result<()> {
        self.write(|data| {
            let stored = data.entry(collection.to_string()).or_default();
            let mut seen = Vec::new();
            for value in stored.documents.iter().filter_map(|d| d.get(field)) {
                if value.is_null() {
                    continue;
                }
                if seen.contains(&value) {
                    return Err(Error::Store(format!(
                        "cannot enforce uniqueness of {field}: duplicate {value}"
                    )));
                }
                seen.push(value);
            }
            stored.unique.insert(field.to_string());
            Ok(())
        })
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

fn project(document: &Document, fields: Option<&[String]>) -> Document {
    let Some(fields) = fields else {
        return document.clone();
    };
    document
        .iter()
        .filter(|(key, _)| {
            key.as_str() == ID_FIELD
                || fields
                    .iter()
                    .any(|field| field.split('.').next() == Some(key.as_str()))
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Connector handing out in-memory stores, one per database named in the URL.
///
/// Connecting again to a database whose handle was closed returns a new
/// handle over the same data.
#[derive(Default)]
pub struct InMemoryConnector {
    databases: Mutex<HashMap<String, InMemoryConnection>>,
    unreachable: AtomicBool,
    connects: AtomicU64,
}

impl InMemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every connect attempt fails as if the store were down.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Number of successful connects.
    pub fn connects(&self) -> u64 {
        self.connects.load(Ordering::SeqCst)
    }

    /// The current handle for `database`, if one was opened.
    pub fn connection(&self, database: &str) -> Option<InMemoryConnection> {
        self.databases
            .lock()
            .ok()
            .and_then(|databases| databases.get(database).cloned())
    }
}

impl Connector for InMemoryConnector {
    fn connect(&self, url: &str) -> Result<Arc<dyn Connection>> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(Error::Connection(format!("store unreachable at {url}")));
        }
        let database = database_name(url)?;
        let mut databases = self
            .databases
            .lock()
            .map_err(|_| Error::Connection("connector lock poisoned".into()))?;

        let connection = match databases.get(&database) {
            Some(existing) if !existing.is_closed() => existing.clone(),
            Some(existing) => existing.reopen(),
            None => InMemoryConnection::new(),
        };
        databases.insert(database.clone(), connection.clone());
        self.connects.fetch_add(1, Ordering::SeqCst);
        info!(database = %database, "opened in-memory connection");
        Ok(Arc::new(connection))
    }
}

/// Extracts the database name from `mongodb://[credentials@]host[:port]/database[?options]`.
fn database_name(url: &str) -> Result<String> {
    let rest = url
        .strip_prefix("mongodb://")
        .ok_or_else(|| Error::Connection(format!("unsupported connection url: {url}")))?;
    let rest = rest.rsplit_once('@').map_or(rest, |(_, host)| host);
    let database = rest
        .split_once('/')
        .map(|(_, path)| path.split('?').next().unwrap_or_default())
        .unwrap_or_default();
    if database.is_empty() {
        return Err(Error::Connection(format!("connection url names no database: {url}")));
    }
    Ok(database.to_string())
}
