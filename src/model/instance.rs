use std::collections::BTreeSet;
use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::Model;
use crate::document::{identity, Changes, Document, Query, ID_FIELD};
use crate::error::{Error, Result};

/// Lifecycle position of an [`Instance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    /// Not persisted yet.
    New,
    /// Complete copy of a stored document.
    Hydrated,
    /// Stored document read with a projection. Never cached or replaced.
    Partial,
    /// Deleted from the store. Every further write is refused.
    Removed,
}

/// One document bound to its model, with field-level dirty tracking.
pub struct Instance {
    model: Model,
    /// Last acknowledged form of the document in the store.
    stored: Document,
    /// Baseline for diffs, as seen after `on_retrieved`.
    original: Document,
    current: Document,
    dirty: BTreeSet<String>,
    state: InstanceState,
}

impl Instance {
    pub(crate) fn fresh(model: Model, document: Document) -> Self {
        let dirty = document.keys().cloned().collect();
        Self {
            model,
            stored: Document::new(),
            original: Document::new(),
            current: document,
            dirty,
            state: InstanceState::New,
        }
    }

    pub(crate) fn hydrated(model: Model, raw: Document, document: Document, partial: bool) -> Self {
        Self {
            model,
            stored: raw,
            original: document.clone(),
            current: document,
            dirty: BTreeSet::new(),
            state: if partial {
                InstanceState::Partial
            } else {
                InstanceState::Hydrated
            },
        }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.current.get(field)
    }

    /// Decodes one field. Missing fields decode to `None`.
    pub fn get_as<T: DeserializeOwned>(&self, field: &str) -> Result<Option<T>> {
        self.current
            .get(field)
            .map(|value| serde_json::from_value(value.clone()).map_err(Error::from))
            .transpose()
    }

    /// Decodes the whole document into a typed value.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(Value::Object(self.current.clone()))?)
    }

    pub fn id(&self) -> Option<&Value> {
        identity(&self.current)
    }

    /// Current field values, unsaved changes included.
    pub fn document(&self) -> &Document {
        &self.current
    }

    pub fn state(&self) -> InstanceState {
        self.state
    }

    pub fn is_new(&self) -> bool {
        self.state == InstanceState::New
    }

    pub fn is_partial(&self) -> bool {
        self.state == InstanceState::Partial
    }

    pub fn is_removed(&self) -> bool {
        self.state == InstanceState::Removed
    }

    pub fn is_dirty(&self) -> bool {
        !self.changes().is_empty()
    }

    /// Pending changes against the last saved or loaded values.
    pub fn changes(&self) -> Changes {
        Changes::diff(&self.original, &self.current, &self.dirty)
    }

    /// Sets a field locally. Nothing is written until [`Instance::save`].
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Result<&mut Self> {
        let field = field.into();
        self.check_mutable(&field)?;
        self.current.insert(field.clone(), value.into());
        self.dirty.insert(field);
        Ok(self)
    }

    pub fn unset(&mut self, field: &str) -> Result<&mut Self> {
        self.check_mutable(field)?;
        self.current.remove(field);
        self.dirty.insert(field.to_string());
        Ok(self)
    }

    fn check_mutable(&self, field: &str) -> Result<()> {
        match self.state {
            InstanceState::Removed => Err(Error::State("instance has been removed".into())),
            InstanceState::Hydrated | InstanceState::Partial if field == ID_FIELD => Err(
                Error::State("the identity of a persisted instance cannot change".into()),
            ),
            _ => Ok(()),
        }
    }

    /// Persists the instance: an insert when new, a field-level update otherwise.
    ///
    /// Only changed top-level fields are sent, so a partial instance never
    /// overwrites the fields it did not fetch.
    pub fn save(&mut self) -> Result<()> {
        match self.state {
            InstanceState::Removed => Err(Error::State("cannot save a removed instance".into())),
            InstanceState::New => self.insert(),
            InstanceState::Hydrated | InstanceState::Partial => {
                let changes = self.changes();
                if changes.is_empty() {
                    return Ok(());
                }
                let connection = self.model.connection()?;
                let changes = self.model.hooks().saving(self, changes)?;
                if changes.is_empty() {
                    return Ok(());
                }
                if changes.touches(ID_FIELD) {
                    return Err(Error::State(
                        "the identity of a persisted instance cannot change".into(),
                    ));
                }

                let filter = self.identity_filter()?;
                let matched =
                    connection.update(self.model.collection_name(), &filter, &changes, false)?;
                if matched == 0 {
                    return Err(Error::Store(format!(
                        "no document in {} matched {}",
                        self.model.collection_name(),
                        Value::Object(filter)
                    )));
                }

                // Other writers may have touched the document, so the updated
                // form is not known locally and is only invalidated.
                let mut stored = self.stored.clone();
                changes.apply(&mut stored);
                changes.apply(&mut self.original);
                changes.apply(&mut self.current);
                self.acknowledge(stored, false);
                Ok(())
            }
        }
    }

    /// Writes the whole document over the stored one.
    ///
    /// `on_saving` sees the full diff and may amend it before the write.
    pub fn replace(&mut self) -> Result<()> {
        match self.state {
            InstanceState::Removed => {
                Err(Error::State("cannot replace a removed instance".into()))
            }
            InstanceState::Partial => Err(Error::State(
                "cannot replace from a partial instance, unfetched fields would be lost".into(),
            )),
            InstanceState::New => self.insert(),
            InstanceState::Hydrated => {
                let connection = self.model.connection()?;
                let changes = Changes::between(&self.original, &self.current);
                let changes = self.model.hooks().saving(self, changes)?;
                if changes.touches(ID_FIELD) {
                    return Err(Error::State(
                        "the identity of a persisted instance cannot change".into(),
                    ));
                }

                let mut document = self.original.clone();
                changes.apply(&mut document);
                let filter = self.identity_filter()?;
                let matched =
                    connection.replace(self.model.collection_name(), &filter, document.clone())?;
                if matched == 0 {
                    return Err(Error::Store(format!(
                        "no document in {} matched {}",
                        self.model.collection_name(),
                        Value::Object(filter)
                    )));
                }

                self.original = document.clone();
                self.current = document.clone();
                self.acknowledge(document, true);
                Ok(())
            }
        }
    }

    /// Deletes the document and drops its cache entries.
    pub fn remove(&mut self) -> Result<()> {
        match self.state {
            InstanceState::Removed => Err(Error::State("instance already removed".into())),
            InstanceState::New => Err(Error::State("cannot remove an unsaved instance".into())),
            InstanceState::Hydrated | InstanceState::Partial => {
                let connection = self.model.connection()?;
                let filter = self.identity_filter()?;
                connection.delete(self.model.collection_name(), &filter)?;
                self.model.cache().invalidate_document(&self.stored);
                self.state = InstanceState::Removed;
                Ok(())
            }
        }
    }

    /// Reloads the document from the store, bypassing the cache.
    ///
    /// Returns `false`, and marks the instance removed, when the document is gone.
    /// Unsaved changes are discarded.
    pub fn refresh(&mut self) -> Result<bool> {
        match self.state {
            InstanceState::Removed => Err(Error::State("cannot refresh a removed instance".into())),
            InstanceState::New => Err(Error::State("cannot refresh an unsaved instance".into())),
            InstanceState::Hydrated | InstanceState::Partial => {
                let connection = self.model.connection()?;
                let filter = self.identity_filter()?;
                let found =
                    connection.find_one(self.model.collection_name(), &Query::new(filter))?;

                let Some(raw) = found else {
                    self.model.cache().invalidate_document(&self.stored);
                    self.state = InstanceState::Removed;
                    return Ok(false);
                };
                let document = self.model.hooks().retrieved(raw.clone())?;
                self.model.cache().invalidate_document(&self.stored);
                self.model.cache().store(&raw);
                self.stored = raw;
                self.original = document.clone();
                self.current = document;
                self.dirty.clear();
                self.state = InstanceState::Hydrated;
                Ok(true)
            }
        }
    }

    fn insert(&mut self) -> Result<()> {
        let connection = self.model.connection()?;
        let document = self.model.hooks().creating(self.current.clone())?;
        let stored = connection.insert(self.model.collection_name(), document)?;

        self.stored = stored.clone();
        self.original = stored.clone();
        self.current = stored;
        self.dirty.clear();
        self.state = InstanceState::Hydrated;

        self.model.hooks().created(self)?;
        self.model.cache().store(&self.stored);
        Ok(())
    }

    /// Records an acknowledged write. The previous cache keys are always dropped.
    /// `complete` means `stored` is exactly the document now in the store.
    fn acknowledge(&mut self, stored: Document, complete: bool) {
        let previous = std::mem::replace(&mut self.stored, stored);
        let original = &self.original;
        let current = &self.current;
        self.dirty
            .retain(|field| original.get(field) != current.get(field));

        self.model.cache().invalidate_document(&previous);
        if complete && self.state == InstanceState::Hydrated {
            self.model.cache().store(&self.stored);
        }
    }

    fn identity_filter(&self) -> Result<Document> {
        let id = identity(&self.stored)
            .or_else(|| identity(&self.original))
            .cloned()
            .ok_or_else(|| Error::State("instance has no identity".into()))?;
        let mut filter = Document::new();
        filter.insert(ID_FIELD.to_string(), id);
        Ok(filter)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("collection", &self.model.collection_name())
            .field("state", &self.state)
            .field("document", &self.current)
            .field("dirty", &self.dirty)
            .finish()
    }
}
