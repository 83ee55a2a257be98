use std::collections::BTreeSet;

use serde_json::Value;

use super::Document;

/// A field-level change set: `$set` values and `$unset` field names.
///
/// Diffs are shallow. Any difference inside a nested object or array replaces
/// the whole top-level field, so a change never reaches below the first level.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Changes {
    set: Document,
    unset: BTreeSet<String>,
}

impl Changes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `field` to `value`, replacing any earlier unset of the same field.
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        let field = field.into();
        self.unset.remove(&field);
        self.set.insert(field, value.into());
        self
    }

    /// Removes `field`, replacing any earlier set of the same field.
    pub fn unset(mut self, field: impl Into<String>) -> Self {
        let field = field.into();
        self.set.remove(&field);
        self.unset.insert(field);
        self
    }

    /// Drops every change touching `field`.
    pub fn without(mut self, field: &str) -> Self {
        self.set.remove(field);
        self.unset.remove(field);
        self
    }

    /// Computes the changes that turn `original` into `current`, restricted to `fields`.
    pub fn diff<'a, I>(original: &Document, current: &Document, fields: I) -> Self
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut changes = Changes::new();
        for field in fields {
            match (original.get(field), current.get(field)) {
                (before, Some(after)) if before != Some(after) => {
                    changes.set.insert(field.clone(), after.clone());
                }
                (Some(_), None) => {
                    changes.unset.insert(field.clone());
                }
                _ => {}
            }
        }
        changes
    }

    /// Full diff across every top-level field of either document.
    pub fn between(original: &Document, current: &Document) -> Self {
        let fields: BTreeSet<&String> = original.keys().chain(current.keys()).collect();
        Self::diff(original, current, fields)
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.unset.is_empty()
    }

    pub fn len(&self) -> usize {
        self.set.len() + self.unset.len()
    }

    pub fn sets(&self) -> &Document {
        &self.set
    }

    pub fn unsets(&self) -> impl Iterator<Item = &str> {
        self.unset.iter().map(String::as_str)
    }

    pub fn touches(&self, field: &str) -> bool {
        self.set.contains_key(field) || self.unset.contains(field)
    }

    /// Applies the changes to a document in place.
    pub fn apply(&self, document: &mut Document) {
        for (field, value) in &self.set {
            document.insert(field.clone(), value.clone());
        }
        for field in &self.unset {
            document.remove(field);
        }
    }

    /// Renders the Mongo update shape: `{"$set": {...}, "$unset": {"field": ""}}`.
    pub fn to_document(&self) -> Document {
        let mut update = Document::new();
        if !self.set.is_empty() {
            update.insert("$set".to_string(), Value::Object(self.set.clone()));
        }
        if !self.unset.is_empty() {
            let unset = self
                .unset
                .iter()
                .map(|field| (field.clone(), Value::String(String::new())))
                .collect();
            update.insert("$unset".to_string(), Value::Object(unset));
        }
        update
    }
}
