use crate::document::{identity, is_scalar, key_fragment, Document, Query, ID_FIELD};
use crate::schema::Schema;

/// Policy deciding which queries may be answered from a cache, and under which key.
///
/// A query the director accepts must resolve to at most one document, and the
/// key must be derived only from identity-bearing fields. Claiming a query is
/// cacheable when it is not serves wrong documents; refusing one only costs a miss.
pub trait CacheDirector: Send + Sync {
    /// Whether the query shape maps to a single deterministic key.
    fn valid_query(&self, query: &Query) -> bool;

    /// Key for a cacheable query, `None` otherwise.
    fn build_query_key(&self, query: &Query) -> Option<String>;

    /// Every cacheable lookup that would resolve to `document`.
    fn lookups(&self, document: &Document) -> Vec<Query>;

    /// Whether the document carries an identity usable as a key.
    fn valid(&self, document: &Document) -> bool {
        identity(document).map(is_scalar).unwrap_or(false)
    }

    /// Identity key for a document.
    fn build_key(&self, document: &Document) -> Option<String> {
        let id = identity(document).filter(|id| is_scalar(id))?;
        self.build_query_key(&Query::by_id(id.clone()))
    }

    /// Identity key first, then one alias key per unique field the document carries.
    fn build_keys(&self, document: &Document) -> Vec<String> {
        self.lookups(document)
            .iter()
            .filter_map(|lookup| self.build_query_key(lookup))
            .collect()
    }
}

/// Caches equality lookups on `_id` and on fields the schema declares unique.
///
/// Keys are `"<collection>:<id>"` for identity lookups and
/// `"<collection>:<field>=<value>"` for unique fields.
#[derive(Debug, Clone)]
pub struct IdentityDirector {
    collection: String,
    schema: Schema,
}

impl IdentityDirector {
    pub fn new(collection: impl Into<String>, schema: Schema) -> Self {
        Self {
            collection: collection.into(),
            schema,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn equality<'a>(&self, query: &'a Query) -> Option<(&'a String, &'a serde_json::Value)> {
        if query.is_partial() || query.has_cursor_modifiers() {
            return None;
        }
        let conditions = query.conditions();
        if conditions.len() != 1 {
            return None;
        }
        let (field, value) = conditions.iter().next()?;
        if field.starts_with('$') || !self.schema.is_unique(field) || !is_scalar(value) {
            return None;
        }
        Some((field, value))
    }
}

impl CacheDirector for IdentityDirector {
    fn valid_query(&self, query: &Query) -> bool {
        self.equality(query).is_some()
    }

    fn build_query_key(&self, query: &Query) -> Option<String> {
        let (field, value) = self.equality(query)?;
        let fragment = key_fragment(value)?;
        if field == ID_FIELD {
            Some(format!("{}:{}", self.collection, fragment))
        } else {
            Some(format!("{}:{}={}", self.collection, field, fragment))
        }
    }

    fn lookups(&self, document: &Document) -> Vec<Query> {
        let mut lookups = Vec::new();
        match identity(document) {
            Some(id) if is_scalar(id) => lookups.push(Query::by_id(id.clone())),
            _ => return lookups,
        }
        for field in self.schema.unique_fields() {
            if let Some(value) = document.get(field).filter(|value| is_scalar(value)) {
                let mut conditions = Document::new();
                conditions.insert(field.to_string(), value.clone());
                lookups.push(Query::new(conditions));
            }
        }
        lookups
    }
}
