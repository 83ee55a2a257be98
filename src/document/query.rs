use serde_json::Value;

use super::{Document, ID_FIELD};

/// Sort direction for a query field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// A filter plus the optional cursor modifiers sent with it.
///
/// Conditions follow the Mongo filter shape: `{ "field": value }` for
/// equality, `{ "field": { "$gt": 3 } }` for operators, `{ "$or": [...] }`
/// for logical combinations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    conditions: Document,
    fields: Option<Vec<String>>,
    sort: Vec<(String, SortOrder)>,
    skip: Option<u64>,
    limit: Option<u64>,
}

impl Query {
    pub fn new(conditions: Document) -> Self {
        Self {
            conditions,
            ..Self::default()
        }
    }

    /// Equality filter on the identity field.
    pub fn by_id(id: impl Into<Value>) -> Self {
        let mut conditions = Document::new();
        conditions.insert(ID_FIELD.to_string(), id.into());
        Self::new(conditions)
    }

    /// Restricts the returned fields. Instances built from a projected query are partial.
    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn sort(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort.push((field.into(), order));
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn conditions(&self) -> &Document {
        &self.conditions
    }

    pub fn projection(&self) -> Option<&[String]> {
        self.fields.as_deref()
    }

    pub fn sort_order(&self) -> &[(String, SortOrder)] {
        &self.sort
    }

    pub fn skip_count(&self) -> Option<u64> {
        self.skip
    }

    pub fn limit_count(&self) -> Option<u64> {
        self.limit
    }

    /// True when a projection is set.
    pub fn is_partial(&self) -> bool {
        self.fields.is_some()
    }

    /// True when sort, skip or limit is set.
    pub fn has_cursor_modifiers(&self) -> bool {
        !self.sort.is_empty() || self.skip.is_some() || self.limit.is_some()
    }
}

impl From<Document> for Query {
    fn from(conditions: Document) -> Self {
        Query::new(conditions)
    }
}
