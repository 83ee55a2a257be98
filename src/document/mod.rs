//! Documents, queries and change sets.
//!
//! A [`Document`] is the untyped record the store reads and writes. It is a
//! plain `serde_json` object whose identity lives under [`ID_FIELD`].

mod changes;
mod query;

use serde_json::{Map, Value};

use crate::error::{Error, Result};

pub use changes::Changes;
pub use query::{Query, SortOrder};

/// Untyped record as stored in, and retrieved from, a collection.
pub type Document = Map<String, Value>;

/// Name of the identity field every stored document carries.
pub const ID_FIELD: &str = "_id";

/// Returns the identity value of a document, if it has one.
pub fn identity(document: &Document) -> Option<&Value> {
    document.get(ID_FIELD).filter(|value| !value.is_null())
}

/// Serializes a typed value into a document. The value must serialize to an object.
pub(crate) fn to_document<T: serde::Serialize>(value: &T) -> Result<Document> {
    match serde_json::to_value(value)? {
        Value::Object(document) => Ok(document),
        other => Err(Error::Serde(format!(
            "expected a value serializing to an object, got {other}"
        ))),
    }
}

/// Whether a value can take part in an equality cache key.
pub(crate) fn is_scalar(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_))
}

/// Renders a scalar for use inside a cache key. Strings are used verbatim.
pub(crate) fn key_fragment(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
