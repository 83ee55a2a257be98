//! Schema declarations consulted by the cache director and the store.

use std::collections::BTreeSet;

use serde::{de::DeserializeOwned, Serialize};

use crate::document::ID_FIELD;

/// Field-level declarations for a collection.
///
/// Validation rules are not part of the schema. It records which fields,
/// besides the identity, hold a value unique across the collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    unique: BTreeSet<String>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares `field` unique. Declaring the identity field is redundant and ignored.
    pub fn unique(mut self, field: impl Into<String>) -> Self {
        let field = field.into();
        if field != ID_FIELD {
            self.unique.insert(field);
        }
        self
    }

    pub fn is_unique(&self, field: &str) -> bool {
        field == ID_FIELD || self.unique.contains(field)
    }

    /// Declared unique fields, identity excluded.
    pub fn unique_fields(&self) -> impl Iterator<Item = &str> {
        self.unique.iter().map(String::as_str)
    }
}

/// A typed application object bound to a collection.
///
/// Usually derived:
///
/// ```ignore
/// #[derive(Serialize, Deserialize, Schematic)]
/// #[document(collection = "users")]
/// struct User {
///     #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
///     id: Option<String>,
///     #[document(unique)]
///     email: String,
/// }
/// ```
pub trait Schematic: Serialize + DeserializeOwned {
    /// Collection the type is stored in.
    const COLLECTION: &'static str;

    fn schema() -> Schema {
        Schema::new()
    }
}
